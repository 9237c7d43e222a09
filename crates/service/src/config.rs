use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_SERVICE_CLIENT: &str = "file-service";

#[derive(Debug, Clone)]
pub struct Config {
    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // share link configuration
    /// public base URL prefixed to issued share links
    pub public_url: Url,

    // identity configuration
    /// client id under which service-scoped roles arrive in the token
    pub service_client_id: String,
    /// upper bound on a single identity-provider verification call
    pub auth_timeout: Duration,

    // misc
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sqlite_path: None,
            public_url: Url::parse(DEFAULT_PUBLIC_URL).expect("default public URL parses"),
            service_client_id: DEFAULT_SERVICE_CLIENT.to_string(),
            auth_timeout: Duration::from_secs(5),
            log_level: tracing::Level::INFO,
        }
    }
}
