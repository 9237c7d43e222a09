use std::sync::Arc;

use url::Url;

use crate::audit::AuditRecorder;
use crate::auth::{Authenticator, IdentityVerifier};
use crate::config::Config;
use crate::database::{Database, DatabaseSetupError};
use crate::files::Files;
use crate::locks::Locks;
use crate::shares::Shares;

/// Main service state - wires every component with explicit dependencies.
/// Lifecycle belongs to the process entry point; nothing in here owns a
/// global.
#[derive(Clone)]
pub struct State {
    database: Database,
    authenticator: Authenticator,
    audit: AuditRecorder,
    files: Files,
    locks: Locks,
    shares: Shares,
}

impl State {
    pub async fn from_config(
        config: &Config,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Result<Self, StateSetupError> {
        // 1. Setup database
        let database_url = match config.sqlite_path {
            Some(ref path) => {
                // check that the path exists
                if !path.exists() {
                    return Err(StateSetupError::DatabasePathDoesNotExist);
                }
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            // otherwise just set up an in-memory database
            None => Url::parse("sqlite::memory:").map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!("Database URL: {:?}", database_url);
        let database = Database::connect(&database_url).await?;

        // 2. Audit sink first; every other component reports into it
        let audit = AuditRecorder::new(database.clone());

        // 3. Authentication boundary
        let authenticator = Authenticator::new(
            verifier,
            config.auth_timeout,
            config.service_client_id.clone(),
        );

        // 4. Domain components
        let files = Files::new(database.clone(), audit.clone());
        let locks = Locks::new(database.clone(), audit.clone());
        let shares = Shares::new(database.clone(), audit.clone(), config.public_url.clone());

        Ok(Self {
            database,
            authenticator,
            audit,
            files,
            locks,
            shares,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    pub fn files(&self) -> &Files {
        &self.files
    }

    pub fn locks(&self) -> &Locks {
        &self.locks
    }

    pub fn shares(&self) -> &Shares {
        &self.shares
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Database setup error: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
}
