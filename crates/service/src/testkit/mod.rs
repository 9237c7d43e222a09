//! Lightweight test harness for the authorization core
//!
//! Provides an ephemeral on-disk database with the reference schema, a
//! static identity verifier, and principal/claims fixtures, so integration
//! tests run without external infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use service::testkit;
//!
//! #[tokio::test]
//! async fn test_lock_flow() -> anyhow::Result<()> {
//!     let (state, _temp) = testkit::ephemeral_state().await?;
//!     let owner = testkit::user_with_otp("alice");
//!     let file = state.files().register(&owner, "report.pdf", 1024).await?;
//!     state.locks().set_lock(&owner, file.id, true).await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use time::OffsetDateTime;
use uuid::Uuid;

use common::prelude::{
    ClaimSet, Principal, RoleClaim, ROLE_PLATFORM_SUPER, ROLE_USER, ROLE_WORKSPACE_ADMIN,
};

use crate::auth::{IdentityVerifier, VerifierError};
use crate::config::{Config, DEFAULT_SERVICE_CLIENT};
use crate::database::models::PublicShare;
use crate::database::types::DTimestamp;
use crate::database::Database;
use crate::shares::{generate_token, hash_password};
use crate::state::State;

/// Reference DDL for the four core tables. Schema lifecycle in production
/// belongs to external migration tooling; tests provision it here.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    uploader TEXT NOT NULL,
    filename TEXT NOT NULL UNIQUE,
    size_bytes INTEGER NOT NULL,
    locked INTEGER NOT NULL DEFAULT 0,
    uploaded_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS shares (
    id TEXT PRIMARY KEY,
    file_id TEXT NOT NULL,
    target_user_id TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (file_id, target_user_id)
);

CREATE TABLE IF NOT EXISTS public_shares (
    id TEXT PRIMARY KEY,
    file_id TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    share_token TEXT NOT NULL UNIQUE,
    password_hash TEXT,
    expires_at INTEGER NOT NULL,
    download_count INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    username TEXT,
    action TEXT NOT NULL,
    file_id TEXT,
    filename TEXT,
    created_at INTEGER NOT NULL
);
"#;

/// Ephemeral state over a fresh on-disk sqlite database. Keep the returned
/// `TempDir` alive for the duration of the test.
pub async fn ephemeral_state() -> anyhow::Result<(State, TempDir)> {
    state_with_verifier(Arc::new(StaticVerifier::default())).await
}

/// Same as [`ephemeral_state`], with a caller-provided identity verifier.
pub async fn state_with_verifier(
    verifier: Arc<dyn IdentityVerifier>,
) -> anyhow::Result<(State, TempDir)> {
    let temp = TempDir::new()?;
    let db_path = temp.path().join("lockbox.sqlite");
    std::fs::File::create(&db_path)?;

    let config = Config {
        sqlite_path: Some(db_path),
        ..Config::default()
    };
    let state = State::from_config(&config, verifier).await?;
    apply_schema(state.database()).await?;
    Ok((state, temp))
}

async fn apply_schema(db: &Database) -> anyhow::Result<()> {
    for statement in SCHEMA.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(&**db).await?;
    }
    Ok(())
}

/// Build a principal with explicit roles and step-up evidence.
pub fn principal(subject: &str, roles: &[&str], step_up: bool) -> Principal {
    Principal {
        subject_id: subject.to_string(),
        username: subject.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        step_up_satisfied: step_up,
    }
}

pub fn user(subject: &str) -> Principal {
    principal(subject, &[ROLE_USER], false)
}

pub fn user_with_otp(subject: &str) -> Principal {
    principal(subject, &[ROLE_USER], true)
}

pub fn admin(subject: &str, step_up: bool) -> Principal {
    principal(subject, &[ROLE_WORKSPACE_ADMIN], step_up)
}

pub fn super_user(subject: &str) -> Principal {
    principal(subject, &[ROLE_PLATFORM_SUPER], false)
}

/// Insert an already-expired public share token, bypassing the issue path
/// (which rightly refuses to create one).
pub async fn expired_share(
    db: &Database,
    file_id: Uuid,
    owner_id: &str,
    password: Option<&str>,
) -> anyhow::Result<PublicShare> {
    let token = generate_token().map_err(anyhow::Error::msg)?;
    let password_hash = match password {
        Some(plain) => Some(hash_password(plain).map_err(anyhow::Error::msg)?),
        None => None,
    };
    let expires_at = DTimestamp::from(OffsetDateTime::now_utc() - time::Duration::hours(1));
    Ok(PublicShare::create(db, file_id, owner_id, &token, password_hash.as_deref(), expires_at)
        .await?)
}

/// Claims fixture shaped like the identity provider's payload.
pub fn claims(subject: &str, realm_roles: &[&str], client_roles: &[&str], otp: bool) -> ClaimSet {
    ClaimSet {
        sub: Some(subject.to_string()),
        preferred_username: Some(subject.to_string()),
        realm_access: Some(RoleClaim {
            roles: realm_roles.iter().map(|r| r.to_string()).collect(),
        }),
        resource_access: HashMap::from([(
            DEFAULT_SERVICE_CLIENT.to_string(),
            RoleClaim {
                roles: client_roles.iter().map(|r| r.to_string()).collect(),
            },
        )]),
        amr: if otp { vec!["otp".to_string()] } else { Vec::new() },
        ..ClaimSet::default()
    }
}

/// Identity verifier backed by a fixed token -> claims table.
#[derive(Default, Clone)]
pub struct StaticVerifier {
    tokens: HashMap<String, ClaimSet>,
}

impl StaticVerifier {
    pub fn with_token(mut self, token: &str, claims: ClaimSet) -> Self {
        self.tokens.insert(token.to_string(), claims);
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<ClaimSet, VerifierError> {
        self.tokens
            .get(bearer_token)
            .cloned()
            .ok_or_else(|| VerifierError::Rejected("unknown token".to_string()))
    }
}
