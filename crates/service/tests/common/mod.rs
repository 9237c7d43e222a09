//! Shared test utilities for service integration tests
#![allow(dead_code)]

use common::prelude::Principal;
use service::database::models::FileRecord;
use service::testkit;
use service::State;
use tempfile::TempDir;

/// Set up a test environment with a fresh state over an ephemeral database
pub async fn setup() -> (State, TempDir) {
    testkit::ephemeral_state()
        .await
        .expect("test state sets up")
}

/// Register a file owned by `owner`
pub async fn owned_file(state: &State, owner: &Principal, filename: &str) -> FileRecord {
    state
        .files()
        .register(owner, filename, 1024)
        .await
        .expect("file registers")
}
