//! Integration tests for the public share token lifecycle

mod common;

use service::database::models::PublicShare;
use service::shares::{IssueError, RedeemError, ResolveError, RevokeError};
use service::testkit;
use uuid::Uuid;

/// Full password-protected lifecycle: resolve shows the gate, a wrong
/// password refuses without counting, the right one redeems and counts.
#[tokio::test]
async fn password_protected_share_lifecycle() {
    let (state, _temp) = common::setup().await;
    let owner = testkit::user("alice");
    let file = common::owned_file(&state, &owner, "report.pdf").await;

    let descriptor = state
        .shares()
        .issue(&owner, file.id, 1.0, Some("abc"))
        .await
        .unwrap();
    assert!(descriptor.has_password);
    assert!(descriptor.share_url.ends_with(&descriptor.token));

    let view = state.shares().resolve(&descriptor.token).await.unwrap();
    assert!(view.password_required);
    assert_eq!(view.filename, "report.pdf");

    let err = state
        .shares()
        .redeem(&descriptor.token, Some("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::WrongPassword));

    // a missing password is a failed match, not an error
    let err = state.shares().redeem(&descriptor.token, None).await.unwrap_err();
    assert!(matches!(err, RedeemError::WrongPassword));

    let listing = state.shares().list_for_file(&owner, file.id).await.unwrap();
    assert_eq!(listing[0].download_count, 0);

    let handle = state
        .shares()
        .redeem(&descriptor.token, Some("abc"))
        .await
        .unwrap();
    assert_eq!(handle.filename, "report.pdf");

    let listing = state.shares().list_for_file(&owner, file.id).await.unwrap();
    assert_eq!(listing[0].download_count, 1);
    assert!(listing[0].has_password);
}

/// Non-positive or non-finite expiries are rejected outright.
#[tokio::test]
async fn invalid_expiry_is_rejected() {
    let (state, _temp) = common::setup().await;
    let owner = testkit::user("alice");
    let file = common::owned_file(&state, &owner, "report.pdf").await;

    for hours in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = state.shares().issue(&owner, file.id, hours, None).await.unwrap_err();
        assert!(matches!(err, IssueError::InvalidRequest(_)), "hours {hours}");
    }
}

/// A locked file never yields a token.
#[tokio::test]
async fn locked_file_cannot_be_shared() {
    let (state, _temp) = common::setup().await;
    let owner = testkit::user_with_otp("alice");
    let file = common::owned_file(&state, &owner, "report.pdf").await;
    state.locks().set_lock(&owner, file.id, true).await.unwrap();

    let err = state.shares().issue(&owner, file.id, 1.0, None).await.unwrap_err();
    assert!(matches!(err, IssueError::Locked));

    assert!(state.shares().list_for_file(&owner, file.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_the_owner_issues_tokens() {
    let (state, _temp) = common::setup().await;
    let owner = testkit::user("alice");
    let file = common::owned_file(&state, &owner, "report.pdf").await;

    let admin = testkit::admin("carol", true);
    let err = state.shares().issue(&admin, file.id, 1.0, None).await.unwrap_err();
    assert!(matches!(err, IssueError::Deny));

    let err = state
        .shares()
        .issue(&owner, Uuid::new_v4(), 1.0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::NotFound));
}

#[tokio::test]
async fn unknown_and_expired_tokens_resolve_distinctly() {
    let (state, _temp) = common::setup().await;
    let owner = testkit::user("alice");
    let file = common::owned_file(&state, &owner, "report.pdf").await;

    let err = state.shares().resolve("deadbeef").await.unwrap_err();
    assert!(matches!(err, ResolveError::TokenNotFound));

    let expired = testkit::expired_share(state.database(), file.id, "alice", None)
        .await
        .unwrap();
    let err = state.shares().resolve(&expired.share_token).await.unwrap_err();
    assert!(matches!(err, ResolveError::TokenExpired));
}

/// An expired token never redeems and never counts, even with the
/// correct password.
#[tokio::test]
async fn expired_token_never_redeems() {
    let (state, _temp) = common::setup().await;
    let owner = testkit::user("alice");
    let file = common::owned_file(&state, &owner, "report.pdf").await;

    let expired = testkit::expired_share(state.database(), file.id, "alice", Some("abc"))
        .await
        .unwrap();

    let err = state
        .shares()
        .redeem(&expired.share_token, Some("abc"))
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::TokenExpired));

    let row = PublicShare::get(state.database(), expired.id).await.unwrap().unwrap();
    assert_eq!(row.download_count, 0);
}

/// Concurrent redemptions each count exactly once.
#[tokio::test]
async fn concurrent_redemptions_are_all_counted() {
    let (state, _temp) = common::setup().await;
    let owner = testkit::user("alice");
    let file = common::owned_file(&state, &owner, "report.pdf").await;
    let descriptor = state.shares().issue(&owner, file.id, 1.0, None).await.unwrap();

    let token = descriptor.token.clone();
    let state_a = state.clone();
    let state_b = state.clone();
    let token_a = token.clone();
    let token_b = token.clone();

    let (a, b) = tokio::join!(
        tokio::spawn(async move { state_a.shares().redeem(&token_a, None).await }),
        tokio::spawn(async move { state_b.shares().redeem(&token_b, None).await }),
    );
    a.unwrap().unwrap();
    b.unwrap().unwrap();

    let listing = state.shares().list_for_file(&owner, file.id).await.unwrap();
    assert_eq!(listing[0].download_count, 2);
}

#[tokio::test]
async fn revoke_is_owner_scoped_and_reports_missing_rows() {
    let (state, _temp) = common::setup().await;
    let owner = testkit::user("alice");
    let file = common::owned_file(&state, &owner, "report.pdf").await;
    let descriptor = state.shares().issue(&owner, file.id, 1.0, None).await.unwrap();

    let mallory = testkit::user("mallory");
    let err = state.shares().revoke(&mallory, descriptor.id).await.unwrap_err();
    assert!(matches!(err, RevokeError::NotFound));

    state.shares().revoke(&owner, descriptor.id).await.unwrap();

    // deleting zero rows is NotFound, not a silent success
    let err = state.shares().revoke(&owner, descriptor.id).await.unwrap_err();
    assert!(matches!(err, RevokeError::NotFound));

    let err = state.shares().resolve(&descriptor.token).await.unwrap_err();
    assert!(matches!(err, ResolveError::TokenNotFound));
}

#[tokio::test]
async fn issued_tokens_are_opaque_and_unique() {
    let (state, _temp) = common::setup().await;
    let owner = testkit::user("alice");
    let file = common::owned_file(&state, &owner, "report.pdf").await;

    let a = state.shares().issue(&owner, file.id, 1.0, None).await.unwrap();
    let b = state.shares().issue(&owner, file.id, 1.0, None).await.unwrap();
    assert_eq!(a.token.len(), 32);
    assert_ne!(a.token, b.token);
    assert_eq!(state.shares().list_for_file(&owner, file.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn direct_share_management_is_owner_only_and_lock_gated() {
    let (state, _temp) = common::setup().await;
    let owner = testkit::user_with_otp("alice");
    let file = common::owned_file(&state, &owner, "report.pdf").await;

    let bob = testkit::user("bob");
    assert!(state.shares().grant_direct(&bob, file.id, "bob").await.is_err());

    state.shares().grant_direct(&owner, file.id, "bob").await.unwrap();
    assert_eq!(state.shares().list_direct(&owner, file.id).await.unwrap().len(), 1);

    state.locks().set_lock(&owner, file.id, true).await.unwrap();
    let err = state
        .shares()
        .grant_direct(&owner, file.id, "carol")
        .await
        .unwrap_err();
    assert!(matches!(err, service::shares::DirectShareError::Locked));

    state.locks().set_lock(&owner, file.id, false).await.unwrap();
    state.shares().revoke_direct(&owner, file.id, "bob").await.unwrap();
    assert!(state.shares().list_direct(&owner, file.id).await.unwrap().is_empty());
}
