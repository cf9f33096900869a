//! Logout cleanup and races between sign-in and sign-out.

mod common;

use common::{Harness, eventually, grant_for, user};
use portal_identity::{Credentials, IdentityError};
use portal_notifications::{NotificationKind, PushEvent};
use portal_platform_access::{AuthState, LOGIN_ROUTE, Role};
use portal_session::SessionError;

#[tokio::test]
async fn logout_clears_token_feed_and_connection_together() {
    let h = Harness::new();
    h.login_as(Role::Company).await;
    eventually(|| h.transport.is_open()).await;
    h.transport
        .publish_event(PushEvent::new(NotificationKind::Success, "Job published"));
    eventually(|| h.manager.hub().unread_count() == 1).await;

    let mut states = h.manager.subscribe();
    let outcome = h.manager.logout().await;

    assert_eq!(outcome.redirect, LOGIN_ROUTE);
    assert!(outcome.remote_logout_confirmed);
    assert_eq!(*states.borrow_and_update(), AuthState::Unauthenticated);
    assert_eq!(h.manager.tokens().current_token(), None);
    assert!(h.manager.hub().feed().is_empty());
    assert!(!h.manager.hub().is_connected());
    eventually(|| !h.transport.is_open()).await;
}

#[tokio::test]
async fn remote_logout_failure_does_not_undo_local_cleanup() {
    let h = Harness::new();
    h.login_as(Role::Ambassador).await;
    h.identity.fail_logout(IdentityError::Unavailable {
        reason: "offline".to_string(),
    });

    let outcome = h.manager.logout().await;
    assert!(!outcome.remote_logout_confirmed);
    assert_eq!(h.manager.state(), AuthState::Unauthenticated);
    assert_eq!(h.manager.tokens().current_token(), None);
}

#[tokio::test]
async fn logout_without_session_skips_remote_call() {
    let h = Harness::new();
    let outcome = h.manager.logout().await;
    assert!(!outcome.remote_logout_confirmed);
    assert!(h.identity.calls().is_empty());
}

#[tokio::test]
async fn logout_during_login_wins() {
    let h = Harness::new();
    let release = h.identity.held_grant(Ok(grant_for(Role::Company)));

    let manager = h.manager.clone();
    let login = tokio::spawn(async move {
        manager
            .login(Credentials::new("hr@acme.test", "pw"))
            .await
    });
    eventually(|| h.manager.state() == AuthState::Authenticating).await;

    h.manager.logout().await;
    assert_eq!(h.manager.state(), AuthState::Unauthenticated);

    release.send(()).expect("login still waiting");
    let err = login
        .await
        .expect("task")
        .expect_err("superseded by logout");
    assert_eq!(err.current_context(), &SessionError::Superseded);

    assert_eq!(h.manager.state(), AuthState::Unauthenticated);
    assert_eq!(h.manager.tokens().current_token(), None);
    assert!(!h.manager.hub().is_connected());
}

#[tokio::test]
async fn logout_during_refresh_discards_late_user() {
    let h = Harness::new();
    h.login_as(Role::Company).await;
    let release = h.identity.held_user(Ok(user(Role::Admin)));

    let manager = h.manager.clone();
    let refresh = tokio::spawn(async move { manager.refresh_user().await });
    eventually(|| matches!(h.manager.state(), AuthState::Refreshing(_))).await;

    h.manager.logout().await;
    release.send(()).expect("refresh still waiting");

    let err = refresh
        .await
        .expect("task")
        .expect_err("superseded by logout");
    assert_eq!(err.current_context(), &SessionError::Superseded);
    assert_eq!(h.manager.state(), AuthState::Unauthenticated);
}

#[tokio::test]
async fn newer_login_supersedes_older_one() {
    let h = Harness::new();
    let release_first = h.identity.held_grant(Ok(grant_for(Role::Company)));

    let manager = h.manager.clone();
    let first = tokio::spawn(async move {
        manager
            .login(Credentials::new("hr@acme.test", "pw"))
            .await
    });
    eventually(|| h.identity.calls().len() == 1).await;

    let second = h.login_as(Role::Admin).await;
    release_first.send(()).expect("first still waiting");
    let err = first
        .await
        .expect("task")
        .expect_err("superseded");
    assert_eq!(err.current_context(), &SessionError::Superseded);

    assert_eq!(
        h.manager.state(),
        AuthState::Authenticated(second.session.clone())
    );
    assert_eq!(h.manager.session().map(|s| s.role()), Some(Role::Admin));
}
