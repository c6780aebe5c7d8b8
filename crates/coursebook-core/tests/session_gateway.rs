//! Session lifecycle and the authenticated request pipeline, exercised
//! against an in-process fake backend.

mod common;

use std::sync::Arc;

use coursebook_core::auth::{FileStore, KeyValueStore};
use coursebook_core::courses::{CourseList, ListScope};
use coursebook_core::models::{ProfileUpdate, RegisterRequest, Role};
use coursebook_core::{ApiClient, ApiError, SessionStore};

use common::{setup, setup_signed_in, VALID_TOKEN};

#[tokio::test]
async fn test_login_stores_session_and_scopes_list() {
    let (backend, client) = setup().await;

    let response = client.login("ada", "x").await.expect("login");
    assert_eq!(response.access, "t1");
    assert_eq!(response.refresh, "r1");
    assert_eq!(response.user.id, 1);
    assert_eq!(response.user.role, Role::Instructor);

    let session = client.session();
    assert!(session.is_authenticated());
    assert_eq!(session.access_token().as_deref(), Some("t1"));
    assert_eq!(session.refresh_token().as_deref(), Some("r1"));
    assert_eq!(session.current().map(|u| u.id), Some(1));

    let list = CourseList::new(client.clone());
    assert_eq!(list.scope(), ListScope::Taught);
    assert_eq!(list.scope().title(), "My Taught Courses");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/api/auth/login/");
}

#[tokio::test]
async fn test_failed_login_leaves_session_untouched() {
    let (_backend, client) = setup().await;

    let err = client.login("ada", "wrong").await.expect_err("login should fail");
    assert!(err.is_unauthorized());
    assert_eq!(
        err.detail(),
        Some("No active account found with the given credentials")
    );
    assert!(!client.session().is_authenticated());
    assert_eq!(client.session().current(), None);
}

#[tokio::test]
async fn test_bearer_attached_when_signed_in() {
    let (backend, client) = setup_signed_in().await;

    client.fetch_my_courses().await.expect("fetch courses");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/api/lms/courses/my_courses/");
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some(format!("Bearer {}", VALID_TOKEN).as_str())
    );
}

#[tokio::test]
async fn test_anonymous_request_sent_without_credentials() {
    let (backend, client) = setup().await;

    let categories = client.fetch_categories().await.expect("categories are public");
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].name, "Math");

    let err = client.fetch_my_courses().await.expect_err("backend rejects anonymous");
    assert!(err.is_unauthorized());

    assert!(backend.requests().iter().all(|r| r.authorization.is_none()));
}

#[tokio::test]
async fn test_stale_token_surfaces_unauthorized_without_retry() {
    let (backend, client) = setup_signed_in().await;
    let user = client.session().current().expect("signed in");
    client.session().save(coursebook_core::SessionData::new(
        "expired".to_string(),
        Some("r1".to_string()),
        user,
    ));

    let err = client.fetch_my_courses().await.expect_err("stale token");
    assert!(matches!(err, ApiError::Unauthorized(_)));
    // One attempt, no silent retry, and the session is left for the caller
    assert_eq!(backend.request_count(), 1);
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn test_login_over_stale_session_sends_no_credentials() {
    let (backend, client) = setup_signed_in().await;
    let user = client.session().current().expect("signed in");
    client
        .session()
        .save(coursebook_core::SessionData::new("expired".to_string(), None, user));

    client.login("ada", "x").await.expect("login despite stale token");
    client.forgot_password("ada@example.com").await.expect("forgot password");

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/api/auth/login/");
    assert!(requests.iter().all(|r| r.authorization.is_none()));
    assert_eq!(client.session().access_token().as_deref(), Some(VALID_TOKEN));
}

#[tokio::test]
async fn test_profile_update_replaces_only_user() {
    let (_backend, client) = setup_signed_in().await;
    let before = client.session().snapshot().expect("signed in");

    let update = ProfileUpdate {
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        ..Default::default()
    };
    let profile = client.update_profile(&update).await.expect("update profile");
    assert_eq!(profile.first_name.as_deref(), Some("Ada"));

    let after = client.session().snapshot().expect("still signed in");
    assert_eq!(after.access_token, before.access_token);
    assert_eq!(after.refresh_token, before.refresh_token);
    assert_eq!(after.user, profile);
    assert_eq!(after.user.display_name(), "Ada Lovelace");
}

#[tokio::test]
async fn test_get_profile_does_not_mutate_session() {
    let (_backend, client) = setup_signed_in().await;
    let before = client.session().snapshot();

    let profile = client.get_profile().await.expect("get profile");
    assert_eq!(profile.username.as_deref(), Some("ada"));
    assert_eq!(client.session().snapshot(), before);
}

#[tokio::test]
async fn test_register_signs_in() {
    let (_backend, client) = setup().await;

    let request = RegisterRequest {
        username: "grace".to_string(),
        email: "grace@example.com".to_string(),
        password: "hunter2".to_string(),
        first_name: None,
        last_name: None,
        role: None,
    };
    let response = client.register(&request).await.expect("register");
    assert_eq!(response.user.role, Role::Student);
    assert!(client.session().is_authenticated());
    assert_eq!(client.session().refresh_token().as_deref(), Some("r-new"));
    assert_eq!(
        client.session().current().and_then(|u| u.username),
        Some("grace".to_string())
    );
}

#[tokio::test]
async fn test_register_rejection_falls_back_to_generic_message() {
    let (_backend, client) = setup().await;

    let request = RegisterRequest {
        username: "taken".to_string(),
        email: "t@example.com".to_string(),
        password: "pw".to_string(),
        first_name: None,
        last_name: None,
        role: None,
    };
    let err = client.register(&request).await.expect_err("duplicate username");
    assert!(matches!(err, ApiError::Rejected(_)));
    assert_eq!(err.user_message("Registration failed."), "Registration failed.");
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_password_endpoints_leave_session_alone() {
    let (_backend, client) = setup_signed_in().await;
    let before = client.session().snapshot();

    let ack = client.forgot_password("ada@example.com").await.expect("forgot password");
    assert_eq!(ack.message, None);

    let ack = client.reset_password("good", "new-pass").await.expect("reset password");
    assert_eq!(ack.message.as_deref(), Some("Password has been reset."));

    let err = client.reset_password("bad", "new-pass").await.expect_err("bad token");
    assert_eq!(err.user_message("Reset failed."), "Invalid or expired token.");

    assert_eq!(client.session().snapshot(), before);
}

#[tokio::test]
async fn test_logout_clears_and_stops_sending_token() {
    let (backend, client) = setup_signed_in().await;

    client.logout();
    client.logout();
    assert!(!client.session().is_authenticated());

    let _ = client.fetch_categories().await;
    assert_eq!(backend.requests().last().and_then(|r| r.authorization.clone()), None);
}

#[tokio::test]
async fn test_session_persists_across_clients() {
    let backend = common::FakeBackend::default();
    let base_url = backend.spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path().to_path_buf()));

    let first = ApiClient::new(&base_url, SessionStore::open(storage.clone())).expect("client");
    first.login("ada", "x").await.expect("login");

    // A fresh process picks the session up from disk
    let second = ApiClient::new(&base_url, SessionStore::open(storage.clone())).expect("client");
    assert!(second.session().is_authenticated());
    second.fetch_my_courses().await.expect("authenticated fetch");

    second.logout();
    let third = ApiClient::new(&base_url, SessionStore::open(storage)).expect("client");
    assert!(!third.session().is_authenticated());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let client = ApiClient::new("http://127.0.0.1:9/api", SessionStore::in_memory()).expect("client");
    let err = client.fetch_categories().await.expect_err("nothing listening");
    assert!(matches!(err, ApiError::NetworkError(_)));
    assert_eq!(err.user_message("Something went wrong."), "Something went wrong.");
}
