//! Login flow: credential checks, the lockout state machine, and token
//! issuance. All tests require a running PostgreSQL.

mod common;

use axum::http::StatusCode;
use common::{body_json, unique_email};

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn five_failed_attempts_lock_the_account() {
    let app = common::setup().await;
    let email = unique_email("lockout");
    app.register_user("Lockout Target", &email, "correct-password").await;

    // Four bad attempts are plain credential failures.
    for _ in 0..4 {
        let response = app
            .request(
                "POST",
                "/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": "wrong-password" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // The fifth trips the lock.
    let response = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(serde_json::json!({ "email": email, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::LOCKED);

    // While locked, even the correct password is rejected without being
    // verified, and the remaining window is reported in whole minutes.
    let response = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(serde_json::json!({ "email": email, "password": "correct-password" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::LOCKED);
    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("locked"), "unexpected message: {message}");

    let user = app
        .state
        .db
        .find_user_by_email(&email)
        .await
        .unwrap()
        .unwrap();
    let remaining = user.lock_remaining_minutes(chrono::Utc::now());
    assert!(remaining > 0 && remaining <= 15);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn successful_login_resets_the_failure_counter() {
    let app = common::setup().await;
    let email = unique_email("counter-reset");
    app.register_user("Counter Reset", &email, "hunter2hunter2").await;

    for _ in 0..2 {
        let response = app
            .request(
                "POST",
                "/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": "nope" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let user = app
        .state
        .db
        .find_user_by_email(&email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.failed_login_attempts, 2);

    app.login(&email, "hunter2hunter2").await;

    let user = app
        .state
        .db
        .find_user_by_email(&email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.locked_until.is_none());
    assert!(user.last_login_at.is_some());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn login_issues_tokens_and_identity_snapshot() {
    let app = common::setup().await;
    let email = unique_email("session");
    let user_id = app.register_user("Session User", &email, "session-pass-1").await;

    let session = app.login(&email, "session-pass-1").await;

    assert_eq!(session["token_type"], "Bearer");
    assert_eq!(session["user"]["email"], email);
    assert_eq!(session["user"]["roles"], serde_json::json!(["Regular User"]));

    // Both tokens are stored hashed, never in the clear.
    let access_token = session["access_token"].as_str().unwrap();
    let secret = access_token.split('|').nth(1).unwrap();
    let stored: Vec<String> =
        sqlx::query_scalar("SELECT secret_hash FROM access_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(app.state.db.pool())
            .await
            .unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|hash| hash != secret));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn deactivated_account_cannot_login() {
    let app = common::setup().await;
    let email = unique_email("deactivated");
    let user_id = app.register_user("Gone User", &email, "some-password").await;

    app.state
        .auth
        .deactivate(user_id, &identity_service::models::RequestOrigin::default())
        .await
        .unwrap();

    let response = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(serde_json::json!({ "email": email, "password": "some-password" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn refresh_mints_a_new_access_token_without_rotating() {
    let app = common::setup().await;
    let email = unique_email("refresh");
    app.register_user("Refresh User", &email, "refresh-pass-1").await;

    let session = app.login(&email, "refresh-pass-1").await;
    let refresh_token = session["refresh_token"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            "/auth/refresh",
            None,
            Some(serde_json::json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = body_json(response).await;
    let new_access = refreshed["access_token"].as_str().unwrap();

    // The new access token works against a protected route.
    let response = app.request("GET", "/user/profile", Some(new_access), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The refresh token is not consumed; it refreshes again.
    let response = app
        .request(
            "POST",
            "/auth/refresh",
            None,
            Some(serde_json::json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // An access token lacks the refresh ability.
    let access_token = session["access_token"].as_str().unwrap();
    let response = app
        .request(
            "POST",
            "/auth/refresh",
            None,
            Some(serde_json::json!({ "refresh_token": access_token })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn logout_deletes_only_the_presented_token() {
    let app = common::setup().await;
    let email = unique_email("logout");
    app.register_user("Logout User", &email, "logout-pass-1").await;

    let first = app.login(&email, "logout-pass-1").await;
    let second = app.login(&email, "logout-pass-1").await;
    let first_access = first["access_token"].as_str().unwrap();
    let second_access = second["access_token"].as_str().unwrap();

    let response = app.request("POST", "/auth/logout", Some(first_access), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request("GET", "/user/profile", Some(first_access), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The other device's session is untouched.
    let response = app.request("GET", "/user/profile", Some(second_access), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
