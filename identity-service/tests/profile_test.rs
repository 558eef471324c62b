//! Profile updates: the current-password rule for credential changes, email
//! uniqueness, and session revocation on password change.

mod common;

use axum::http::StatusCode;
use common::{body_json, unique_email};

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn email_change_requires_the_current_password() {
    let app = common::setup().await;
    let email = unique_email("email-change");
    app.register_user("Email Changer", &email, "current-pass-1").await;

    let session = app.login(&email, "current-pass-1").await;
    let token = session["access_token"].as_str().unwrap();
    let new_email = unique_email("changed");

    // Without the current password: rejected.
    let response = app
        .request(
            "PUT",
            "/user/profile",
            Some(token),
            Some(serde_json::json!({ "email": new_email })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // With the wrong current password: rejected.
    let response = app
        .request(
            "PUT",
            "/user/profile",
            Some(token),
            Some(serde_json::json!({ "email": new_email, "current_password": "not-it" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // With the right one: the new email is persisted.
    let response = app
        .request(
            "PUT",
            "/user/profile",
            Some(token),
            Some(serde_json::json!({ "email": new_email, "current_password": "current-pass-1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], new_email);

    assert!(app
        .state
        .db
        .find_user_by_email(&new_email)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn email_uniqueness_excludes_the_users_own_row() {
    let app = common::setup().await;
    let first_email = unique_email("holder");
    let second_email = unique_email("claimant");
    app.register_user("Holder", &first_email, "holder-pass-1").await;
    app.register_user("Claimant", &second_email, "claimant-pass-1").await;

    let session = app.login(&second_email, "claimant-pass-1").await;
    let token = session["access_token"].as_str().unwrap();

    // Claiming someone else's email conflicts.
    let response = app
        .request(
            "PUT",
            "/user/profile",
            Some(token),
            Some(serde_json::json!({
                "email": first_email,
                "current_password": "claimant-pass-1",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Re-submitting your own email is not a conflict.
    let response = app
        .request(
            "PUT",
            "/user/profile",
            Some(token),
            Some(serde_json::json!({
                "email": second_email,
                "current_password": "claimant-pass-1",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn password_change_revokes_all_sessions() {
    let app = common::setup().await;
    let email = unique_email("rotate");
    app.register_user("Rotator", &email, "old-pass-1234").await;

    let first = app.login(&email, "old-pass-1234").await;
    let second = app.login(&email, "old-pass-1234").await;
    let first_token = first["access_token"].as_str().unwrap();
    let second_token = second["access_token"].as_str().unwrap();

    let response = app
        .request(
            "PUT",
            "/user/profile",
            Some(first_token),
            Some(serde_json::json!({
                "password": "new-pass-1234",
                "current_password": "old-pass-1234",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Both sessions are gone, the other device included.
    for token in [first_token, second_token] {
        let response = app.request("GET", "/user/profile", Some(token), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    app.login(&email, "new-pass-1234").await;
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn plain_fields_update_without_a_password() {
    let app = common::setup().await;
    let email = unique_email("casual");
    app.register_user("Casual", &email, "casual-pass-1").await;

    let session = app.login(&email, "casual-pass-1").await;
    let token = session["access_token"].as_str().unwrap();

    let response = app
        .request(
            "PUT",
            "/user/profile",
            Some(token),
            Some(serde_json::json!({ "name": "Renamed", "bio": "Weekend hiker." })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["name"], "Renamed");
    assert_eq!(body["user"]["bio"], "Weekend hiker.");

    // Untouched fields keep their values, and the session survives.
    assert_eq!(body["user"]["email"], email);
    let response = app.request("GET", "/user/profile", Some(token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn seller_registration_is_a_conflict_when_repeated() {
    let app = common::setup().await;
    let email = unique_email("seller");
    app.register_user("Seller Hopeful", &email, "seller-pass-1").await;

    let session = app.login(&email, "seller-pass-1").await;
    let token = session["access_token"].as_str().unwrap();

    let response = app
        .request("POST", "/user/register-seller", Some(token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "Seller"));

    let response = app
        .request("POST", "/user/register-seller", Some(token), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
