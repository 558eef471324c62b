//! Role grants and revocations: idempotency, audit coupling, and the
//! permission union over current membership.

mod common;

use axum::http::StatusCode;
use common::{body_json, unique_email};
use std::collections::BTreeSet;

const REGULAR_USER_PERMISSIONS: &[&str] = &[
    "create_groups",
    "join_events",
    "make_reservations",
    "purchase_badges",
    "send_messages",
    "submit_ratings",
    "trigger_rescue_request",
];

const SELLER_PERMISSIONS: &[&str] = &[
    "create_venues",
    "manage_own_venues",
    "create_offers",
    "manage_own_offers",
    "view_own_analytics",
];

fn as_set(permissions: &[&str]) -> BTreeSet<String> {
    permissions.iter().map(|p| p.to_string()).collect()
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn assigning_a_held_role_is_idempotent() {
    let app = common::setup().await;
    let admin_email = unique_email("admin");
    let target_email = unique_email("target");
    let admin_id = app.register_user("Admin", &admin_email, "admin-password").await;
    let target_id = app.register_user("Target", &target_email, "target-password").await;
    app.grant_role(admin_id, "Admin").await;

    let session = app.login(&admin_email, "admin-password").await;
    let token = session["access_token"].as_str().unwrap();

    for _ in 0..2 {
        let response = app
            .request(
                "POST",
                "/roles/assign",
                Some(token),
                Some(serde_json::json!({ "user_id": target_id, "role_name": "Seller" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // One assignment row, one audit entry; the repeat was a silent no-op.
    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM role_assignments ra
         JOIN roles r ON ra.role_id = r.role_id
         WHERE ra.user_id = $1 AND r.name = 'Seller'",
    )
    .bind(target_id)
    .fetch_one(app.state.db.pool())
    .await
    .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(app.role_audit_count("role_assigned", target_id).await, 1);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn removing_a_role_the_user_lacks_succeeds_silently() {
    let app = common::setup().await;
    let admin_email = unique_email("admin");
    let target_email = unique_email("target");
    let admin_id = app.register_user("Admin", &admin_email, "admin-password").await;
    let target_id = app.register_user("Target", &target_email, "target-password").await;
    app.grant_role(admin_id, "Admin").await;

    let session = app.login(&admin_email, "admin-password").await;
    let token = session["access_token"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            "/roles/remove",
            Some(token),
            Some(serde_json::json!({ "user_id": target_id, "role_name": "Seller" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.role_audit_count("role_removed", target_id).await, 0);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn unknown_role_is_a_not_found_error() {
    let app = common::setup().await;
    let admin_email = unique_email("admin");
    let admin_id = app.register_user("Admin", &admin_email, "admin-password").await;
    app.grant_role(admin_id, "Admin").await;

    let session = app.login(&admin_email, "admin-password").await;
    let token = session["access_token"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            "/roles/assign",
            Some(token),
            Some(serde_json::json!({ "user_id": admin_id, "role_name": "Warlord" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn role_names_match_case_insensitively() {
    let app = common::setup().await;
    let admin_email = unique_email("admin");
    let target_email = unique_email("target");
    let admin_id = app.register_user("Admin", &admin_email, "admin-password").await;
    let target_id = app.register_user("Target", &target_email, "target-password").await;
    app.grant_role(admin_id, "admin").await;

    let session = app.login(&admin_email, "admin-password").await;
    let token = session["access_token"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            "/roles/assign",
            Some(token),
            Some(serde_json::json!({ "user_id": target_id, "role_name": "seller" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The canonical catalog casing comes back, whatever the request used.
    let body = body_json(response).await;
    assert!(body["roles"]
        .as_array()
        .unwrap()
        .iter()
        .any(|role| role == "Seller"));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn permissions_track_membership_exactly() {
    let app = common::setup().await;
    let email = unique_email("union");
    let user_id = app.register_user("Union User", &email, "union-password").await;

    // Fresh registration: exactly the Regular User list.
    let permissions = app.state.roles.permissions_of(user_id).await.unwrap();
    assert_eq!(permissions, as_set(REGULAR_USER_PERMISSIONS));

    // Granting Seller grows the set to the union, strictly more than before.
    app.grant_role(user_id, "Seller").await;
    let with_seller = app.state.roles.permissions_of(user_id).await.unwrap();
    let expected: BTreeSet<String> = as_set(REGULAR_USER_PERMISSIONS)
        .union(&as_set(SELLER_PERMISSIONS))
        .cloned()
        .collect();
    assert_eq!(with_seller, expected);
    assert!(with_seller.len() > permissions.len());

    // Revoking Regular User shrinks it to exactly the Seller list.
    app.state
        .roles
        .remove_role(
            user_id,
            user_id,
            "Regular User",
            &identity_service::models::RequestOrigin::default(),
        )
        .await
        .unwrap();
    let seller_only = app.state.roles.permissions_of(user_id).await.unwrap();
    assert_eq!(seller_only, as_set(SELLER_PERMISSIONS));

    assert!(app
        .state
        .roles
        .has_permission(user_id, "create_offers")
        .await
        .unwrap());
    assert!(!app
        .state
        .roles
        .has_permission(user_id, "create_groups")
        .await
        .unwrap());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn role_change_audit_rows_name_actor_and_target() {
    let app = common::setup().await;
    let admin_email = unique_email("admin");
    let target_email = unique_email("target");
    let admin_id = app.register_user("Admin", &admin_email, "admin-password").await;
    let target_id = app.register_user("Target", &target_email, "target-password").await;
    app.grant_role(admin_id, "Admin").await;

    let session = app.login(&admin_email, "admin-password").await;
    let token = session["access_token"].as_str().unwrap();

    let response = app
        .request(
            "POST",
            "/roles/assign",
            Some(token),
            Some(serde_json::json!({ "user_id": target_id, "role_name": "Rescue Team Member" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (actor, data): (Option<uuid::Uuid>, serde_json::Value) = sqlx::query_as(
        "SELECT actor_id, data FROM audit_logs
         WHERE event_type = 'role_assigned' AND data->>'target_user_id' = $1
         ORDER BY created_utc DESC LIMIT 1",
    )
    .bind(target_id.to_string())
    .fetch_one(app.state.db.pool())
    .await
    .unwrap();

    assert_eq!(actor, Some(admin_id));
    assert_eq!(data["role_name"], "Rescue Team Member");
}
