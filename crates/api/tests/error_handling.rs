//! Error envelope and authentication failures.

mod common;

use ama_core::roles::Role;
use axum::http::StatusCode;
use common::{expect_status, get, get_auth, put_json_auth};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_token_is_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);

    let json = expect_status(get(app, "/api/orders").await, StatusCode::UNAUTHORIZED).await;

    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["error"], "Missing Authorization header");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn garbage_token_is_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);

    let json = expect_status(
        get_auth(app, "/api/orders", "not-a-jwt").await,
        StatusCode::UNAUTHORIZED,
    )
    .await;

    assert_eq!(json["error"], "Invalid or expired token");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_order_is_not_found(pool: PgPool) {
    let maker = common::create_user(&pool, "maker1", Role::Maker, true).await;
    let app = common::build_test_app(pool);

    let json = expect_status(
        put_json_auth(
            app,
            "/api/orders/999999",
            json!({ "title": "x" }),
            &common::token_for(&maker),
        )
        .await,
        StatusCode::NOT_FOUND,
    )
    .await;

    assert_eq!(json["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_admin_is_forbidden_from_admin_routes(pool: PgPool) {
    let maker = common::create_user(&pool, "maker1", Role::Maker, true).await;
    let app = common::build_test_app(pool);

    let json = expect_status(
        get_auth(app, "/api/admin/users", &common::token_for(&maker)).await,
        StatusCode::FORBIDDEN,
    )
    .await;

    assert_eq!(json["code"], "FORBIDDEN");
    assert_eq!(json["error"], "Admin role required");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_status_filter_is_a_validation_error(pool: PgPool) {
    let maker = common::create_user(&pool, "maker1", Role::Maker, true).await;
    let app = common::build_test_app(pool);

    let json = expect_status(
        get_auth(app, "/api/orders?status=shipped", &common::token_for(&maker)).await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    assert_eq!(json["code"], "VALIDATION_ERROR");
}
