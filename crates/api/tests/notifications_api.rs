//! In-app notification inbox and push subscription endpoints.

mod common;

use axum::http::StatusCode;
use common::{create_order, expect_status, get_auth, post_json_auth, put_json_auth, token_for, Cast};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn assign_two_orders(app: &axum::Router, cast: &Cast) {
    let maker = token_for(&cast.maker);
    for title in ["Monday", "Tuesday"] {
        create_order(
            app.clone(),
            &maker,
            json!({
                "title": title,
                "items": [{ "name": "Rice", "quantity": 1 }],
                "assignedTakerIds": [cast.taker.id],
            }),
        )
        .await;
    }
}

async fn unread(app: &axum::Router, token: &str) -> Value {
    let json = expect_status(
        get_auth(app.clone(), "/api/notifications/unread-count", token).await,
        StatusCode::OK,
    )
    .await;
    json["count"].clone()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_inbox_lists_newest_first_and_marks_read(pool: PgPool) {
    let cast = Cast::seed(&pool).await;
    let app = common::build_test_app(pool);
    assign_two_orders(&app, &cast).await;
    let taker = token_for(&cast.taker);

    let inbox = expect_status(
        get_auth(app.clone(), "/api/notifications", &taker).await,
        StatusCode::OK,
    )
    .await;
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0]["message"], "New Order Assigned: Tuesday");
    assert_eq!(inbox[0]["type"], "alert");
    assert_eq!(inbox[0]["isRead"], false);
    assert_eq!(unread(&app, &taker).await, 2);

    let json = expect_status(
        put_json_auth(
            app.clone(),
            &format!("/api/notifications/{}/read", inbox[0]["id"]),
            json!({}),
            &taker,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["isRead"], true);
    assert_eq!(unread(&app, &taker).await, 1);

    let json = expect_status(
        put_json_auth(app.clone(), "/api/notifications/read-all", json!({}), &taker).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["message"], "All marked as read");
    assert_eq!(unread(&app, &taker).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cannot_touch_another_users_notification(pool: PgPool) {
    let cast = Cast::seed(&pool).await;
    let app = common::build_test_app(pool);
    assign_two_orders(&app, &cast).await;

    let inbox = expect_status(
        get_auth(app.clone(), "/api/notifications", &token_for(&cast.taker)).await,
        StatusCode::OK,
    )
    .await;
    let uri = format!("/api/notifications/{}/read", inbox[0]["id"]);

    let json = expect_status(
        put_json_auth(app.clone(), &uri, json!({}), &token_for(&cast.maker)).await,
        StatusCode::FORBIDDEN,
    )
    .await;
    assert_eq!(json["error"], "Cannot modify another user's notification");

    expect_status(
        put_json_auth(app, "/api/notifications/999999/read", json!({}), &token_for(&cast.maker))
            .await,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_push_subscription_moves_to_latest_user(pool: PgPool) {
    let cast = Cast::seed(&pool).await;
    let app = common::build_test_app(pool.clone());
    let body = json!({
        "endpoint": "https://push.example/abc",
        "keys": { "p256dh": "key", "auth": "secret" },
    });

    let json = expect_status(
        post_json_auth(app.clone(), "/api/notifications/subscribe", body.clone(), &token_for(&cast.taker))
            .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(json["message"], "Subscribed successfully");

    expect_status(
        post_json_auth(app.clone(), "/api/notifications/subscribe", body, &token_for(&cast.maker))
            .await,
        StatusCode::CREATED,
    )
    .await;

    let owner: i64 = sqlx::query_scalar("SELECT user_id FROM push_subscriptions WHERE endpoint = $1")
        .bind("https://push.example/abc")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(owner, cast.maker.id);

    let json = expect_status(
        post_json_auth(
            app,
            "/api/notifications/subscribe",
            json!({ "endpoint": " ", "keys": { "p256dh": "k", "auth": "a" } }),
            &token_for(&cast.taker),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["error"], "Subscription endpoint is required");
}
