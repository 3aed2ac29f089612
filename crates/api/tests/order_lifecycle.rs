//! End-to-end tests of order creation and updates through the HTTP API:
//! status transitions, history, notifications and failure auditing.

mod common;

use std::sync::Arc;

use ama_core::roles::Role;
use ama_db::repositories::OrderRepo;
use ama_events::OrderEmailKind;
use axum::http::StatusCode;
use axum::Router;
use chrono::{DateTime, Utc};
use common::{
    body_json, create_order, expect_status, get_auth, put_json_auth, Cast, RecordingNotifier,
};
use serde_json::{json, Value};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    app: Router,
    notifier: Arc<RecordingNotifier>,
    cast: Cast,
}

async fn harness(pool: &PgPool) -> Harness {
    let cast = Cast::seed(pool).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let app = common::build_test_app_with_notifier(pool.clone(), Arc::clone(&notifier));
    Harness {
        app,
        notifier,
        cast,
    }
}

fn order_id(order: &Value) -> i64 {
    order["id"].as_i64().expect("order id")
}

async fn update(app: &Router, token: &str, id: i64, body: Value) -> axum::response::Response {
    put_json_auth(app.clone(), &format!("/api/orders/{id}"), body, token).await
}

async fn notification_messages(app: &Router, token: &str) -> Vec<String> {
    let json = body_json(get_auth(app.clone(), "/api/notifications", token).await).await;
    json.as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap().to_string())
        .collect()
}

async fn order_errors(pool: &PgPool, user_id: i64) -> i64 {
    common::count(
        pool,
        "SELECT COUNT(*) FROM activity_logs WHERE action = 'order_error' AND user_id = $1",
        user_id,
    )
    .await
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_assigns_and_notifies_takers(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);

    let order = create_order(
        h.app.clone(),
        &maker,
        json!({
            "title": "Weekly",
            "city": "Nablus",
            "items": [{ "name": "Rice", "quantity": 2, "price": "3.5" }],
            "assignedTakerIds": [h.cast.taker.id, h.cast.taker.id],
        }),
    )
    .await;

    assert_eq!(order["status"], "pending");
    assert_eq!(order["description"], "Order with 1 items");
    assert_eq!(order["maker"]["id"], h.cast.maker.id);
    assert_eq!(order["assignedTakers"].as_array().unwrap().len(), 1);
    assert_eq!(order["items"][0]["quantity"].as_f64(), Some(2.0));
    assert_eq!(order["items"][0]["price"].as_f64(), Some(3.5));

    let taker = common::token_for(&h.cast.taker);
    assert_eq!(
        notification_messages(&h.app, &taker).await,
        ["New Order Assigned: Weekly"]
    );
    assert_eq!(h.notifier.pushes_to(h.cast.taker.id), ["New Order Assigned"]);
    assert_eq!(
        h.notifier.order_emails(),
        [(OrderEmailKind::Created, vec![h.cast.taker.id])]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_archived_order_is_never_assigned(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);

    let order = create_order(
        h.app.clone(),
        &maker,
        json!({
            "title": "Draft",
            "status": "archived",
            "items": [{ "name": "Rice", "quantity": 1 }],
            "assignedTakerIds": [h.cast.taker.id],
        }),
    )
    .await;

    assert_eq!(order["status"], "archived");
    assert!(order["assignedTakers"].as_array().unwrap().is_empty());
    assert!(h.notifier.sent().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_rejects_bad_references(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let items = json!([{ "name": "Rice", "quantity": 1 }]);

    let cases = [
        (json!({ "items": items, "accounterId": h.cast.taker.id }), "Invalid accounter selection"),
        (json!({ "items": items, "assignedTakerIds": [h.cast.maker.id] }), "Invalid taker selection"),
        (json!({ "items": items, "city": "Paris" }), "Invalid city 'Paris'"),
        (json!({ "items": [] }), "Order must have at least one item"),
    ];

    for (body, message) in cases {
        let response =
            common::post_json_auth(h.app.clone(), "/api/orders", body, &maker).await;
        let json = expect_status(response, StatusCode::BAD_REQUEST).await;
        assert_eq!(json["error"], message);
    }

    assert_eq!(order_errors(&pool, h.cast.maker.id).await, 4);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_taker_cannot_create_and_refusal_is_not_audited(pool: PgPool) {
    let h = harness(&pool).await;
    let taker = common::token_for(&h.cast.taker);

    let response = common::post_json_auth(
        h.app.clone(),
        "/api/orders",
        json!({ "items": [{ "name": "Rice", "quantity": 1 }] }),
        &taker,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(order_errors(&pool, h.cast.taker.id).await, 0);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_item_replacement_logs_only_differences(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let order = create_order(
        h.app.clone(),
        &maker,
        json!({ "items": [
            { "name": "Rice", "quantity": 2 },
            { "name": "Sugar", "quantity": 1 },
        ] }),
    )
    .await;
    let id = order_id(&order);

    let response = update(
        &h.app,
        &maker,
        id,
        json!({ "items": [
            { "name": "Rice", "quantity": 3 },
            { "name": "Sugar", "quantity": 1 },
            { "name": "Flour", "quantity": 1 },
        ] }),
    )
    .await;
    let updated = expect_status(response, StatusCode::OK).await;
    assert_eq!(updated["items"].as_array().unwrap().len(), 3);

    let admin = common::token_for(&h.cast.admin);
    let logs = body_json(
        get_auth(h.app.clone(), &format!("/api/admin/orders/{id}/logs"), &admin).await,
    )
    .await;
    let mut descriptions: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["newDescription"].as_str().unwrap())
        .collect();
    descriptions.sort_unstable();

    assert_eq!(descriptions, ["Added: Flour (Qty: 1)", "Updated Rice: Qty 2 -> 3"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sending_a_draft_resets_creation_time_and_notifies(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let draft = create_order(
        h.app.clone(),
        &maker,
        json!({
            "title": "Draft",
            "status": "archived",
            "items": [{ "name": "Rice", "quantity": 1 }],
        }),
    )
    .await;
    let id = order_id(&draft);
    let drafted_at: DateTime<Utc> = draft["createdAt"].as_str().unwrap().parse().unwrap();

    let response = update(
        &h.app,
        &maker,
        id,
        json!({ "status": "pending", "assignedTakerIds": [h.cast.taker.id] }),
    )
    .await;
    let sent = expect_status(response, StatusCode::OK).await;

    assert_eq!(sent["status"], "pending");
    let sent_at: DateTime<Utc> = sent["createdAt"].as_str().unwrap().parse().unwrap();
    assert!(sent_at > drafted_at);

    let history: Vec<&str> = sent["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["newDescription"].as_str().unwrap())
        .collect();
    assert!(history.contains(&"Status: archived -> pending"));
    assert!(history.contains(&"Updated Assigned Takers"));

    let taker = common::token_for(&h.cast.taker);
    let messages = notification_messages(&h.app, &taker).await;
    assert!(messages.contains(&"New Order Assigned: Draft".to_string()));
    assert_eq!(h.notifier.pushes_to(h.cast.taker.id).len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_taker_progress_informs_maker_and_hides_prices(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let order = create_order(
        h.app.clone(),
        &maker,
        json!({
            "items": [{ "name": "Rice", "quantity": 1, "price": 10 }],
            "assignedTakerIds": [h.cast.taker.id],
        }),
    )
    .await;
    let id = order_id(&order);

    let taker = common::token_for(&h.cast.taker);
    let response = update(&h.app, &taker, id, json!({ "status": "in-progress" })).await;
    let json = expect_status(response, StatusCode::OK).await;

    assert_eq!(json["status"], "in-progress");
    assert!(json["items"][0]["price"].is_null());

    assert_eq!(
        notification_messages(&h.app, &maker).await,
        [format!("Order #{id} status updated to 'in-progress' by taker1")]
    );
    assert!(h
        .notifier
        .order_emails()
        .contains(&(OrderEmailKind::UpdatedByTaker, vec![h.cast.maker.id])));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_taker_cannot_enter_erp(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let order = create_order(
        h.app.clone(),
        &maker,
        json!({
            "items": [{ "name": "Rice", "quantity": 1 }],
            "assignedTakerIds": [h.cast.taker.id],
        }),
    )
    .await;

    let taker = common::token_for(&h.cast.taker);
    let response = update(&h.app, &taker, order_id(&order), json!({ "status": "entered_erp" })).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(order_errors(&pool, h.cast.taker.id).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unassigned_taker_cannot_edit(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let order = create_order(
        h.app.clone(),
        &maker,
        json!({ "items": [{ "name": "Rice", "quantity": 1 }] }),
    )
    .await;

    let taker = common::token_for(&h.cast.taker);
    let json = expect_status(
        update(&h.app, &taker, order_id(&order), json!({ "title": "mine" })).await,
        StatusCode::FORBIDDEN,
    )
    .await;
    assert_eq!(json["error"], "Not authorized to edit this order");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_update_is_audited(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let order = create_order(
        h.app.clone(),
        &maker,
        json!({ "items": [{ "name": "Rice", "quantity": 1 }] }),
    )
    .await;
    let id = order_id(&order);

    let response = update(&h.app, &maker, id, json!({ "items": [] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (target, phase): (Option<i64>, Option<String>) = sqlx::query_as(
        "SELECT target_id, details->>'phase' FROM activity_logs WHERE action = 'order_error'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(target, Some(id));
    assert_eq!(phase.as_deref(), Some("update"));
}

// ---------------------------------------------------------------------------
// Accounting
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_completed_order_reaches_accounter_and_enters_erp(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let accounter = common::token_for(&h.cast.accounter);
    let order = create_order(
        h.app.clone(),
        &maker,
        json!({
            "title": "Invoice",
            "items": [{ "name": "Rice", "quantity": 1 }],
            "accounterId": h.cast.accounter.id,
        }),
    )
    .await;
    let id = order_id(&order);

    // Not completed yet.
    let json = expect_status(
        update(&h.app, &accounter, id, json!({ "status": "entered_erp" })).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["error"], "Order must be completed before entering ERP");

    let response = update(&h.app, &maker, id, json!({ "status": "completed" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        notification_messages(&h.app, &accounter).await,
        [format!("New completed order ready for review: Order #{id} - Invoice")]
    );
    assert_eq!(h.notifier.pushes_to(h.cast.accounter.id), ["New Completed Order"]);
    assert!(h
        .notifier
        .order_emails()
        .contains(&(OrderEmailKind::CompletedForAccounter, vec![h.cast.accounter.id])));

    let json = expect_status(
        update(&h.app, &accounter, id, json!({ "status": "entered_erp", "title": "x" })).await,
        StatusCode::FORBIDDEN,
    )
    .await;
    assert_eq!(json["error"], "Accounters cannot edit order details");

    let json = expect_status(
        update(&h.app, &accounter, id, json!({ "status": "entered_erp" })).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["status"], "entered_erp");

    let status_changes = common::count(
        &pool,
        "SELECT COUNT(*) FROM activity_logs WHERE action = 'order_status_changed' AND target_id = $1",
        id,
    )
    .await;
    assert_eq!(status_changes, 1);

    // Only an admin reopens an ERP-entered order.
    let response = update(&h.app, &maker, id, json!({ "status": "pending" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = common::token_for(&h.cast.admin);
    let json = expect_status(
        update(&h.app, &admin, id, json!({ "status": "pending" })).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["status"], "pending");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_other_accounter_cannot_process(pool: PgPool) {
    let h = harness(&pool).await;
    let other =
        common::create_user(&pool, "accounter2", ama_core::roles::Role::Accounter, true).await;
    let maker = common::token_for(&h.cast.maker);
    let order = create_order(
        h.app.clone(),
        &maker,
        json!({
            "status": "pending",
            "items": [{ "name": "Rice", "quantity": 1 }],
            "accounterId": h.cast.accounter.id,
        }),
    )
    .await;

    let json = expect_status(
        update(
            &h.app,
            &common::token_for(&other),
            order_id(&order),
            json!({ "status": "entered_erp" }),
        )
        .await,
        StatusCode::FORBIDDEN,
    )
    .await;
    assert_eq!(json["error"], "Not authorized to process this order");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_taker_cannot_route_to_accounter(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let order = create_order(
        h.app.clone(),
        &maker,
        json!({
            "items": [{ "name": "Rice", "quantity": 1 }],
            "assignedTakerIds": [h.cast.taker.id],
        }),
    )
    .await;

    let taker = common::token_for(&h.cast.taker);
    let response = update(
        &h.app,
        &taker,
        order_id(&order),
        json!({ "accounterId": h.cast.accounter.id }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Partial and concurrent updates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_partial_update_keeps_fields_it_did_not_send(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let taker = common::token_for(&h.cast.taker);
    let order = create_order(
        h.app.clone(),
        &maker,
        json!({
            "title": "Orig",
            "description": "Weekly run",
            "city": "Nablus",
            "accounterId": h.cast.accounter.id,
            "items": [{ "name": "Rice", "quantity": 1 }],
            "assignedTakerIds": [h.cast.taker.id],
        }),
    )
    .await;
    let id = order_id(&order);

    let response = update(&h.app, &taker, id, json!({ "status": "in-progress" })).await;
    expect_status(response, StatusCode::OK).await;
    let response = update(&h.app, &maker, id, json!({ "description": "Moved to Friday" })).await;
    let json = expect_status(response, StatusCode::OK).await;

    assert_eq!(json["title"], "Orig");
    assert_eq!(json["description"], "Moved to Friday");
    assert_eq!(json["city"], "Nablus");
    assert_eq!(json["accounterId"], h.cast.accounter.id);
    assert_eq!(json["status"], "in-progress");
    assert_eq!(json["items"][0]["name"], "Rice");
    assert_eq!(json["assignedTakers"][0]["id"], h.cast.taker.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_updates_to_different_fields_both_stick(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);
    let taker = common::token_for(&h.cast.taker);

    for round in 0..10 {
        let order = create_order(
            h.app.clone(),
            &maker,
            json!({
                "title": "Orig",
                "items": [{ "name": "Rice", "quantity": 1 }],
                "assignedTakerIds": [h.cast.taker.id],
            }),
        )
        .await;
        let id = order_id(&order);

        let (by_maker, by_taker) = tokio::join!(
            update(&h.app, &maker, id, json!({ "title": "New" })),
            update(&h.app, &taker, id, json!({ "status": "in-progress" })),
        );
        assert_eq!(by_maker.status(), StatusCode::OK, "round {round}");
        assert_eq!(by_taker.status(), StatusCode::OK, "round {round}");

        let stored = OrderRepo::find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("New"), "round {round}");
        assert_eq!(stored.status, "in-progress", "round {round}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sending_a_draft_notifies_each_assigned_taker_once(pool: PgPool) {
    let h = harness(&pool).await;
    let second = common::create_user(&pool, "taker2", Role::Taker, true).await;
    let maker = common::token_for(&h.cast.maker);
    let draft = create_order(
        h.app.clone(),
        &maker,
        json!({
            "title": "Draft",
            "status": "archived",
            "items": [{ "name": "Rice", "quantity": 1 }],
        }),
    )
    .await;
    let id = order_id(&draft);

    let response = update(
        &h.app,
        &maker,
        id,
        json!({ "assignedTakerIds": [h.cast.taker.id, second.id] }),
    )
    .await;
    let still_draft = expect_status(response, StatusCode::OK).await;
    assert_eq!(still_draft["status"], "archived");

    let pushes_before = [
        h.notifier.pushes_to(h.cast.taker.id).len(),
        h.notifier.pushes_to(second.id).len(),
    ];

    let response = update(&h.app, &maker, id, json!({ "status": "pending" })).await;
    expect_status(response, StatusCode::OK).await;

    for (taker, before) in [&h.cast.taker, &second].into_iter().zip(pushes_before) {
        let sent: Vec<String> = notification_messages(&h.app, &common::token_for(taker))
            .await
            .into_iter()
            .filter(|m| m == "New Order Assigned: Draft")
            .collect();
        assert_eq!(sent.len(), 1, "{}", taker.username);
        assert_eq!(h.notifier.pushes_to(taker.id).len(), before + 1, "{}", taker.username);
    }
}

// ---------------------------------------------------------------------------
// Loose form values
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_blank_accounter_id_means_none(pool: PgPool) {
    let h = harness(&pool).await;
    let maker = common::token_for(&h.cast.maker);

    let order = create_order(
        h.app.clone(),
        &maker,
        json!({
            "accounterId": "",
            "items": [{ "name": "Rice", "quantity": 1 }],
        }),
    )
    .await;
    assert!(order["accounterId"].is_null());
    let id = order_id(&order);

    let response = update(
        &h.app,
        &maker,
        id,
        json!({ "accounterId": h.cast.accounter.id.to_string() }),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["accounterId"], h.cast.accounter.id);

    let response = update(&h.app, &maker, id, json!({ "accounterId": "" })).await;
    let json = expect_status(response, StatusCode::OK).await;
    assert!(json["accounterId"].is_null());
}
