#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ama_api::auth::jwt::{generate_access_token, JwtConfig};
use ama_api::auth::password::hash_password;
use ama_api::config::{AdminSeed, ServerConfig};
use ama_api::router::build_app_router;
use ama_api::state::AppState;
use ama_core::roles::Role;
use ama_core::settings::OrderSettings;
use ama_core::types::DbId;
use ama_db::models::user::{CreateUser, User};
use ama_db::repositories::UserRepo;
use ama_events::{Notifier, OrderEmail, OrderEmailKind, PushMessage, Recipient};
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub const PASSWORD: &str = "secret123";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 60,
        },
        orders: OrderSettings::from_list("Nablus,Jenin,Hebron"),
        admin: AdminSeed {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Recording notifier
// ---------------------------------------------------------------------------

/// One call made to the notifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Push {
        user_id: DbId,
        title: String,
    },
    OrderEmail {
        kind: OrderEmailKind,
        order_id: DbId,
        to: Vec<DbId>,
        changes: Vec<String>,
    },
    BulkEmail {
        to: DbId,
        order_ids: Vec<DbId>,
    },
}

/// Notifier that remembers every call instead of delivering anything.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn pushes_to(&self, user_id: DbId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Push { user_id: id, title } if id == user_id => Some(title),
                _ => None,
            })
            .collect()
    }

    pub fn order_emails(&self) -> Vec<(OrderEmailKind, Vec<DbId>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::OrderEmail { kind, to, .. } => Some((kind, to)),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, user_id: DbId, message: PushMessage) {
        self.sent.lock().unwrap().push(Sent::Push {
            user_id,
            title: message.title,
        });
    }

    fn send_order_email(
        &self,
        kind: OrderEmailKind,
        order: &OrderEmail,
        recipients: &[Recipient],
        _actor: &Recipient,
        changes: &[String],
    ) {
        self.sent.lock().unwrap().push(Sent::OrderEmail {
            kind,
            order_id: order.id,
            to: recipients.iter().map(|r| r.id).collect(),
            changes: changes.to_vec(),
        });
    }

    fn send_bulk_email(&self, orders: &[OrderEmail], recipient: &Recipient, _sender: &Recipient) {
        self.sent.lock().unwrap().push(Sent::BulkEmail {
            to: recipient.id,
            order_ids: orders.iter().map(|o| o.id).collect(),
        });
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// The production router over `pool`, with a notifier nobody inspects.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_notifier(pool, Arc::new(RecordingNotifier::default()))
}

/// The production router over `pool`, reporting to `notifier`.
pub fn build_test_app_with_notifier(pool: PgPool, notifier: Arc<RecordingNotifier>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        notifier,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user with [`PASSWORD`], approved unless `approved` is false.
pub async fn create_user(pool: &PgPool, username: &str, role: Role, approved: bool) -> User {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            password_hash: hash_password(PASSWORD).expect("hashing should succeed"),
            role,
            email: Some(format!("{username}@example.com")),
        },
    )
    .await
    .expect("user creation should succeed");

    if approved && !user.is_approved {
        UserRepo::approve(pool, user.id, user.id)
            .await
            .expect("approval should succeed")
            .expect("user should exist")
    } else {
        user
    }
}

/// One approved user per role.
pub struct Cast {
    pub maker: User,
    pub taker: User,
    pub accounter: User,
    pub admin: User,
}

impl Cast {
    pub async fn seed(pool: &PgPool) -> Self {
        Self {
            maker: create_user(pool, "maker1", Role::Maker, true).await,
            taker: create_user(pool, "taker1", Role::Taker, true).await,
            accounter: create_user(pool, "accounter1", Role::Accounter, true).await,
            admin: create_user(pool, "boss", Role::Admin, true).await,
        }
    }
}

/// Run a `SELECT COUNT(*)` with one bound id.
pub async fn count(pool: &PgPool, sql: &str, id: DbId) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("count query should succeed")
}

/// A bearer token for `user`, signed with the test secret.
pub fn token_for(user: &User) -> String {
    generate_access_token(user.id, &user.username, &user.role, &test_config().jwt)
        .expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Read the full response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    app.oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Assert on the status and return the JSON body.
pub async fn expect_status(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

/// POST an order and return the created body, asserting 201.
pub async fn create_order(app: Router, token: &str, body: serde_json::Value) -> serde_json::Value {
    let response = post_json_auth(app, "/api/orders", body, token).await;
    expect_status(response, StatusCode::CREATED).await
}
