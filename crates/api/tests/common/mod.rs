#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use barbcut_api::auth::jwt::{generate_token, JwtConfig};
use barbcut_api::config::ServerConfig;
use barbcut_api::router::build_app_router;
use barbcut_api::state::AppState;
use barbcut_db::document::object;
use barbcut_db::{DocumentStore, MemoryStore, SharedStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:8081".parse().unwrap()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: SECRET.to_string(),
        },
    }
}

pub struct TestApp {
    pub store: SharedStore,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let router = build_app_router(AppState::new(store.clone(), test_config()));
        Self { store, router }
    }

    /// A user with `points` credits and a front reference photo.
    pub async fn seed_user(&self, user_id: &str, points: i64) {
        self.store
            .set("users", user_id, object(json!({ "points": points })))
            .await
            .unwrap();
        self.store
            .set(
                "userPhotos",
                user_id,
                object(json!({ "front": format!("users/{user_id}/front.jpg") })),
            )
            .await
            .unwrap();
    }

    pub async fn user_exists(&self, user_id: &str) -> bool {
        self.store.get("users", user_id).await.unwrap().is_some()
    }

    pub async fn points(&self, user_id: &str) -> i64 {
        self.store
            .get("users", user_id)
            .await
            .unwrap()
            .and_then(|s| s.data.get("points").and_then(Value::as_i64))
            .unwrap_or(0)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }
}

pub fn token(user_id: &str) -> String {
    generate_token(user_id, None, &test_config().jwt).unwrap()
}

pub fn admin_token(user_id: &str) -> String {
    generate_token(user_id, Some("admin"), &test_config().jwt).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert status and error code of a failed response.
pub async fn assert_error(response: Response<Body>, status: StatusCode, code: &str) -> Value {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code, "unexpected body: {json}");
    json
}
