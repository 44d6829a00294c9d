use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use shared::Product;
use storefront_service::api::{create_router, AppState};
use storefront_service::auth::JwtKeys;
use storefront_service::store::{MemoryStore, Store};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub jwt: Arc<JwtKeys>,
}

pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let jwt = Arc::new(JwtKeys::from_secret("integration-test-secret"));
    let state = AppState {
        store: store.clone(),
        jwt: jwt.clone(),
    };
    TestApp {
        router: create_router(state),
        store,
        jwt,
    }
}

impl TestApp {
    pub fn token_for(&self, user: Uuid) -> String {
        self.jwt.issue(user, 3600).unwrap()
    }

    pub async fn seed_product(&self, name: &str, price: &str, inventory: Option<i32>) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price: price.parse().unwrap(),
            inventory,
        };
        self.store.insert_product(&product).await.unwrap();
        product
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send(self.router.clone(), method, path, token, body).await
    }
}

pub async fn send(
    router: Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}
