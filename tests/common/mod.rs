#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use familyos_api::auth::{generate_jwt, Claims};
use familyos_api::config::AppConfig;
use familyos_api::modules::ModuleRegistry;
use familyos_api::testing::MemoryStore;
use familyos_api::AppState;

/// In-process server over the in-memory store
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    secret: String,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::development();
        config.api.enable_request_logging = false;
        let secret = config.security.jwt_secret.clone();

        let store = Arc::new(MemoryStore::new());
        let modules = ModuleRegistry::with_builtins();
        modules.init_all();

        let state = AppState::new(store.clone(), config, modules);
        Self {
            router: familyos_api::app(state),
            store,
            secret,
        }
    }

    /// Session token for a principal, signed like the auth provider would
    pub fn token(&self, user_id: &str, name: &str) -> String {
        let claims = Claims::new(user_id.to_string(), Some(name.to_string()), None, 1);
        generate_jwt(&claims, &self.secret).expect("sign test token")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json)?)
            }
            None => Body::empty(),
        };

        self.send(builder.body(body)?).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not JSON")?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, uri, Some(token), None).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Register a principal with a fresh family; returns their token and the family JSON
    pub async fn onboard(&self, user_id: &str, name: &str, family_name: &str) -> Result<(String, Value)> {
        let token = self.token(user_id, name);
        let (status, body) = self
            .post("/api/families", &token, serde_json::json!({ "name": family_name }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "family create failed: {} {}", status, body);
        Ok((token, body["data"].clone()))
    }
}
