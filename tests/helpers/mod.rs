//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{HeaderMap, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use cipherbox_api::{Collaborators, assemble_state, build_app};
use cipherbox_auth::MemoryIdentityProvider;
use cipherbox_core::config::AppConfig;
use cipherbox_core::types::RetentionPolicy;
use cipherbox_database::{MemorySessionStore, MemoryUserDirectory};
use cipherbox_storage::providers::MemoryBlobStore;

const BOUNDARY: &str = "cipherbox-test-boundary";

/// Test application context backed entirely by in-memory collaborators.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Identity provider, for marking addresses verified
    pub identity: MemoryIdentityProvider,
    /// Blob store, for inspecting or corrupting stored objects
    pub blobs: MemoryBlobStore,
    /// Application config
    pub config: AppConfig,
}

/// A captured response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.server.public_base_url = "http://localhost:3000".to_string();

        let identity = MemoryIdentityProvider::new();
        let blobs = MemoryBlobStore::new();
        let collaborators = Collaborators {
            blob_store: Arc::new(blobs.clone()),
            session_store: Arc::new(MemorySessionStore::with_retention(
                RetentionPolicy::new(config.session.max_tokens_per_user)
                    .with_expiry_grace(config.auth.leeway_seconds),
            )),
            users: Arc::new(MemoryUserDirectory::new()),
            identity: Arc::new(identity.clone()),
        };
        let state = assemble_state(config.clone(), collaborators).expect("Failed to build state");

        Self {
            router: build_app(state),
            identity,
            blobs,
            config,
        }
    }

    /// Send a request with an optional JSON body and bearer token.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send(request).await
    }

    /// Upload `content` as multipart field `file`.
    pub async fn upload(
        &self,
        token: &str,
        filename: &str,
        content: &[u8],
        content_type: &str,
    ) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/files/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    /// Sign up, verify, and log in. Returns `(access, refresh)`.
    pub async fn login_new_user(&self, email: &str) -> (String, String) {
        let password = "correct-horse-1";
        let signup = self
            .request(
                "POST",
                "/auth/signup",
                Some(serde_json::json!({ "email": email, "password": password, "name": "Test" })),
                None,
            )
            .await;
        assert_eq!(signup.status, StatusCode::OK, "{}", signup.text());
        self.identity.mark_verified(email).unwrap();

        let login = self
            .request(
                "POST",
                "/auth/login",
                Some(serde_json::json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.text());
        let body = login.json();
        (
            body["accessToken"].as_str().unwrap().to_string(),
            body["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        TestResponse {
            status,
            headers,
            bytes,
        }
    }
}
