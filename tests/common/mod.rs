#![allow(dead_code)]

use std::sync::OnceLock;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use devconnect::app::auth::{hash_password, AuthService};
use devconnect::domain::ports::{Repositories, UserWrite};
use devconnect::domain::user::{NewUser, Role};
use devconnect::infra::memory::MemoryStore;
use devconnect::AppState;

const TEST_ACCESS_KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";
pub const MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_PASSWORD: &str = "testpassword123";

/// Argon2 is slow in debug builds, so every seeded account shares one hash.
fn default_password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(DEFAULT_PASSWORD).expect("password hash failed"))
}

/// A fresh router over an empty in-memory store.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["msg"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub token: String,
}

pub fn app() -> TestApp {
    TestApp::new()
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_job_expiration(30)
    }

    pub fn with_job_expiration(job_expiration_days: i64) -> Self {
        let state = AppState {
            repos: Repositories::from_store(MemoryStore::new()),
            paseto_access_key: TEST_ACCESS_KEY,
            access_ttl_minutes: 20,
            job_expiration_days,
        };
        let router = devconnect::http::app(state.clone(), MAX_BODY_BYTES);
        TestApp { router, state }
    }

    pub fn repos(&self) -> &Repositories {
        &self.state.repos
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(method, path, body, &headers).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.send(Method::POST, path, Some(body), token).await
    }

    pub async fn put_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.send(Method::PUT, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::DELETE, path, None, token).await
    }

    /// Seeds an account straight into the store and issues it a token.
    /// The password is [`DEFAULT_PASSWORD`].
    pub async fn create_user(&self, name: &str, role: Role) -> TestUser {
        let email = format!("{}@example.com", name.to_lowercase());
        let write = self
            .state
            .repos
            .users
            .insert(NewUser {
                name: name.to_string(),
                email: email.clone(),
                password_hash: default_password_hash().to_string(),
                role,
                avatar: None,
            })
            .await
            .expect("insert test user failed");
        let user = match write {
            UserWrite::Saved(user) => user,
            other => panic!("unexpected write outcome: {:?}", other),
        };

        let auth_service = AuthService::new(
            &self.state.repos,
            self.state.paseto_access_key,
            self.state.access_ttl_minutes,
        );
        let access = auth_service
            .issue_access_token(user.id)
            .expect("issue_access_token failed");

        TestUser {
            id: user.id,
            name: user.name,
            email,
            token: access.token,
        }
    }

    pub async fn seeker(&self, name: &str) -> TestUser {
        self.create_user(name, Role::JobSeeker).await
    }

    pub async fn hirer(&self, name: &str) -> TestUser {
        self.create_user(name, Role::Hiring).await
    }
}
