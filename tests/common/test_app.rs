use std::sync::{Arc, LazyLock};

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use chrono::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use taskdesk::auth::{PasswordHasher, SessionKeys};
use taskdesk::server::{AppState, create_router};
use taskdesk::store::{SqliteStore, Store};
use taskdesk::types::{NewUser, Role};

pub const PASSWORD: &str = "correct-horse";
pub const SESSION_SECRET: &str = "test-secret";

static PASSWORD_HASH: LazyLock<String> = LazyLock::new(|| {
    PasswordHasher::new()
        .hash(PASSWORD)
        .expect("hash test password")
});

/// In-process application backed by a throwaway database.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    router: Router,
}

/// A logged-in user and the cookie that authenticates them.
pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub cookie: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_sessions(SessionKeys::new(SESSION_SECRET, Duration::hours(1)))
    }

    pub fn with_sessions(sessions: SessionKeys) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(
            SqliteStore::new(temp_dir.path().join("taskdesk.db")).expect("open database"),
        );
        store.initialize().expect("initialize database");

        let state = Arc::new(AppState::new(store.clone(), sessions).expect("build state"));

        Self {
            temp_dir,
            store,
            router: create_router(state),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("build request"))
            .await
    }

    pub async fn post_form(&self, path: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Response {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).expect("build request"))
            .await
    }

    pub async fn post_multipart(&self, path: &str, cookie: &str, boundary: &str, body: Vec<u8>) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header(COOKIE, cookie)
            .body(Body::from(body))
            .expect("build request");
        self.send(request).await
    }

    /// Logs in through the form and returns the session cookie pair.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/login",
                None,
                &[("username", username), ("password", password)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        cookie_pair(&response, "taskdesk_session").expect("session cookie")
    }

    /// Creates a user directly in the store and logs them in.
    pub async fn user(&self, username: &str, role: Role, manager_id: Option<i64>) -> TestUser {
        let id = self
            .store
            .create_user(&NewUser {
                username: username.to_string(),
                password_hash: PASSWORD_HASH.clone(),
                role,
                manager_id,
            })
            .expect("create user");
        let cookie = self.login(username, PASSWORD).await;

        TestUser {
            id,
            username: username.to_string(),
            cookie,
        }
    }
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Returns `name=value` from the response's `Set-Cookie` headers.
pub fn cookie_pair(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

/// Decoded flash message set by a redirect, if any.
pub fn flash_message(response: &Response) -> Option<String> {
    let pair = cookie_pair(response, "taskdesk_flash")?;
    let value = pair.split_once('=')?.1;
    Some(urlencoding::decode(value).ok()?.into_owned())
}
