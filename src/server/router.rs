use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post},
};
use tera::Tera;

use super::validation::MAX_UPLOAD_BYTES;
use super::views::load_templates;
use super::{account, messages, notifications, projects, stats, tasks, users};
use crate::auth::SessionKeys;
use crate::error::Result;
use crate::store::Store;

// Room for the non-file form fields around a maximum-size upload.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: SessionKeys,
    pub templates: Tera,
}

impl AppState {
    /// Builds the state with the embedded templates loaded.
    pub fn new(store: Arc<dyn Store>, sessions: SessionKeys) -> Result<Self> {
        Ok(Self {
            store,
            sessions,
            templates: load_templates()?,
        })
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Tasks
        .route("/", get(tasks::index).post(tasks::create_task))
        .route("/toggle/{id}", get(tasks::toggle_task))
        .route("/delete/{id}", get(tasks::delete_task))
        .route("/download/{id}", get(tasks::download_attachment))
        .route(
            "/task/{id}",
            get(tasks::task_detail).post(tasks::task_action),
        )
        // Accounts
        .route("/login", get(account::login_page).post(account::login))
        .route(
            "/register",
            get(account::register_page).post(account::register),
        )
        .route("/logout", get(account::logout))
        // Messaging
        .route("/messages", get(messages::list_messages))
        .route("/send_message", post(messages::send_message))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read", post(notifications::mark_all_read))
        // Team
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/stats", get(stats::team_stats))
        .route("/users", get(users::list_users))
        .route("/users/{id}", post(users::update_user))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + FORM_OVERHEAD_BYTES))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
