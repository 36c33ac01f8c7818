use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tera::Context;

use super::AppState;
use super::flash::Flash;
use super::response::{PageError, StoreResultExt};
use super::views::render;
use crate::auth::CurrentUser;

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    flash: Flash,
) -> Result<Response, PageError> {
    let notifications = state
        .store
        .list_notifications(user.id)
        .page_err("Failed to load notifications")?;

    let mut context = Context::new();
    context.insert("notifications", &notifications);

    render(&state, "notifications.html", context, Some(&user), &flash)
}

pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Response, PageError> {
    let marked = state
        .store
        .mark_notifications_read(user.id)
        .page_err("Failed to update notifications")?;

    tracing::debug!("Marked {marked} notifications read for {}", user.username);

    Ok(Redirect::to("/notifications").into_response())
}
