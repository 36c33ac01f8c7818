use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;

use super::helpers::read_cookie;
use super::session::SESSION_COOKIE;
use crate::server::AppState;
use crate::server::flash::redirect_with_flash;
use crate::types::User;

/// Extractor that requires a logged-in user.
pub struct CurrentUser {
    pub user: User,
    pub session_id: String,
}

/// Extractor that requires a manager or admin.
pub struct RequireLead(pub User);

/// Extractor that requires an admin.
pub struct RequireAdmin(pub User);

#[derive(Debug)]
pub enum AuthError {
    MissingSession,
    SessionExpired,
    NotLead,
    NotAdmin,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingSession => Redirect::to("/login").into_response(),
            AuthError::SessionExpired => {
                redirect_with_flash("/login", "Your session has expired, please log in again")
            }
            AuthError::NotLead => {
                redirect_with_flash("/", "This page is available to managers and admins only")
            }
            AuthError::NotAdmin => redirect_with_flash("/", "This page is available to admins only"),
            AuthError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<h1>Internal Server Error</h1>"),
            )
                .into_response(),
        }
    }
}

/// Resolves the session cookie to its session id, if a cookie is present.
pub fn session_id_from_parts(parts: &Parts, state: &AppState) -> Option<String> {
    read_cookie(&parts.headers, SESSION_COOKIE)
        .filter(|token| !token.is_empty())
        .map(|token| state.sessions.session_id(token))
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session_id = session_id_from_parts(parts, state).ok_or(AuthError::MissingSession)?;

        let session = state
            .store
            .get_session(&session_id)
            .map_err(|e| {
                tracing::error!("Failed to load session: {e}");
                AuthError::InternalError
            })?
            .ok_or(AuthError::MissingSession)?;

        if session.expires_at < Utc::now() {
            if let Err(e) = state.store.delete_session(&session.id) {
                tracing::warn!("Failed to delete expired session: {e}");
            }
            return Err(AuthError::SessionExpired);
        }

        let user = state
            .store
            .get_user(session.user_id)
            .map_err(|e| {
                tracing::error!("Failed to load session user: {e}");
                AuthError::InternalError
            })?
            .ok_or(AuthError::MissingSession)?;

        Ok(CurrentUser { user, session_id })
    }
}

impl FromRequestParts<Arc<AppState>> for RequireLead {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;

        if !user.role.is_lead() {
            return Err(AuthError::NotLead);
        }

        Ok(RequireLead(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;

        if user.role != crate::types::Role::Admin {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(user))
    }
}
