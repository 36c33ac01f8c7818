use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tera::Context;

use super::AppState;
use super::dto::{LoginForm, RegisterForm};
use super::flash::{Flash, redirect_with_flash};
use super::response::{PageError, StoreResultExt};
use super::validation::{validate_password, validate_username};
use super::views::render;
use crate::auth::{CurrentUser, DUMMY_HASH, PasswordHasher};
use crate::error::{Error, Result as StoreResult};
use crate::types::{NewUser, Role};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

async fn hash_password(password: String) -> StoreResult<String> {
    tokio::task::spawn_blocking(move || PasswordHasher::new().hash(&password))
        .await
        .map_err(|e| Error::PasswordHash(format!("hashing task failed: {e}")))?
}

async fn verify_password(password: String, hash: String) -> StoreResult<bool> {
    tokio::task::spawn_blocking(move || PasswordHasher::new().verify(&password, &hash))
        .await
        .map_err(|e| Error::PasswordHash(format!("verification task failed: {e}")))?
}

pub async fn login_page(
    State(state): State<Arc<AppState>>,
    flash: Flash,
) -> Result<Response, PageError> {
    render(&state, "login.html", Context::new(), None, &flash)
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let Some(user) = state
        .store
        .get_user_by_username(form.username.trim())
        .page_err("Failed to look up user")?
    else {
        // Unknown users cost one Argon2 run, same as known ones.
        if let Err(e) = verify_password(form.password, DUMMY_HASH.to_string()).await {
            tracing::warn!("Cannot verify against the dummy hash: {e}");
        }
        return Err(PageError::flash("/login", INVALID_CREDENTIALS));
    };

    let verified = match verify_password(form.password, user.password_hash.clone()).await {
        Ok(verified) => verified,
        Err(e) => {
            tracing::warn!("Cannot verify password for {}: {e}", user.username);
            false
        }
    };
    if !verified {
        tracing::warn!("Failed login for {}", user.username);
        return Err(PageError::flash("/login", INVALID_CREDENTIALS));
    }

    match state.store.delete_expired_sessions(Utc::now()) {
        Ok(0) => {}
        Ok(n) => tracing::debug!("Removed {n} expired sessions"),
        Err(e) => tracing::warn!("Failed to remove expired sessions: {e}"),
    }

    let (token, session) = state.sessions.issue(user.id);
    state
        .store
        .create_session(&session)
        .page_err("Failed to create session")?;

    tracing::info!("User {} logged in", user.username);

    let cookie = state.sessions.cookie(&token);
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

pub async fn register_page(
    State(state): State<Arc<AppState>>,
    flash: Flash,
) -> Result<Response, PageError> {
    render(&state, "register.html", Context::new(), None, &flash)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    let username = form.username.trim().to_string();
    validate_username(&username).map_err(|msg| PageError::flash("/register", msg))?;
    validate_password(&form.password).map_err(|msg| PageError::flash("/register", msg))?;

    let password_hash = hash_password(form.password)
        .await
        .page_err("Failed to hash password")?;

    let new_user = NewUser {
        username: username.clone(),
        password_hash,
        role: Role::default(),
        manager_id: None,
    };

    match state.store.create_user(&new_user) {
        Ok(id) => {
            tracing::info!("Registered user {username} ({id})");
            Ok(redirect_with_flash(
                "/login",
                "Registration successful, please log in",
            ))
        }
        Err(Error::AlreadyExists) => Err(PageError::flash(
            "/register",
            format!("Username '{username}' is already taken"),
        )),
        Err(e) => {
            tracing::error!("Failed to register {username}: {e}");
            Err(PageError::internal("Failed to register user"))
        }
    }
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, session_id }: CurrentUser,
) -> Response {
    if let Err(e) = state.store.delete_session(&session_id) {
        tracing::warn!("Failed to delete session for {}: {e}", user.username);
    }

    (
        [(SET_COOKIE, state.sessions.expired_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}
