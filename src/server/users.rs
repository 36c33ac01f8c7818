use std::sync::Arc;

use axum::{
    extract::{Form, Path, State},
    response::Response,
};
use serde::Serialize;
use tera::Context;

use super::AppState;
use super::dto::{UserOption, UserRoleForm};
use super::flash::{Flash, redirect_with_flash};
use super::response::{PageError, StoreOptionExt, StoreResultExt};
use super::validation::non_blank;
use super::views::render;
use crate::auth::RequireAdmin;
use crate::types::{Role, User};

const USERS_PATH: &str = "/users";

#[derive(Serialize)]
struct UserRow<'a> {
    #[serde(flatten)]
    user: &'a User,
    manager: Option<&'a str>,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    flash: Flash,
) -> Result<Response, PageError> {
    let users = state.store.list_users().page_err("Failed to list users")?;

    let rows: Vec<UserRow<'_>> = users
        .iter()
        .map(|user| UserRow {
            user,
            manager: user
                .manager_id
                .and_then(|id| users.iter().find(|u| u.id == id))
                .map(|u| u.username.as_str()),
        })
        .collect();
    let managers: Vec<UserOption> = users
        .iter()
        .filter(|u| u.role.is_lead())
        .map(UserOption::from)
        .collect();

    let mut context = Context::new();
    context.insert("users", &rows);
    context.insert("managers", &managers);
    context.insert("roles", &Role::ALL);

    render(&state, "users.html", context, Some(&admin), &flash)
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Form(form): Form<UserRoleForm>,
) -> Result<Response, PageError> {
    let target = state
        .store
        .get_user(id)
        .page_err("Failed to load user")?
        .or_not_found("User not found")?;

    let role = Role::parse(form.role.trim())
        .ok_or_else(|| PageError::flash(USERS_PATH, format!("Unknown role '{}'", form.role)))?;

    if target.id == admin.id && role != Role::Admin {
        return Err(PageError::flash(
            USERS_PATH,
            "You cannot remove your own admin role",
        ));
    }

    let manager_id = match non_blank(form.manager.as_deref()) {
        None => None,
        Some(username) => {
            let manager = state
                .store
                .get_user_by_username(username)
                .page_err("Failed to look up manager")?
                .ok_or_else(|| PageError::flash(USERS_PATH, format!("Unknown user '{username}'")))?;
            if manager.id == target.id {
                return Err(PageError::flash(
                    USERS_PATH,
                    "A user cannot be their own manager",
                ));
            }
            if !manager.role.is_lead() {
                return Err(PageError::flash(
                    USERS_PATH,
                    format!("{username} is not a manager"),
                ));
            }
            Some(manager.id)
        }
    };

    state
        .store
        .update_user_role(target.id, role, manager_id)
        .page_err("Failed to update user")?;

    tracing::info!(
        "Admin {} set {} to role {role}",
        admin.username,
        target.username
    );

    if target.id != admin.id && target.role != role {
        let note = format!("Your role is now {role}");
        if let Err(e) = state.store.create_notification(target.id, &note, None) {
            tracing::warn!("Failed to notify user {}: {e}", target.id);
        }
    }

    Ok(redirect_with_flash(
        USERS_PATH,
        &format!("Updated {}", target.username),
    ))
}
