use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Form, State},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::Context;

use super::AppState;
use super::dto::ProjectForm;
use super::flash::{Flash, redirect_with_flash};
use super::response::{PageError, StoreResultExt};
use super::validation::non_blank;
use super::views::render;
use crate::auth::{CurrentUser, RequireLead};
use crate::types::NewProject;

const PROJECTS_PATH: &str = "/projects";
const MAX_PROJECT_NAME_LEN: usize = 100;

#[derive(Serialize)]
struct ProjectRow {
    id: i64,
    name: String,
    description: Option<String>,
    manager: Option<String>,
    created_at: DateTime<Utc>,
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    flash: Flash,
) -> Result<Response, PageError> {
    let users = state.store.list_users().page_err("Failed to list users")?;
    let names: HashMap<i64, &str> = users.iter().map(|u| (u.id, u.username.as_str())).collect();

    let projects: Vec<ProjectRow> = state
        .store
        .list_projects()
        .page_err("Failed to list projects")?
        .into_iter()
        .map(|p| ProjectRow {
            id: p.id,
            manager: p
                .manager_id
                .and_then(|id| names.get(&id))
                .map(|name| name.to_string()),
            name: p.name,
            description: p.description,
            created_at: p.created_at,
        })
        .collect();

    let managers: Vec<&str> = users
        .iter()
        .filter(|u| u.role.is_lead())
        .map(|u| u.username.as_str())
        .collect();

    let mut context = Context::new();
    context.insert("projects", &projects);
    context.insert("managers", &managers);

    render(&state, "projects.html", context, Some(&user), &flash)
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    RequireLead(user): RequireLead,
    Form(form): Form<ProjectForm>,
) -> Result<Response, PageError> {
    let name = non_blank(Some(form.name.as_str()))
        .ok_or_else(|| PageError::flash(PROJECTS_PATH, "Project name cannot be empty"))?;
    if name.chars().count() > MAX_PROJECT_NAME_LEN {
        return Err(PageError::flash(
            PROJECTS_PATH,
            format!("Project name cannot exceed {MAX_PROJECT_NAME_LEN} characters"),
        ));
    }

    let manager_id = match non_blank(form.manager.as_deref()) {
        None => user.id,
        Some(username) => {
            let manager = state
                .store
                .get_user_by_username(username)
                .page_err("Failed to look up manager")?
                .ok_or_else(|| {
                    PageError::flash(PROJECTS_PATH, format!("Unknown user '{username}'"))
                })?;
            if !manager.role.is_lead() {
                return Err(PageError::flash(
                    PROJECTS_PATH,
                    format!("{username} is not a manager"),
                ));
            }
            manager.id
        }
    };

    let id = state
        .store
        .create_project(&NewProject {
            name: name.to_string(),
            description: non_blank(form.description.as_deref()).map(str::to_string),
            manager_id: Some(manager_id),
            created_by: Some(user.id),
        })
        .page_err("Failed to create project")?;

    tracing::info!("User {} created project {id}", user.username);

    Ok(redirect_with_flash(PROJECTS_PATH, "Project created"))
}
