use std::sync::Arc;

use axum::{extract::State, response::Response};
use tera::Context;

use super::AppState;
use super::dto::summarize_counts;
use super::flash::Flash;
use super::response::{PageError, StoreResultExt};
use super::views::render;
use crate::auth::RequireLead;
use crate::types::Role;

/// Task counts by assignee and status. Managers see the users reporting to
/// them; admins see everyone.
pub async fn team_stats(
    State(state): State<Arc<AppState>>,
    RequireLead(user): RequireLead,
    flash: Flash,
) -> Result<Response, PageError> {
    let scope = match user.role {
        Role::Admin => None,
        _ => Some(user.id),
    };

    let members = match scope {
        None => state.store.list_users(),
        Some(manager_id) => state.store.list_team(manager_id),
    }
    .page_err("Failed to list team")?;
    let roster: Vec<String> = members.into_iter().map(|u| u.username).collect();

    let counts = state
        .store
        .team_status_counts(scope)
        .page_err("Failed to load statistics")?;
    let (rows, totals) = summarize_counts(&roster, &counts);

    let mut context = Context::new();
    context.insert("rows", &rows);
    context.insert("totals", &totals);
    context.insert("scope", if scope.is_some() { "team" } else { "all" });

    render(&state, "stats.html", context, Some(&user), &flash)
}
