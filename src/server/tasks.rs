use std::cmp::Reverse;
use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Redirect, Response},
};
use bytes::Bytes;
use serde::Serialize;
use tera::Context;

use super::AppState;
use super::access::{assignable_users, load_accessible_task, require_creator, resolve_assignee};
use super::dto::{IndexParams, TaskActionForm};
use super::flash::Flash;
use super::response::{PageError, StoreOptionExt, StoreResultExt};
use super::upload::TaskSubmission;
use super::validation::{
    non_blank, parse_due_date, parse_optional_id, parse_priority, parse_status, sanitize_filename,
    validate_title,
};
use super::views::render;
use crate::auth::CurrentUser;
use crate::types::{NewTask, Priority, Task, TaskListing, TaskStatus, User};

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct TaskCounters {
    total: usize,
    active: usize,
    completed: usize,
}

fn count_tasks(tasks: &[TaskListing]) -> TaskCounters {
    let completed = tasks.iter().filter(|t| t.task.done).count();
    TaskCounters {
        total: tasks.len(),
        active: tasks.len() - completed,
        completed,
    }
}

/// Applies the `filter` and `sort` query parameters. Unknown values fall back
/// to `all` and `created`.
fn arrange_tasks(tasks: &mut Vec<TaskListing>, filter: &str, sort: &str) {
    match filter {
        "active" => tasks.retain(|t| !t.task.done),
        "completed" => tasks.retain(|t| t.task.done),
        _ => {}
    }

    match sort {
        "priority" => tasks.sort_by_key(|t| (Reverse(t.task.priority), Reverse(t.task.id))),
        "title" => tasks.sort_by_key(|t| (t.task.title.to_lowercase(), t.task.id)),
        _ => tasks.sort_by_key(|t| Reverse(t.task.id)),
    }
}

const FILTERS: [&str; 3] = ["all", "active", "completed"];
const SORTS: [&str; 3] = ["created", "priority", "title"];

fn normalized<'a>(value: Option<&'a str>, allowed: &[&'static str]) -> &'a str {
    match non_blank(value) {
        Some(v) if allowed.contains(&v) => v,
        _ => allowed[0],
    }
}

fn task_link(id: i64) -> String {
    format!("/task/{id}")
}

/// Notifies the task's creator and assignee, except whoever acted.
fn notify_participants(state: &AppState, task: &Task, actor: &User, message: &str) {
    let mut recipients = vec![task.created_by];
    if let Some(assignee) = task.assigned_to {
        if assignee != task.created_by {
            recipients.push(assignee);
        }
    }

    let link = task_link(task.id);
    for recipient in recipients.into_iter().filter(|id| *id != actor.id) {
        if let Err(e) = state
            .store
            .create_notification(recipient, message, Some(&link))
        {
            tracing::warn!("Failed to notify user {recipient}: {e}");
        }
    }
}

fn notify_assignee(state: &AppState, task_id: i64, title: &str, actor: &User, assignee: &User) {
    if assignee.id == actor.id {
        return;
    }
    let message = format!("{} assigned you the task '{title}'", actor.username);
    if let Err(e) = state
        .store
        .create_notification(assignee.id, &message, Some(&task_link(task_id)))
    {
        tracing::warn!("Failed to notify user {}: {e}", assignee.id);
    }
}

fn record_history(state: &AppState, task_id: i64, actor: &User, action: &str, details: Option<&str>) {
    if let Err(e) = state.store.add_history(task_id, actor.id, action, details) {
        tracing::warn!("Failed to record {action} for task {task_id}: {e}");
    }
}

fn parse_project(state: &AppState, value: Option<&str>, back: &str) -> Result<Option<i64>, PageError> {
    let project_id =
        parse_optional_id(value, "project").map_err(|msg| PageError::flash(back, msg))?;

    if let Some(id) = project_id {
        state
            .store
            .get_project(id)
            .page_err("Failed to load project")?
            .ok_or_else(|| PageError::flash(back, format!("Unknown project {id}")))?;
    }

    Ok(project_id)
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Query(params): Query<IndexParams>,
    flash: Flash,
) -> Result<Response, PageError> {
    let mut tasks = state
        .store
        .list_visible_tasks(user.id, user.role)
        .page_err("Failed to list tasks")?;
    let counters = count_tasks(&tasks);

    let filter = normalized(params.filter.as_deref(), &FILTERS);
    let sort = normalized(params.sort.as_deref(), &SORTS);
    arrange_tasks(&mut tasks, filter, sort);

    let mut context = Context::new();
    context.insert("tasks", &tasks);
    context.insert("counters", &counters);
    context.insert("filter", filter);
    context.insert("sort", sort);
    context.insert("filters", &FILTERS);
    context.insert("sorts", &SORTS);
    context.insert("assignees", &assignable_users(&state, &user)?);
    context.insert(
        "projects",
        &state.store.list_projects().page_err("Failed to list projects")?,
    );
    context.insert("priorities", &Priority::ALL);
    context.insert("statuses", &TaskStatus::ALL);

    render(&state, "index.html", context, Some(&user), &flash)
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    submission: TaskSubmission,
) -> Result<Response, PageError> {
    let TaskSubmission { fields, attachment } = submission;
    let back = "/";
    let invalid = |msg: String| PageError::flash(back, msg);

    let title = validate_title(&fields.title).map_err(invalid)?;
    let priority = parse_priority(fields.priority.as_deref()).map_err(invalid)?;
    let status = parse_status(fields.status.as_deref()).map_err(invalid)?;
    let due_date = parse_due_date(fields.due_date.as_deref()).map_err(invalid)?;
    let project_id = parse_project(&state, fields.project_id.as_deref(), back)?;

    let assignee = resolve_assignee(&state, &user, fields.assignee.as_deref(), back)?;

    let new_task = NewTask {
        title,
        description: non_blank(fields.description.as_deref()).map(str::to_string),
        status,
        priority,
        due_date,
        created_by: user.id,
        assigned_to: assignee.as_ref().map(|u| u.id),
        project_id,
        attachment,
    };

    let id = state
        .store
        .create_task(&new_task)
        .page_err("Failed to create task")?;

    tracing::info!("User {} created task {id}", user.username);

    if let Some(assignee) = &assignee {
        notify_assignee(&state, id, &new_task.title, &user, assignee);
    }

    Ok(Redirect::to(back).into_response())
}

pub async fn toggle_task(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    load_accessible_task(&state, &user, id)?;

    let done = state
        .store
        .toggle_task(id)
        .page_err("Failed to toggle task")?
        .or_not_found("Task not found")?;

    let details = if done { "completed" } else { "reopened" };
    record_history(&state, id, &user, "toggled", Some(details));

    Ok(Redirect::to("/").into_response())
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let task = load_accessible_task(&state, &user, id)?;
    require_creator(&user, &task, "/")?;

    if !state.store.delete_task(id).page_err("Failed to delete task")? {
        return Err(PageError::not_found("Task not found"));
    }

    tracing::info!("User {} deleted task {id}", user.username);

    Ok(Redirect::to("/").into_response())
}

pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    load_accessible_task(&state, &user, id)?;

    let attachment = state
        .store
        .get_task_attachment(id)
        .page_err("Failed to load attachment")?
        .or_not_found("This task has no attachment")?;

    let file_name =
        sanitize_filename(&attachment.file_name).unwrap_or_else(|| "attachment".to_string());
    let disposition = format!("attachment; filename=\"{file_name}\"");

    Ok((
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        Bytes::from(attachment.data),
    )
        .into_response())
}

pub async fn task_detail(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<i64>,
    flash: Flash,
) -> Result<Response, PageError> {
    let task = load_accessible_task(&state, &user, id)?;
    let listing = state
        .store
        .get_task_listing(id)
        .page_err("Failed to load task")?
        .or_not_found("Task not found")?;
    let is_creator = task.created_by == user.id;

    let mut context = Context::new();
    context.insert("task", &listing);
    context.insert(
        "comments",
        &state.store.list_comments(id).page_err("Failed to load comments")?,
    );
    context.insert(
        "history",
        &state.store.list_history(id).page_err("Failed to load history")?,
    );
    context.insert("is_creator", &is_creator);
    context.insert("statuses", &TaskStatus::ALL);
    context.insert("priorities", &Priority::ALL);
    if is_creator {
        context.insert("assignees", &assignable_users(&state, &user)?);
        context.insert(
            "projects",
            &state.store.list_projects().page_err("Failed to list projects")?,
        );
    }

    render(&state, "task.html", context, Some(&user), &flash)
}

pub async fn task_action(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<TaskActionForm>,
) -> Result<Response, PageError> {
    let mut task = load_accessible_task(&state, &user, id)?;
    let back = task_link(id);

    match form.action.as_str() {
        "comment" => {
            let content = non_blank(form.content.as_deref())
                .ok_or_else(|| PageError::flash(&back, "Comment cannot be empty"))?;
            state
                .store
                .add_comment(id, user.id, content)
                .page_err("Failed to add comment")?;
            let message = format!("{} commented on '{}'", user.username, task.title);
            notify_participants(&state, &task, &user, &message);
        }
        "status" => {
            if non_blank(form.status.as_deref()).is_none() {
                return Err(PageError::flash(&back, "Choose a status"));
            }
            let status =
                parse_status(form.status.as_deref()).map_err(|msg| PageError::flash(&back, msg))?;
            if status != task.status {
                state
                    .store
                    .set_task_status(id, status)
                    .page_err("Failed to update status")?;
                let details = format!("{} -> {}", task.status, status);
                record_history(&state, id, &user, "status_changed", Some(&details));
                let message = format!(
                    "{} moved '{}' to {}",
                    user.username, task.title, status
                );
                notify_participants(&state, &task, &user, &message);
            }
        }
        "assign" => {
            require_creator(&user, &task, &back)?;
            let assignee = resolve_assignee(&state, &user, form.assignee.as_deref(), &back)?;
            let assignee_id = assignee.as_ref().map(|u| u.id);
            if assignee_id != task.assigned_to {
                state
                    .store
                    .set_task_assignee(id, assignee_id)
                    .page_err("Failed to assign task")?;
                let details = match &assignee {
                    Some(assignee) => format!("assigned to {}", assignee.username),
                    None => "unassigned".to_string(),
                };
                record_history(&state, id, &user, "assigned", Some(&details));
                if let Some(assignee) = &assignee {
                    notify_assignee(&state, id, &task.title, &user, assignee);
                }
            }
        }
        "edit" => {
            require_creator(&user, &task, &back)?;
            let invalid = |msg: String| PageError::flash(&back, msg);
            task.title = validate_title(form.title.as_deref().unwrap_or_default()).map_err(invalid)?;
            task.description = non_blank(form.description.as_deref()).map(str::to_string);
            task.priority = parse_priority(form.priority.as_deref()).map_err(invalid)?;
            task.due_date = parse_due_date(form.due_date.as_deref()).map_err(invalid)?;
            task.project_id = parse_project(&state, form.project_id.as_deref(), &back)?;
            state
                .store
                .update_task(&task)
                .page_err("Failed to update task")?;
            record_history(&state, id, &user, "updated", None);
        }
        other => {
            return Err(PageError::bad_request(format!("Unknown action '{other}'")));
        }
    }

    Ok(Redirect::to(&back).into_response())
}
