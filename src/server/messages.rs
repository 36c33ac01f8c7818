use std::sync::Arc;

use axum::{
    extract::{Form, State},
    response::Response,
};
use tera::Context;

use super::AppState;
use super::access::load_accessible_task;
use super::dto::{MessageForm, UserOption};
use super::flash::{Flash, redirect_with_flash};
use super::response::{PageError, StoreResultExt};
use super::validation::{non_blank, parse_optional_id};
use super::views::render;
use crate::auth::CurrentUser;
use crate::types::{Message, NewMessage};

const MESSAGES_PATH: &str = "/messages";

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    flash: Flash,
) -> Result<Response, PageError> {
    let (inbox, outbox): (Vec<Message>, Vec<Message>) = state
        .store
        .list_messages(user.id)
        .page_err("Failed to load messages")?
        .into_iter()
        .partition(|message| message.receiver_id == user.id);

    let recipients: Vec<UserOption> = state
        .store
        .list_users()
        .page_err("Failed to list users")?
        .iter()
        .filter(|u| u.id != user.id)
        .map(UserOption::from)
        .collect();

    let tasks = state
        .store
        .list_visible_tasks(user.id, user.role)
        .page_err("Failed to list tasks")?;

    let mut context = Context::new();
    context.insert("inbox", &inbox);
    context.insert("outbox", &outbox);
    context.insert("recipients", &recipients);
    context.insert("tasks", &tasks);

    render(&state, "messages.html", context, Some(&user), &flash)
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    CurrentUser { user, .. }: CurrentUser,
    Form(form): Form<MessageForm>,
) -> Result<Response, PageError> {
    let content = non_blank(Some(form.content.as_str()))
        .ok_or_else(|| PageError::flash(MESSAGES_PATH, "Message cannot be empty"))?;

    let receiver_name = form.receiver.trim();
    let receiver = state
        .store
        .get_user_by_username(receiver_name)
        .page_err("Failed to look up recipient")?
        .ok_or_else(|| {
            PageError::flash(MESSAGES_PATH, format!("Unknown user '{receiver_name}'"))
        })?;

    let task_id = parse_optional_id(form.task_id.as_deref(), "task")
        .map_err(|msg| PageError::flash(MESSAGES_PATH, msg))?;
    if let Some(task_id) = task_id {
        // Only tasks the sender can see may be referenced.
        load_accessible_task(&state, &user, task_id)
            .map_err(|_| PageError::flash(MESSAGES_PATH, format!("Unknown task {task_id}")))?;
    }

    state
        .store
        .create_message(&NewMessage {
            sender_id: user.id,
            receiver_id: receiver.id,
            content: content.to_string(),
            task_id,
        })
        .page_err("Failed to send message")?;

    if receiver.id != user.id {
        let note = format!("New message from {}", user.username);
        if let Err(e) = state
            .store
            .create_notification(receiver.id, &note, Some(MESSAGES_PATH))
        {
            tracing::warn!("Failed to notify user {}: {e}", receiver.id);
        }
    }

    Ok(redirect_with_flash(MESSAGES_PATH, "Message sent"))
}
