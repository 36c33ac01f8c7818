use axum::{
    extract::{Form, FromRequest, Multipart, Request, multipart::MultipartError},
    http::{StatusCode, header::CONTENT_TYPE},
};

use super::dto::TaskFields;
use super::response::PageError;
use super::validation::{MAX_UPLOAD_BYTES, sanitize_filename};
use crate::types::Attachment;

const FILE_FIELD: &str = "file";
const FALLBACK_FILE_NAME: &str = "attachment";

/// Task creation body. Accepts a plain urlencoded form or a multipart form
/// carrying an optional `file` part.
#[derive(Debug, Default)]
pub struct TaskSubmission {
    pub fields: TaskFields,
    pub attachment: Option<Attachment>,
}

fn upload_error(e: &MultipartError) -> PageError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return PageError::flash("/", too_large_message());
    }
    tracing::warn!("Rejected multipart body: {}", e.body_text());
    PageError::flash("/", "Could not read the submitted form")
}

fn too_large_message() -> String {
    format!(
        "Attachments are limited to {} MiB",
        MAX_UPLOAD_BYTES / (1024 * 1024)
    )
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

async fn read_multipart(mut multipart: Multipart) -> Result<TaskSubmission, PageError> {
    let mut submission = TaskSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| upload_error(&e))? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            let file_name = field.file_name().map(str::to_string);
            let data = field.bytes().await.map_err(|e| upload_error(&e))?;
            // Browsers send an empty part when no file was chosen.
            if data.is_empty() {
                continue;
            }
            if data.len() > MAX_UPLOAD_BYTES {
                return Err(PageError::flash("/", too_large_message()));
            }
            let file_name = file_name
                .as_deref()
                .and_then(sanitize_filename)
                .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
            submission.attachment = Some(Attachment {
                file_name,
                data: data.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(|e| upload_error(&e))?;
        let fields = &mut submission.fields;
        match name.as_str() {
            "title" => fields.title = value,
            "description" => fields.description = Some(value),
            "priority" => fields.priority = Some(value),
            "status" => fields.status = Some(value),
            "due_date" => fields.due_date = Some(value),
            "assignee" => fields.assignee = Some(value),
            "project_id" => fields.project_id = Some(value),
            _ => {}
        }
    }

    Ok(submission)
}

impl<S: Send + Sync> FromRequest<S> for TaskSubmission {
    type Rejection = PageError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state).await.map_err(|e| {
                tracing::warn!("Rejected multipart request: {}", e.body_text());
                PageError::bad_request("Malformed multipart request")
            })?;
            return read_multipart(multipart).await;
        }

        let Form(fields) = Form::<TaskFields>::from_request(req, state)
            .await
            .map_err(|e| {
                tracing::warn!("Rejected task form: {}", e.body_text());
                PageError::flash("/", "Could not read the submitted form")
            })?;

        Ok(TaskSubmission {
            fields,
            attachment: None,
        })
    }
}
