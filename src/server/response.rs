use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use super::flash::redirect_with_flash;
use crate::error::Result as StoreResult;

/// Page-level error. Either an HTML status page or a redirect carrying a
/// flash message back to a form.
#[derive(Debug)]
pub enum PageError {
    Status { status: StatusCode, message: String },
    Flash { to: String, message: String },
}

impl PageError {
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Status {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Status {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Redirects to `to` and shows `message` on the next rendered page.
    #[must_use]
    pub fn flash(to: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Flash {
            to: to.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Status { status, message } => {
                let title = status.canonical_reason().unwrap_or("Error");
                let body = format!(
                    "<!doctype html>\n<html><head><title>{title}</title></head>\
                     <body><h1>{title}</h1><p>{}</p><p><a href=\"/\">Back to tasks</a></p></body></html>",
                    tera::escape_html(&message)
                );
                (status, Html(body)).into_response()
            }
            PageError::Flash { to, message } => redirect_with_flash(&to, &message),
        }
    }
}

/// Extension trait for converting store results to page errors with a custom message.
pub trait StoreResultExt<T> {
    fn page_err(self, message: &'static str) -> Result<T, PageError>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn page_err(self, message: &'static str) -> Result<T, PageError> {
        self.map_err(|e| {
            tracing::error!("{message}: {e}");
            PageError::internal(message)
        })
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, PageError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, PageError> {
        self.ok_or_else(|| PageError::not_found(message))
    }
}
