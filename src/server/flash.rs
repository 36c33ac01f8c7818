use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::SET_COOKIE, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::{build_cookie, read_cookie};

pub const FLASH_COOKIE: &str = "taskdesk_flash";
const FLASH_MAX_AGE_SECS: i64 = 60;

/// One-shot message carried across a redirect in a short-lived cookie.
/// Rendering a page consumes it.
#[derive(Debug, Default)]
pub struct Flash(Option<String>);

impl Flash {
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Flash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let message = read_cookie(&parts.headers, FLASH_COOKIE)
            .filter(|value| !value.is_empty())
            .and_then(|value| urlencoding::decode(value).ok())
            .map(|value| value.into_owned());
        Ok(Flash(message))
    }
}

pub fn redirect_with_flash(to: &str, message: &str) -> Response {
    let cookie = build_cookie(
        FLASH_COOKIE,
        &urlencoding::encode(message),
        FLASH_MAX_AGE_SECS,
        false,
    );
    ([(SET_COOKIE, cookie)], Redirect::to(to)).into_response()
}
