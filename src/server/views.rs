use axum::{
    http::{HeaderValue, header::SET_COOKIE},
    response::{Html, IntoResponse, Response},
};
use rust_embed::RustEmbed;
use serde::Serialize;
use tera::{Context, Tera};

use super::AppState;
use super::flash::{FLASH_COOKIE, Flash};
use super::response::{PageError, StoreResultExt};
use crate::auth::clear_cookie;
use crate::error::{Error, Result};
use crate::types::{Role, User};

#[derive(RustEmbed)]
#[folder = "templates/"]
struct TemplateAssets;

/// Loads every embedded template into a single Tera instance.
pub fn load_templates() -> Result<Tera> {
    let mut templates = Vec::new();
    for name in TemplateAssets::iter() {
        let file = TemplateAssets::get(&name)
            .ok_or_else(|| Error::Config(format!("missing embedded template {name}")))?;
        let source = String::from_utf8(file.data.into_owned())
            .map_err(|e| Error::Config(format!("template {name} is not UTF-8: {e}")))?;
        templates.push((name.to_string(), source));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates)?;
    Ok(tera)
}

#[derive(Serialize)]
struct Viewer<'a> {
    id: i64,
    username: &'a str,
    role: Role,
    is_lead: bool,
    is_admin: bool,
}

/// Renders a page with the shared layout variables: the logged-in viewer,
/// their unread notification count, and a pending flash message.
pub fn render(
    state: &AppState,
    template: &str,
    mut context: Context,
    viewer: Option<&User>,
    flash: &Flash,
) -> std::result::Result<Response, PageError> {
    let unread = match viewer {
        Some(user) => state
            .store
            .count_unread_notifications(user.id)
            .page_err("Failed to count notifications")?,
        None => 0,
    };

    context.insert(
        "viewer",
        &viewer.map(|user| Viewer {
            id: user.id,
            username: &user.username,
            role: user.role,
            is_lead: user.role.is_lead(),
            is_admin: user.role == Role::Admin,
        }),
    );
    context.insert("unread", &unread);
    context.insert("flash", &flash.message());

    let html = state.templates.render(template, &context).map_err(|e| {
        tracing::error!("Failed to render {template}: {e:?}");
        PageError::internal("Failed to render page")
    })?;

    let mut response = Html(html).into_response();
    if flash.message().is_some() {
        if let Ok(value) = HeaderValue::from_str(&clear_cookie(FLASH_COOKIE, false)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    Ok(response)
}
