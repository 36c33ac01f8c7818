use chrono::NaiveDate;

use crate::types::{Priority, TaskStatus};

const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_TITLE_LEN: usize = 200;
const MAX_FILE_NAME_LEN: usize = 128;

pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

fn is_valid_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

pub fn validate_username(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if name.len() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        ));
    }
    if !name.chars().all(is_valid_username_char) {
        return Err(
            "Username can only contain letters, digits, hyphens, underscores, and periods"
                .to_string(),
        );
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

/// Trims a task title and rejects empty or overlong ones.
pub fn validate_title(title: &str) -> Result<String, String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("Task title cannot be empty".to_string());
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(format!("Task title cannot exceed {MAX_TITLE_LEN} characters"));
    }
    Ok(title.to_string())
}

/// Treats missing and whitespace-only form values the same.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_priority(value: Option<&str>) -> Result<Priority, String> {
    match non_blank(value) {
        None => Ok(Priority::default()),
        Some(v) => Priority::parse(v).ok_or_else(|| format!("Unknown priority '{v}'")),
    }
}

pub fn parse_status(value: Option<&str>) -> Result<TaskStatus, String> {
    match non_blank(value) {
        None => Ok(TaskStatus::default()),
        Some(v) => TaskStatus::parse(v).ok_or_else(|| format!("Unknown status '{v}'")),
    }
}

pub fn parse_due_date(value: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match non_blank(value) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("Invalid due date '{v}', expected YYYY-MM-DD")),
    }
}

pub fn parse_optional_id(value: Option<&str>, what: &str) -> Result<Option<i64>, String> {
    match non_blank(value) {
        None => Ok(None),
        Some(v) => v
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("Invalid {what} id '{v}'")),
    }
}

/// Reduces an uploaded file name to a safe base name for storage and for the
/// `Content-Disposition` header. Returns `None` if nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            ' ' => '_',
            c => c,
        })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return None;
    }

    Some(cleaned.chars().take(MAX_FILE_NAME_LEN).collect())
}
