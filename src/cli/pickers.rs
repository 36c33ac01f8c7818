use chrono::{DateTime, Utc};
use inquire::validator::Validation;
use inquire::{InquireError, Password, Select, Text};

use crate::server::validation::{validate_password, validate_username};
use crate::types::Role;

/// Prompt for a username, validated like the registration form.
pub fn prompt_username() -> anyhow::Result<String> {
    let username = Text::new("Username:")
        .with_validator(|input: &str| {
            Ok(validate_username(input.trim())
                .map(|()| Validation::Valid)
                .unwrap_or_else(|e| Validation::Invalid(e.into())))
        })
        .prompt()?;
    Ok(username.trim().to_string())
}

/// Prompt for a password twice.
pub fn prompt_password() -> anyhow::Result<String> {
    let password = Password::new("Password:")
        .with_validator(|input: &str| {
            Ok(validate_password(input)
                .map(|()| Validation::Valid)
                .unwrap_or_else(|e| Validation::Invalid(e.into())))
        })
        .with_custom_confirmation_message("Confirm password:")
        .with_custom_confirmation_error_message("Passwords do not match")
        .prompt()?;
    Ok(password)
}

/// Pick a role; `None` if the prompt was cancelled.
pub fn pick_role() -> anyhow::Result<Option<Role>> {
    let selection = Select::new("Role:", Role::ALL.to_vec())
        .with_starting_cursor(2)
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(role) => Ok(Some(role)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let diff = Utc::now().signed_duration_since(*dt);

    if diff.num_seconds() < 0 {
        return "in the future".to_string();
    }
    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }

    let (amount, unit) = if diff.num_minutes() < 60 {
        (diff.num_minutes(), "minute")
    } else if diff.num_hours() < 24 {
        (diff.num_hours(), "hour")
    } else if diff.num_days() < 30 {
        (diff.num_days(), "day")
    } else if diff.num_days() < 365 {
        (diff.num_days() / 30, "month")
    } else {
        (diff.num_days() / 365, "year")
    };

    if amount == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{amount} {unit}s ago")
    }
}
