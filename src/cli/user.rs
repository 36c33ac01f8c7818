use serde::Serialize;

use crate::auth::PasswordHasher;
use crate::error::Error;
use crate::server::validation::{validate_password, validate_username};
use crate::store::Store;
use crate::types::{NewUser, Role};

use super::init_store;
use super::pickers::{format_relative_time, pick_role, prompt_password, prompt_username};

/// Options for `admin create-user`.
pub struct CreateUserArgs {
    pub database_url: String,
    pub username: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
    pub manager: Option<String>,
    pub non_interactive: bool,
}

pub fn run_create_user(args: CreateUserArgs) -> anyhow::Result<()> {
    let store = init_store(&args.database_url)?;

    let username = match args.username {
        Some(name) => {
            let name = name.trim().to_string();
            validate_username(&name).map_err(anyhow::Error::msg)?;
            name
        }
        None if args.non_interactive => {
            anyhow::bail!("--username is required in non-interactive mode")
        }
        None => prompt_username()?,
    };

    let role = match args.role.as_deref() {
        Some(value) => Role::parse(value.trim()).ok_or_else(|| {
            anyhow::anyhow!("Unknown role '{value}', expected admin, manager, or executor")
        })?,
        None if args.non_interactive => Role::default(),
        None => match pick_role()? {
            Some(role) => role,
            None => {
                println!("Cancelled.");
                return Ok(());
            }
        },
    };

    let password = match args.password {
        Some(password) => {
            validate_password(&password).map_err(anyhow::Error::msg)?;
            password
        }
        None if args.non_interactive => {
            anyhow::bail!("--password is required in non-interactive mode")
        }
        None => prompt_password()?,
    };

    let manager_id = match args.manager.as_deref() {
        Some(name) => {
            let manager = store
                .get_user_by_username(name.trim())?
                .ok_or_else(|| anyhow::anyhow!("Manager '{name}' not found"))?;
            if !manager.role.is_lead() {
                anyhow::bail!("'{name}' is not a manager or admin");
            }
            Some(manager.id)
        }
        None => None,
    };

    let password_hash = PasswordHasher::new().hash(&password)?;
    let new_user = NewUser {
        username: username.clone(),
        password_hash,
        role,
        manager_id,
    };

    let id = match store.create_user(&new_user) {
        Ok(id) => id,
        Err(Error::AlreadyExists) => anyhow::bail!("User '{username}' already exists"),
        Err(e) => return Err(e.into()),
    };

    println!("Created {role} \"{username}\" (id {id})");

    Ok(())
}

#[derive(Serialize)]
struct UserOutput {
    id: i64,
    username: String,
    role: Role,
    manager: Option<String>,
    created_at: String,
}

pub fn run_list_users(database_url: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&database_url)?;
    let users = store.list_users()?;

    if json {
        let output: Vec<UserOutput> = users
            .iter()
            .map(|user| UserOutput {
                id: user.id,
                username: user.username.clone(),
                role: user.role,
                manager: user
                    .manager_id
                    .and_then(|id| users.iter().find(|u| u.id == id))
                    .map(|u| u.username.clone()),
                created_at: user.created_at.to_rfc3339(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("{:<6} {:<24} {:<10} {:<24} JOINED", "ID", "USERNAME", "ROLE", "MANAGER");
    for user in &users {
        let manager = user
            .manager_id
            .and_then(|id| users.iter().find(|u| u.id == id))
            .map_or("-", |u| u.username.as_str());
        println!(
            "{:<6} {:<24} {:<10} {:<24} {}",
            user.id,
            user.username,
            user.role.as_str(),
            manager,
            format_relative_time(&user.created_at)
        );
    }

    Ok(())
}
