mod commands;
pub mod pickers;
mod user;

pub use commands::AdminCommands;
pub use user::{CreateUserArgs, run_create_user, run_list_users};

use crate::config::parse_database_url;
use crate::store::{SqliteStore, Store};

/// Opens the database named by `database_url`, creating the schema if needed.
pub fn init_store(database_url: &str) -> anyhow::Result<SqliteStore> {
    let db_path = parse_database_url(database_url)?;
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    Ok(store)
}
