//! # Taskdesk
//!
//! A team task board with server-rendered pages, usable both as a standalone
//! binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! taskdesk = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chrono::Duration;
//! use taskdesk::auth::SessionKeys;
//! use taskdesk::server::{AppState, create_router};
//! use taskdesk::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./taskdesk.db").unwrap();
//! store.initialize().unwrap();
//!
//! let sessions = SessionKeys::new(SessionKeys::generate_secret(), Duration::days(7));
//! let state = Arc::new(AppState::new(Arc::new(store), sessions).unwrap());
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the admin CLI module. Disable with `default-features = false`.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
