pub mod access;
mod account;
pub mod dto;
pub mod flash;
mod messages;
mod notifications;
mod projects;
pub mod response;
mod router;
mod stats;
mod tasks;
mod upload;
mod users;
pub mod validation;
pub mod views;

pub use router::{AppState, create_router};
