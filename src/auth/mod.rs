mod helpers;
mod middleware;
mod password;
mod session;

pub use helpers::{build_cookie, clear_cookie, read_cookie};
pub use middleware::{AuthError, CurrentUser, RequireAdmin, RequireLead, session_id_from_parts};
pub use password::{DUMMY_HASH, PasswordHasher};
pub use session::{SESSION_COOKIE, SessionKeys};
