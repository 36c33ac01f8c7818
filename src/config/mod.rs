mod server;

pub use server::{DEFAULT_PORT, DEFAULT_SESSION_TTL_HOURS, ServerConfig, parse_database_url};
