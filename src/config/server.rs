use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// SQLite location, either a bare path or a `sqlite://` / `sqlite:` URL.
    pub database_url: String,
    /// Secret mixed into session ids. Generated at startup when absent.
    pub session_secret: Option<String>,
    pub session_ttl_hours: i64,
    /// Mark the session cookie `Secure`. Enable when served over HTTPS.
    pub secure_cookies: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Resolves `database_url` to a filesystem path.
    pub fn db_path(&self) -> Result<PathBuf> {
        parse_database_url(&self.database_url)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            database_url: "./taskdesk.db".to_string(),
            session_secret: None,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            secure_cookies: false,
        }
    }
}

pub fn parse_database_url(url: &str) -> Result<PathBuf> {
    let url = url.trim();
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);

    if path.is_empty() {
        return Err(Error::Config("DATABASE_URL is empty".to_string()));
    }
    if path.contains("://") {
        return Err(Error::Config(format!(
            "unsupported DATABASE_URL scheme: {url}"
        )));
    }

    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_path() {
        assert_eq!(
            parse_database_url("./data/tasks.db").unwrap(),
            PathBuf::from("./data/tasks.db")
        );
    }

    #[test]
    fn test_parse_sqlite_url() {
        assert_eq!(
            parse_database_url("sqlite:///var/lib/taskdesk.db").unwrap(),
            PathBuf::from("/var/lib/taskdesk.db")
        );
        assert_eq!(
            parse_database_url("sqlite:tasks.db").unwrap(),
            PathBuf::from("tasks.db")
        );
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(parse_database_url("postgres://localhost/tasks").is_err());
        assert!(parse_database_url("  ").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            port: 8081,
            ..ServerConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().port(), 8081);
    }
}
