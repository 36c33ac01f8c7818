use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::helpers::{build_cookie, clear_cookie};
use crate::types::Session;

pub const SESSION_COOKIE: &str = "taskdesk_session";

const TOKEN_BYTES: usize = 32;
const SECRET_BYTES: usize = 32;

/// Issues session tokens and maps them to stored session ids.
///
/// The browser holds a random token; the database only sees
/// `hex(sha256(secret || token))`, so a leaked sessions table cannot be
/// replayed as cookies.
pub struct SessionKeys {
    secret: Vec<u8>,
    ttl: Duration,
    secure_cookies: bool,
}

impl SessionKeys {
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
            secure_cookies: false,
        }
    }

    /// Marks session cookies `Secure`, for deployments served over HTTPS.
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Generates a random hex secret for deployments that do not supply one.
    #[must_use]
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; SECRET_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Creates a new session for `user_id`.
    /// Returns (raw_token, session); only the session is persisted.
    #[must_use]
    pub fn issue(&self, user_id: i64) -> (String, Session) {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let now = Utc::now();
        let session = Session {
            id: self.session_id(&token),
            user_id,
            created_at: now,
            expires_at: now + self.ttl,
        };
        (token, session)
    }

    /// `Set-Cookie` value carrying `token` for the session lifetime.
    #[must_use]
    pub fn cookie(&self, token: &str) -> String {
        build_cookie(
            SESSION_COOKIE,
            token,
            self.ttl.num_seconds(),
            self.secure_cookies,
        )
    }

    #[must_use]
    pub fn expired_cookie(&self) -> String {
        clear_cookie(SESSION_COOKIE, self.secure_cookies)
    }

    #[must_use]
    pub fn session_id(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_derives_matching_id() {
        let keys = SessionKeys::new("secret", Duration::hours(1));
        let (token, session) = keys.issue(7);

        assert_eq!(session.user_id, 7);
        assert_eq!(session.id, keys.session_id(&token));
        assert_ne!(session.id, token);
        assert_eq!(session.expires_at - session.created_at, Duration::hours(1));
    }

    #[test]
    fn test_tokens_are_unique() {
        let keys = SessionKeys::new("secret", Duration::hours(1));
        let (a, _) = keys.issue(1);
        let (b, _) = keys.issue(1);

        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn test_session_id_depends_on_secret() {
        let one = SessionKeys::new("one", Duration::hours(1));
        let two = SessionKeys::new("two", Duration::hours(1));

        assert_ne!(one.session_id("token"), two.session_id("token"));
        assert_eq!(one.session_id("token"), one.session_id("token"));
    }

    #[test]
    fn test_secure_cookies_opt_in() {
        let keys = SessionKeys::new("secret", Duration::hours(1));
        assert!(!keys.cookie("tok").contains("Secure"));

        let keys = keys.with_secure_cookies(true);
        assert!(keys.cookie("tok").starts_with("taskdesk_session=tok;"));
        assert!(keys.cookie("tok").ends_with("; Secure"));
        assert!(keys.expired_cookie().contains("Max-Age=0; Secure"));
    }

    #[test]
    fn test_generated_secret_is_hex() {
        let secret = SessionKeys::generate_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
