//! OAuth2 bearer credentials and their refresh.

mod refresh;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub use refresh::{DEFAULT_EXPIRES_IN_SECS, OAuthRefresher, TokenRefresher};

#[cfg(test)]
pub use refresh::MockTokenRefresher;

/// A bearer token pair with the access token's expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
}

impl Token {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expiry: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expiry,
        }
    }

    /// Token whose access part expires `expires_in` seconds from now.
    pub fn expiring_in(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: i64,
    ) -> Self {
        Self::new(
            access_token,
            refresh_token,
            Utc::now() + Duration::seconds(expires_in),
        )
    }

    pub fn is_expired(&self) -> bool {
        self.expiry <= Utc::now()
    }

    /// Whether the access token can be put on the wire as-is.
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Access token with everything but the edges hidden, for logs.
    pub fn masked(&self) -> String {
        mask(&self.access_token)
    }
}

pub(crate) fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry() {
        let token = Token::expiring_in("access", "refresh", 3600);
        assert!(!token.is_expired());
        assert!(token.is_usable());

        let token = Token::expiring_in("access", "refresh", -1);
        assert!(token.is_expired());
        assert!(!token.is_usable());
    }

    #[test]
    fn test_empty_access_token_is_not_usable() {
        let token = Token::expiring_in("", "refresh", 3600);
        assert!(!token.is_usable());
    }

    #[test]
    fn test_masked_token() {
        let token = Token::expiring_in("abcdefghijklmnopqrstuvwxyz", "r", 60);
        assert_eq!(token.masked(), "abcd*********wxyz");

        let token = Token::expiring_in("short", "r", 60);
        assert_eq!(token.masked(), "*****");
    }

    #[test]
    fn test_token_serde() {
        let json = r#"{
            "access_token": "a",
            "refresh_token": "r",
            "expiry": "2030-01-01T00:00:00Z"
        }"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "a");
        assert_eq!(token.refresh_token, "r");
        assert_eq!(token.expiry.to_rfc3339(), "2030-01-01T00:00:00+00:00");

        let back: Token = serde_json::from_str(&serde_json::to_string(&token).unwrap()).unwrap();
        assert_eq!(back, token);
    }
}
