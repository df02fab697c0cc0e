use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use super::{Token, mask};
use crate::error::AuthError;

/// Access token lifetime assumed when the provider does not send `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Exchanges a refresh token for a new token pair.
///
/// Implementations make a single attempt; a failure is final.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError>;
}

/// Refresher speaking the OAuth2 `refresh_token` grant.
///
/// Without a token endpoint every refresh fails with
/// [`AuthError::MissingTokenEndpoint`], so a still-valid token keeps working.
pub struct OAuthRefresher {
    client: Client,
    token_url: Option<String>,
    client_id: String,
    client_secret: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl OAuthRefresher {
    pub fn new(
        client: Client,
        token_url: Option<String>,
        client_id: impl Into<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            client,
            token_url,
            client_id: client_id.into(),
            client_secret,
        }
    }

    pub fn token_url(&self) -> Option<&str> {
        self.token_url.as_deref()
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    #[tracing::instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError> {
        let token_url = self
            .token_url
            .as_deref()
            .ok_or(AuthError::MissingTokenEndpoint)?;
        if refresh_token.is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }

        debug!(
            "Refreshing token {} at {}...",
            mask(refresh_token),
            token_url
        );

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .client
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(AuthError::RefreshFailed)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        if body.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "empty access_token".to_string(),
            ));
        }

        // Providers that do not rotate refresh tokens omit the field.
        let next_refresh = body
            .refresh_token
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| refresh_token.to_string());

        let token = Token::expiring_in(
            body.access_token,
            next_refresh,
            body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
        );
        debug!("Refreshed access token: {}", token.masked());
        Ok(token)
    }
}
