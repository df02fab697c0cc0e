//! Single authenticated GET with one-shot token refresh.

use bytes::Bytes;
use log::{debug, info};
use reqwest::{Client, Response, StatusCode};
use tokio_util::sync::CancellationToken;

use super::classify::ErrorClassifier;
use crate::auth::{Token, TokenRefresher};
use crate::error::{AuthError, FetchError};

/// Where a logical call stands with respect to token refresh.
///
/// `Initial` may refresh once; `Refreshed` treats any further 401 as final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Initial,
    Refreshed,
}

/// Performs authenticated GET requests.
pub struct RequestExecutor<R: TokenRefresher> {
    client: Client,
    classifier: ErrorClassifier,
    refresher: R,
}

impl<R: TokenRefresher> RequestExecutor<R> {
    pub fn new(client: Client, classifier: ErrorClassifier, refresher: R) -> Self {
        Self {
            client,
            classifier,
            refresher,
        }
    }

    /// Fetches `url` once, refreshing `token` in place at most once.
    pub async fn execute(
        &self,
        url: &str,
        token: &mut Token,
        cancel: &CancellationToken,
    ) -> Result<Bytes, FetchError> {
        let mut state = AuthState::Initial;
        self.execute_with_state(url, token, &mut state, cancel)
            .await
    }

    /// Like [`execute`](Self::execute), with the refresh state owned by the
    /// caller so it can span several attempts of the same logical call.
    #[tracing::instrument(skip(self, token, state, cancel))]
    pub async fn execute_with_state(
        &self,
        url: &str,
        token: &mut Token,
        state: &mut AuthState,
        cancel: &CancellationToken,
    ) -> Result<Bytes, FetchError> {
        if !token.is_usable() && *state == AuthState::Initial {
            debug!("Access token is missing or expired, refreshing before request...");
            self.refresh(token, state, cancel).await?;
        }

        loop {
            if token.access_token.is_empty() {
                return Err(AuthError::MissingAccessToken.into());
            }

            let response = self.send(url, token, cancel).await?;
            let status = response.status();
            debug!("GET {} -> {}", url, status);

            if status == StatusCode::UNAUTHORIZED {
                match *state {
                    AuthState::Initial => {
                        info!("Access token rejected, refreshing...");
                        self.refresh(token, state, cancel).await?;
                        continue;
                    }
                    AuthState::Refreshed => {
                        return Err(AuthError::RejectedAfterRefresh.into());
                    }
                }
            }

            if let Some(err) = self.classifier.classify(status) {
                return Err(err.into());
            }

            return tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
                body = response.bytes() => body.map_err(FetchError::Transport),
            };
        }
    }

    async fn send(
        &self,
        url: &str,
        token: &Token,
        cancel: &CancellationToken,
    ) -> Result<Response, FetchError> {
        let request = self.client.get(url).bearer_auth(&token.access_token);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            response = request.send() => response.map_err(FetchError::Transport),
        }
    }

    async fn refresh(
        &self,
        token: &mut Token,
        state: &mut AuthState,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        let fresh = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            fresh = self.refresher.refresh(&token.refresh_token) => fresh?,
        };

        debug!("Installing refreshed access token {}", fresh.masked());
        *token = fresh;
        *state = AuthState::Refreshed;
        Ok(())
    }
}
