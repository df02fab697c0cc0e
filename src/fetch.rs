//! Public entry point: authenticated GET under a retry policy.

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::auth::{Token, TokenRefresher};
use crate::error::FetchError;
use crate::http::{AuthState, RequestExecutor};
use crate::retry::{Operation, RetryPolicy, retry};

/// Fetches URLs with bearer auth, token refresh and backoff.
pub struct Fetcher<R: TokenRefresher> {
    executor: RequestExecutor<R>,
    policy: RetryPolicy,
}

impl<R: TokenRefresher> Fetcher<R> {
    pub fn new(executor: RequestExecutor<R>, policy: RetryPolicy) -> Self {
        Self { executor, policy }
    }

    pub fn with_default_policy(executor: RequestExecutor<R>) -> Self {
        Self::new(executor, RetryPolicy::default())
    }

    /// Fetches `url`, installing a refreshed token into `token` if one was
    /// obtained along the way.
    pub async fn fetch(&self, url: &str, token: &mut Token) -> Result<Bytes, FetchError> {
        self.fetch_with_cancel(url, token, &CancellationToken::new())
            .await
    }

    /// [`fetch`](Self::fetch) that stops at the next suspension point once
    /// `cancel` fires.
    #[tracing::instrument(skip(self, token, cancel))]
    pub async fn fetch_with_cancel(
        &self,
        url: &str,
        token: &mut Token,
        cancel: &CancellationToken,
    ) -> Result<Bytes, FetchError> {
        debug!("Fetching {} with token {}...", url, token.masked());

        let mut operation = AuthorizedGet {
            executor: &self.executor,
            url,
            token,
            state: AuthState::Initial,
            cancel,
        };
        let body = retry(&self.policy, &mut operation, cancel).await?;

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// One logical fetch; the refresh state spans all of its attempts.
struct AuthorizedGet<'a, R: TokenRefresher> {
    executor: &'a RequestExecutor<R>,
    url: &'a str,
    token: &'a mut Token,
    state: AuthState,
    cancel: &'a CancellationToken,
}

#[async_trait]
impl<'a, R: TokenRefresher> Operation for AuthorizedGet<'a, R> {
    type Output = Bytes;

    async fn call(&mut self) -> Result<Bytes, FetchError> {
        self.executor
            .execute_with_state(self.url, &mut *self.token, &mut self.state, self.cancel)
            .await
    }
}
