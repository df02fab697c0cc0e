//! Resilient GET client for OAuth2-protected HTTP APIs.
//!
//! [`Fetcher`] issues bearer-authenticated requests, refreshes the access
//! token at most once per call when the server answers 401, and retries
//! transient server errors with exponential backoff and jitter.

pub mod auth;
pub mod commands;
pub mod error;
pub mod fetch;
pub mod http;
pub mod retry;
pub mod runtime;
pub mod store;

pub use auth::{OAuthRefresher, Token, TokenRefresher};
pub use error::{AuthError, FetchError};
pub use fetch::Fetcher;
pub use http::{ClassifiedError, ErrorClassifier, RequestExecutor};
pub use retry::RetryPolicy;
