//! Authenticated HTTP requests and status classification.

mod classify;
mod executor;

pub use classify::{ClassifiedError, DEFAULT_MESSAGE, ErrorClassifier};
pub use executor::{AuthState, RequestExecutor};
