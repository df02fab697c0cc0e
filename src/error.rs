//! Error taxonomy for the fetch pipeline.

use crate::http::ClassifiedError;

/// Failures of the token refresh path. Always terminal.
#[derive(Debug)]
pub enum AuthError {
    /// The refresh request never produced a response.
    RefreshFailed(reqwest::Error),
    /// The identity provider answered the refresh request with a non-success status.
    RefreshRejected { status: u16, message: String },
    /// The identity provider answered with a body that is not a token.
    InvalidResponse(String),
    /// The token carries no refresh token to exchange.
    MissingRefreshToken,
    /// No token endpoint was configured, so a refresh cannot be attempted.
    MissingTokenEndpoint,
    /// There is no access token to present, even after a refresh.
    MissingAccessToken,
    /// The API answered 401 again after the token was already refreshed once.
    RejectedAfterRefresh,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::RefreshFailed(err) => write!(f, "Token refresh failed: {}", err),
            AuthError::RefreshRejected { status, message } => {
                write!(f, "Token refresh rejected (HTTP {}): {}", status, message)
            }
            AuthError::InvalidResponse(msg) => {
                write!(f, "Token refresh returned an invalid response: {}", msg)
            }
            AuthError::MissingRefreshToken => {
                write!(f, "No refresh token available. Import a new token.")
            }
            AuthError::MissingTokenEndpoint => {
                write!(f, "No token endpoint configured to refresh the access token")
            }
            AuthError::MissingAccessToken => write!(f, "No access token available"),
            AuthError::RejectedAfterRefresh => {
                write!(f, "Access denied even after refreshing the token")
            }
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::RefreshFailed(err) => Some(err),
            _ => None,
        }
    }
}

/// Everything a fetch can end with besides a body.
#[derive(Debug)]
pub enum FetchError {
    /// The request could not be sent or its body could not be read.
    Transport(reqwest::Error),
    /// The server answered with a definite HTTP-level failure.
    Classified(ClassifiedError),
    /// The credentials could not be made to work.
    Auth(AuthError),
    /// The caller cancelled the request or a pending backoff sleep.
    Cancelled,
}

impl FetchError {
    /// Status code of a classified failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Classified(err) => Some(err.status),
            _ => None,
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Transport(err) => write!(f, "Request failed: {}", err),
            FetchError::Classified(err) => write!(f, "{}", err),
            FetchError::Auth(err) => write!(f, "{}", err),
            FetchError::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Transport(err) => Some(err),
            FetchError::Classified(err) => Some(err),
            FetchError::Auth(err) => Some(err),
            FetchError::Cancelled => None,
        }
    }
}

impl From<ClassifiedError> for FetchError {
    fn from(err: ClassifiedError) -> Self {
        FetchError::Classified(err)
    }
}

impl From<AuthError> for FetchError {
    fn from(err: AuthError) -> Self {
        FetchError::Auth(err)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err)
    }
}
