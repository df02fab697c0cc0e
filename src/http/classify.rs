//! Mapping of HTTP status codes to typed errors.

use reqwest::StatusCode;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Message used for statuses that have no registered error.
pub const DEFAULT_MESSAGE: &str = "failed request";

/// A definite HTTP-level failure.
///
/// Two classified errors are equal when their status codes are equal; the
/// message is descriptive only.
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    pub status: u16,
    pub message: String,
}

impl ClassifiedError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl PartialEq for ClassifiedError {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
    }
}

impl Eq for ClassifiedError {}

impl Hash for ClassifiedError {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.status.hash(state);
    }
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl std::error::Error for ClassifiedError {}

/// Turns response statuses into [`ClassifiedError`]s using a fixed registry.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    registry: HashMap<u16, ClassifiedError>,
}

impl ErrorClassifier {
    /// Builds a classifier from `(status, message)` pairs.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (u16, &'a str)>) -> Self {
        let registry = entries
            .into_iter()
            .map(|(status, message)| (status, ClassifiedError::new(status, message)))
            .collect();
        Self { registry }
    }

    /// Returns the error for `status`, or `None` for 200 and 401.
    ///
    /// 401 is left to the request executor, which answers it with a token
    /// refresh. Unregistered statuses get a synthesized error carrying
    /// [`DEFAULT_MESSAGE`].
    pub fn classify(&self, status: StatusCode) -> Option<ClassifiedError> {
        match status {
            StatusCode::OK | StatusCode::UNAUTHORIZED => None,
            s => Some(
                self.registry
                    .get(&s.as_u16())
                    .cloned()
                    .unwrap_or_else(|| ClassifiedError::new(s.as_u16(), DEFAULT_MESSAGE)),
            ),
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::from_entries([
            (404, "not found"),
            (500, "internal error"),
            (503, "service unavailable"),
            (504, "gateway timeout"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_registered_status() {
        let classifier = ErrorClassifier::default();

        let err = classifier.classify(StatusCode::SERVICE_UNAVAILABLE).unwrap();
        assert_eq!(err.status, 503);
        assert_eq!(err.message, "service unavailable");

        let err = classifier.classify(StatusCode::NOT_FOUND).unwrap();
        assert_eq!(err.message, "not found");
    }

    #[test]
    fn test_classify_success_and_unauthorized_are_not_errors() {
        let classifier = ErrorClassifier::default();
        assert!(classifier.classify(StatusCode::OK).is_none());
        assert!(classifier.classify(StatusCode::UNAUTHORIZED).is_none());
    }

    #[test]
    fn test_classify_unregistered_status_is_synthesized() {
        let classifier = ErrorClassifier::default();

        let err = classifier.classify(StatusCode::IM_A_TEAPOT).unwrap();
        assert_eq!(err.status, 418);
        assert_eq!(err.message, DEFAULT_MESSAGE);

        // Other 2xx codes are not success for this client
        let err = classifier.classify(StatusCode::NO_CONTENT).unwrap();
        assert_eq!(err.status, 204);
    }

    #[test]
    fn test_classifiers_with_different_registries_coexist() {
        let custom = ErrorClassifier::from_entries([(429, "slow down")]);
        let default = ErrorClassifier::default();

        let status = StatusCode::TOO_MANY_REQUESTS;
        assert_eq!(custom.classify(status).unwrap().message, "slow down");
        assert_eq!(default.classify(status).unwrap().message, DEFAULT_MESSAGE);
        // Only the custom registry's entries apply to it
        assert_eq!(
            custom.classify(StatusCode::SERVICE_UNAVAILABLE).unwrap().message,
            DEFAULT_MESSAGE
        );
    }

    #[test]
    fn test_classified_error_equality_is_by_status() {
        let a = ClassifiedError::new(503, "service unavailable");
        let b = ClassifiedError::new(503, "something else");
        let c = ClassifiedError::new(504, "service unavailable");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_classified_error_display() {
        let err = ClassifiedError::new(500, "internal error");
        assert_eq!(err.to_string(), "HTTP 500: internal error");
    }
}
