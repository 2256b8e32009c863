//! Error types for event-pump

use serde::Serialize;
use thiserror::Error;

use crate::types::BoxError;

/// Closed set of validation-error kinds
///
/// These are the only failures a caller sees as errors from `publish`
/// and `subscribe`. Delivery-time failures never surface here — they go
/// through the exception reporter instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Event name is empty or contains an empty component
    BadEventName,
    /// Subscription request is malformed
    BadEventSubscriber,
    /// Completion callback is unusable
    BadCompletionCallback,
}

/// Errors returned from pump operations
#[derive(Debug, Error)]
pub enum PumpError {
    /// Publish-time name validation failure
    #[error("Bad event name: {0}")]
    BadEventName(String),

    /// Subscribe-time validation failure
    #[error("Bad event subscriber: {0}")]
    BadEventSubscriber(String),

    /// Completion callback validation failure
    #[error("Bad completion callback: {0}")]
    BadCompletionCallback(String),

    /// The augmenter rejected the publish request
    ///
    /// The augmenter's own error is carried verbatim; it is the one hook
    /// whose failure propagates to the `publish` caller instead of going
    /// through the exception reporter.
    #[error("Event rejected by augmenter: {0}")]
    Rejected(BoxError),
}

impl PumpError {
    /// Construct a validation error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::BadEventName => PumpError::BadEventName(message),
            ErrorKind::BadEventSubscriber => PumpError::BadEventSubscriber(message),
            ErrorKind::BadCompletionCallback => PumpError::BadCompletionCallback(message),
        }
    }

    /// The validation kind, or `None` for augmenter rejections
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            PumpError::BadEventName(_) => Some(ErrorKind::BadEventName),
            PumpError::BadEventSubscriber(_) => Some(ErrorKind::BadEventSubscriber),
            PumpError::BadCompletionCallback(_) => Some(ErrorKind::BadCompletionCallback),
            PumpError::Rejected(_) => None,
        }
    }
}

/// Result type alias for pump operations
pub type Result<T> = std::result::Result<T, PumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_maps_kind_to_variant() {
        let err = PumpError::new(ErrorKind::BadEventName, "empty component");
        assert!(matches!(err, PumpError::BadEventName(_)));
        assert_eq!(err.kind(), Some(ErrorKind::BadEventName));
        assert_eq!(err.to_string(), "Bad event name: empty component");
    }

    #[test]
    fn test_rejected_has_no_kind() {
        let err = PumpError::Rejected("missing source field".into());
        assert_eq!(err.kind(), None);
        assert!(err.to_string().contains("missing source field"));
    }

    #[test]
    fn test_error_kind_serializes_camel_case() {
        let json = serde_json::to_string(&ErrorKind::BadEventName).unwrap();
        assert_eq!(json, "\"badEventName\"");
        let json = serde_json::to_string(&ErrorKind::BadCompletionCallback).unwrap();
        assert_eq!(json, "\"badCompletionCallback\"");
    }
}
