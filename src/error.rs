//! Error types for the Capella provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while reconciling Capella resources.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Client-side or API-side validation failed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The access/secret key pair was rejected.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The credentials are valid but lack access to the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A provider configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a status the provider does not classify.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Resource already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The poll deadline elapsed before the resource reached its target state.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The remote status is neither pending nor the target.
    #[error("Unexpected state: {0}")]
    UnexpectedState(String),

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Operation not supported for this resource kind.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from the engine.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result alias used across the crate.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Coarse classification of a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input rejected before or by the API.
    Validation,
    /// The resource or a referenced parent does not exist.
    NotFound,
    /// Authentication or authorization failure.
    Authorization,
    /// The resource is not in a state that allows the operation.
    Precondition,
    /// Local waiting gave up.
    Timeout,
    /// The resource already exists.
    Conflict,
    /// The operation is not supported.
    Unsupported,
    /// Transient or unclassified remote failure.
    Remote,
}

impl ErrorKind {
    /// Short human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation error",
            Self::NotFound => "not found",
            Self::Authorization => "authorization error",
            Self::Precondition => "precondition failed",
            Self::Timeout => "timeout",
            Self::Conflict => "already exists",
            Self::Unsupported => "unsupported operation",
            Self::Remote => "remote error",
        }
    }
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Unauthenticated(msg) => msg,
            Self::PermissionDenied(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Http(_err) => "http error (see Debug output)",
            Self::Api { body, .. } => body,
            Self::AlreadyExists(msg) => msg,
            Self::ResourceExhausted(msg) => msg,
            Self::Unavailable(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::UnexpectedState(msg) => msg,
            Self::FailedPrecondition(msg) => msg,
            Self::Unimplemented(msg) => msg,
            Self::InvalidRequest(msg) => msg,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidRequest(_) | Self::Configuration(_) => {
                ErrorKind::Validation
            },
            Self::NotFound(_) | Self::UnknownResource(_) => ErrorKind::NotFound,
            Self::Unauthenticated(_) | Self::PermissionDenied(_) => ErrorKind::Authorization,
            Self::FailedPrecondition(_) | Self::UnexpectedState(_) => ErrorKind::Precondition,
            Self::DeadlineExceeded(_) => ErrorKind::Timeout,
            Self::AlreadyExists(_) => ErrorKind::Conflict,
            Self::Unimplemented(_) => ErrorKind::Unsupported,
            Self::Serialization(_)
            | Self::Http(_)
            | Self::Api { .. }
            | Self::ResourceExhausted(_)
            | Self::Unavailable(_) => ErrorKind::Remote,
        }
    }

    /// Returns true if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        Diagnostic::error(err.kind().as_str()).with_detail(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("cluster 123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: cluster 123");

        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::Api {
            status: 418,
            body: "teapot".to_string(),
        };
        assert_eq!(format!("{}", err), "API error (418): teapot");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            ProviderError::Unauthenticated("x".into()).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            ProviderError::PermissionDenied("x".into()).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            ProviderError::DeadlineExceeded("x".into()).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            ProviderError::FailedPrecondition("x".into()).kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            ProviderError::AlreadyExists("x".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ProviderError::Unavailable("x".into()).kind(),
            ErrorKind::Remote
        );
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::NotFound("resource-123".to_string());
        assert_eq!(err.message(), "resource-123");

        let err = ProviderError::Api {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_error_into_diagnostic() {
        let diag: Diagnostic = ProviderError::DeadlineExceeded("cluster abc".to_string()).into();
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.summary, "timeout");
        assert_eq!(
            diag.detail,
            Some("Deadline exceeded: cluster abc".to_string())
        );
    }
}
