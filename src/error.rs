//! # Errors
//!
//! Error taxonomy for remote code repository operations.
//!
//! `RemoteApiError` is what every [`CodeRepositoryApi`](crate::provider::CodeRepositoryApi)
//! implementation returns. `ReconcilerError` is what the reconciler and sweeper
//! surface to callers. Harness assertion failures live in
//! [`VerificationFailure`](crate::harness::VerificationFailure) and are not
//! reconciler errors.

use thiserror::Error;

/// Error returned by a remote code repository API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteApiError {
    /// The named record does not exist
    #[error("SageMaker Code Repository {name:?} not found")]
    NotFound { name: String },

    /// A record with the same name already exists
    #[error("SageMaker Code Repository {name:?} already exists")]
    AlreadyExists { name: String },

    /// The request was rejected locally before reaching the service
    #[error("invalid code repository input: {message}")]
    InvalidInput { message: String },

    /// Transport or service failure not covered by the other variants
    #[error("{operation} failed{}: {message}", code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Remote {
        operation: String,
        code: Option<String>,
        message: String,
    },
}

impl RemoteApiError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn remote(
        operation: impl Into<String>,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Remote {
            operation: operation.into(),
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Service error code, if the service reported one
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Remote { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Error surfaced by the reconciler and sweeper
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Api(#[from] RemoteApiError),

    #[error("Error retrieving SageMaker Code Repositories in {region}: {source}")]
    Listing {
        region: String,
        #[source]
        source: RemoteApiError,
    },

    #[error("error getting client: {0:#}")]
    Client(#[from] anyhow::Error),
}

impl ReconcilerError {
    /// The underlying remote error, if any
    #[must_use]
    pub fn remote(&self) -> Option<&RemoteApiError> {
        match self {
            Self::Api(e) | Self::Listing { source: e, .. } => Some(e),
            Self::Client(_) => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.remote().is_some_and(RemoteApiError::is_not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display_with_code() {
        let err = RemoteApiError::remote(
            "DescribeCodeRepository",
            Some("ThrottlingException".to_string()),
            "Rate exceeded",
        );
        assert_eq!(
            err.to_string(),
            "DescribeCodeRepository failed (ThrottlingException): Rate exceeded"
        );
    }

    #[test]
    fn test_remote_error_display_without_code() {
        let err = RemoteApiError::remote("DeleteCodeRepository", None, "dispatch failure");
        assert_eq!(
            err.to_string(),
            "DeleteCodeRepository failed: dispatch failure"
        );
    }

    #[test]
    fn test_reconciler_error_not_found_passthrough() {
        let err: ReconcilerError = RemoteApiError::not_found("repo").into();
        assert!(err.is_not_found());
        assert!(!ReconcilerError::Client(anyhow::anyhow!("boom")).is_not_found());
    }
}
