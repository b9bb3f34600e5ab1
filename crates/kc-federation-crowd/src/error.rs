//! Crowd-specific error types.
//!
//! ## Security Note
//!
//! Error messages must not leak sensitive information like application
//! passwords or user secrets. Messages reported by the Crowd server are
//! kept verbatim; they never echo credentials.

use kc_federation::FederationError;
use thiserror::Error;

/// Crowd-specific errors.
#[derive(Debug, Error)]
pub enum CrowdError {
    /// Invalid configuration.
    #[error("Crowd configuration error: {0}")]
    Configuration(String),

    /// Server URL must use HTTPS.
    #[error("Security error: Only HTTPS is supported. URL must start with 'https://' unless insecure HTTP is explicitly allowed.")]
    InsecureProtocol,

    /// The HTTP request could not be completed.
    #[error("Crowd transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Crowd rejected the application name or password.
    #[error("Crowd rejected the application credentials")]
    ApplicationAuthentication,

    /// The application may not perform the operation.
    #[error("Application permission denied: {0}")]
    ApplicationPermission(String),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Group not found.
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// The user's account is disabled.
    #[error("Account is inactive: {0}")]
    InactiveAccount(String),

    /// The user's password has expired.
    #[error("Credential has expired: {0}")]
    ExpiredCredential(String),

    /// The user's password was wrong.
    #[error("Invalid user authentication: {0}")]
    InvalidUserAuthentication(String),

    /// Any other failure reported by the server.
    #[error("Crowd operation failed ({reason}): {message}")]
    OperationFailed {
        /// Reason code from the error entity.
        reason: String,
        /// Human-readable message from the error entity.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode Crowd response: {0}")]
    Decode(String),
}

impl CrowdError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a user not found error.
    #[must_use]
    pub fn user_not_found(username: impl Into<String>) -> Self {
        Self::UserNotFound(username.into())
    }

    /// Creates a group not found error.
    #[must_use]
    pub fn group_not_found(group_name: impl Into<String>) -> Self {
        Self::GroupNotFound(group_name.into())
    }

    /// Creates an operation failed error.
    #[must_use]
    pub fn operation_failed(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Classifies an error entity returned by the Crowd REST API.
    #[must_use]
    pub fn from_reason(reason: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match reason {
            "USER_NOT_FOUND" => Self::UserNotFound(message),
            "GROUP_NOT_FOUND" => Self::GroupNotFound(message),
            "INACTIVE_ACCOUNT" => Self::InactiveAccount(message),
            "EXPIRED_CREDENTIAL" => Self::ExpiredCredential(message),
            "INVALID_USER_AUTHENTICATION" => Self::InvalidUserAuthentication(message),
            "APPLICATION_PERMISSION_DENIED" | "APPLICATION_ACCESS_DENIED" => {
                Self::ApplicationPermission(message)
            }
            other => Self::operation_failed(other, message),
        }
    }

    /// Checks if the user does not exist.
    #[must_use]
    pub const fn is_user_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_))
    }

    /// Checks if the group does not exist.
    #[must_use]
    pub const fn is_group_not_found(&self) -> bool {
        matches!(self, Self::GroupNotFound(_))
    }

    /// Checks if Crowd refused the user's credential for a user-level reason.
    #[must_use]
    pub const fn is_credential_rejected(&self) -> bool {
        matches!(
            self,
            Self::InactiveAccount(_) | Self::ExpiredCredential(_) | Self::InvalidUserAuthentication(_)
        )
    }

    /// Checks if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::InsecureProtocol)
    }

    /// Converts into a federation error for the given operation.
    ///
    /// Configuration problems stay configuration errors; everything else is
    /// a directory access failure that keeps this error as its source.
    #[must_use]
    pub fn into_federation(self, operation: &str) -> FederationError {
        match self {
            Self::Configuration(msg) => FederationError::Configuration(msg),
            Self::InsecureProtocol => FederationError::Configuration(self.to_string()),
            other => FederationError::directory_access(operation, other),
        }
    }
}

/// Logs a directory failure and converts it for the host.
pub(crate) fn directory_failure(operation: &str, err: CrowdError) -> FederationError {
    tracing::error!(operation, error = %err, "Crowd directory access failed");
    err.into_federation(operation)
}

/// Result type for Crowd operations.
pub type CrowdResult<T> = Result<T, CrowdError>;

impl From<CrowdError> for FederationError {
    fn from(err: CrowdError) -> Self {
        err.into_federation("Crowd request")
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn classifies_reasons() {
        assert!(CrowdError::from_reason("USER_NOT_FOUND", "User <jdoe> does not exist").is_user_not_found());
        assert!(CrowdError::from_reason("GROUP_NOT_FOUND", "missing").is_group_not_found());
        assert!(CrowdError::from_reason("INACTIVE_ACCOUNT", "disabled").is_credential_rejected());
        assert!(CrowdError::from_reason("EXPIRED_CREDENTIAL", "expired").is_credential_rejected());
        assert!(
            CrowdError::from_reason("INVALID_USER_AUTHENTICATION", "wrong").is_credential_rejected()
        );
        assert!(matches!(
            CrowdError::from_reason("APPLICATION_PERMISSION_DENIED", "nope"),
            CrowdError::ApplicationPermission(_)
        ));

        match CrowdError::from_reason("ILLEGAL_ARGUMENT", "bad restriction") {
            CrowdError::OperationFailed { reason, message } => {
                assert_eq!(reason, "ILLEGAL_ARGUMENT");
                assert_eq!(message, "bad restriction");
            }
            other => panic!("Expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn not_found_is_not_a_credential_rejection() {
        assert!(!CrowdError::user_not_found("jdoe").is_credential_rejected());
        assert!(!CrowdError::ApplicationAuthentication.is_credential_rejected());
    }

    #[test]
    fn converts_to_federation_error() {
        let err = CrowdError::operation_failed("OPERATION_FAILED", "boom").into_federation("search users");
        assert!(err.is_directory_access());
        assert_eq!(err.to_string(), "Directory access failed during search users");
        assert!(err.source().unwrap().to_string().contains("boom"));

        let err: FederationError = CrowdError::InsecureProtocol.into();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("HTTPS"));
    }
}
