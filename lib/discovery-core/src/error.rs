use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Registry rejected request ({status}): {message}")]
    RegistryRejected { status: u16, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DiscoveryError {
    /// Failures that may clear up on their own: the registry was unreachable,
    /// slow, or the call was cancelled. Rejections and wiring errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DiscoveryError::RegistryUnavailable(_)
                | DiscoveryError::Timeout(_)
                | DiscoveryError::Cancelled(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DiscoveryError::RegistryUnavailable("down".to_string()).is_transient());
        assert!(DiscoveryError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(DiscoveryError::Cancelled("registration".to_string()).is_transient());
        assert!(!DiscoveryError::InvalidConfiguration("bad port".to_string()).is_transient());
        assert!(!DiscoveryError::RegistryRejected {
            status: 400,
            message: "invalid check".to_string()
        }
        .is_transient());
    }
}
