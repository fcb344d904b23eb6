use crate::filter::FilterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed to {0}")]
    ConnectionFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Duplicate document id: {id}")]
    DuplicateDocument { id: String },

    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal store error: {0}")]
    Internal(String)
}

impl StoreError {
    /// Only transport failures are worth retrying; everything else is a
    /// deterministic failure that would recur on the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::ConnectionFailed(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(StoreError::ConnectionFailed("cluster0.mongodb.net".into()).is_retryable());

        assert!(!StoreError::Configuration("MONGODB_URI not set".into()).is_retryable());
        assert!(
            !StoreError::DuplicateDocument {
                id: "doc-1".into()
            }
            .is_retryable()
        );
        assert!(
            !StoreError::InvalidFilter(FilterError::UnsupportedOperator {
                operator: "=~".into()
            })
            .is_retryable()
        );
    }

    #[test]
    fn test_filter_error_is_transparent() {
        let err: StoreError = FilterError::InvalidFieldPath {
            path: "meta.".into()
        }
        .into();
        assert!(err.to_string().contains("meta."));
    }
}
