use crate::error::StoreError;
use serde::{Deserialize, Serialize};

/// Write-time conflict resolution on document id collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Surface a duplicate-document error on the first collision.
    #[default]
    Fail,
    /// Replace the stored document with the incoming one.
    Overwrite,
    /// Leave the stored document in place and drop the incoming one.
    Skip
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicatePolicy::Fail => write!(f, "fail"),
            DuplicatePolicy::Overwrite => write!(f, "overwrite"),
            DuplicatePolicy::Skip => write!(f, "skip")
        }
    }
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(DuplicatePolicy::Fail),
            "overwrite" => Ok(DuplicatePolicy::Overwrite),
            "skip" => Ok(DuplicatePolicy::Skip),
            _ => Err(StoreError::Configuration(format!(
                "Unknown duplicate policy: {}. Valid options: fail, overwrite, skip",
                s
            )))
        }
    }
}
