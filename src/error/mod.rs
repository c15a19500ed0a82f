//! Error handling module for SplitX

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for SplitX operations
#[derive(Error, Debug)]
pub enum SplitXError {
    /// Precondition or service failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Some ranges did not produce a file
    #[error("{failed} of {total} segment(s) failed")]
    PartialFailure { failed: usize, total: usize },

    /// Cancelled before any range reached the transcoder
    #[error("Job cancelled before any segment was written")]
    Aborted,

    /// Result could not be serialized
    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SplitXError {
    /// Process exit code for the command line front-end
    pub fn exit_code(&self) -> i32 {
        match self {
            SplitXError::PartialFailure { .. } => 2,
            SplitXError::Aborted => 130,
            _ => 1,
        }
    }
}

/// Result type alias for SplitX operations
pub type SplitXResult<T> = std::result::Result<T, SplitXError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ProbeError;

    #[test]
    fn test_domain_errors_display_transparently() {
        let err: SplitXError = DomainError::from(ProbeError::Timeout(30)).into();
        assert_eq!(err.to_string(), DomainError::Probe(ProbeError::Timeout(30)).to_string());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SplitXError::PartialFailure { failed: 1, total: 5 }.exit_code(), 2);
        assert_eq!(SplitXError::Aborted.exit_code(), 130);
        assert_eq!(
            SplitXError::PartialFailure { failed: 1, total: 5 }.to_string(),
            "1 of 5 segment(s) failed"
        );
    }
}
