// Domain errors - Error types for the domain layer

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Failure to establish the duration of a source file
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum ProbeError {
    /// Path does not resolve to a readable file
    #[error("Source file not found or unreadable: {0}")]
    NotFound(String),
    /// Tool reported no parsable duration or exited non-zero
    #[error("Unreadable media: {0}")]
    UnreadableMedia(String),
    /// Probe did not return within the bounded wait
    #[error("Probe timed out after {0}s")]
    Timeout(u64),
    /// Probing tool could not be launched at all
    #[error("Probe tool unavailable: {0}")]
    ToolUnavailable(String),
}

/// Failure to turn a duration into a segment plan
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum PlanError {
    #[error("Segment length must be greater than zero (got {0})")]
    InvalidSegmentLength(f64),
    #[error("Source duration must be greater than zero (got {0})")]
    EmptySource(f64),
    #[error("Segment length {0}s would produce more than {1} segments")]
    TooManySegments(f64, usize),
    #[error("Source has not been probed: {0}")]
    SourceNotProbed(String),
}

/// Cause of a single range failing to encode
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum EncodeFailure {
    /// Tool was killed by a signal, could not start, or aborted
    #[error("Transcoder crashed: {0}")]
    ToolCrashed(String),
    #[error("Disk full while writing output")]
    DiskFull,
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),
    #[error("Cancelled")]
    Cancelled,
    /// No progress output within the watchdog interval
    #[error("Transcoder stalled for {0}s without progress")]
    Timeout(u64),
    #[error("Encode failed: {0}")]
    Unknown(String),
}

impl EncodeFailure {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EncodeFailure::Cancelled)
    }
}

/// Domain-specific error types surfaced to callers
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Pre-flight probe failed
    Probe(ProbeError),
    /// Pre-flight planning failed
    Plan(PlanError),
    /// File system operation failed
    FsFail(String),
    /// No running job with this id
    JobNotFound(String),
    /// Configuration could not be loaded or is invalid
    Config(String),
    /// Internal error
    InternalError(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::Probe(err) => write!(f, "Probe failed: {}", err),
            DomainError::Plan(err) => write!(f, "Planning failed: {}", err),
            DomainError::FsFail(msg) => write!(f, "File system error: {}", msg),
            DomainError::JobNotFound(id) => write!(f, "No active job with id {}", id),
            DomainError::Config(msg) => write!(f, "Configuration error: {}", msg),
            DomainError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DomainError::Probe(err) => Some(err),
            DomainError::Plan(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProbeError> for DomainError {
    fn from(err: ProbeError) -> Self {
        DomainError::Probe(err)
    }
}

impl From<PlanError> for DomainError {
    fn from(err: PlanError) -> Self {
        DomainError::Plan(err)
    }
}
