//! SplitX video splitter library
//!
//! Splits a video into fixed-length segments by driving an external
//! transcoder once per segment, streaming progress and tolerating
//! per-segment failure.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{JobEvent, JobHandle, JobRunner, SplitInteractor};
pub use domain::errors::{DomainError, EncodeFailure, PlanError, ProbeError};
pub use domain::model::{
    EncodeJob, EncodeJobState, EncodeOutcome, EncodeSettings, JobId, JobResult, JobStatus,
    ProgressEvent, QualityTier, Range, RangeStatus, SegmentPlan, SourceMedia,
};
pub use domain::rules::{OutputNaming, SegmentPlanner};
pub use error::{SplitXError, SplitXResult};
