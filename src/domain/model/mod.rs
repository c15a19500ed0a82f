// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, EncodeFailure, PlanError};
use crate::domain::rules::OutputNaming;

/// Extension of the single supported output container
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Directory created beside the source when no output directory is given
pub const DEFAULT_OUTPUT_DIR: &str = "video_segments";

/// Explicit handle identifying one split job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| DomainError::BadArgs(format!("Invalid job id '{}': {}", s, e)))
    }
}

/// Source video as known to the splitter
///
/// Created unprobed on selection. Once probed it is immutable; an unprobed
/// source cannot be planned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceMedia {
    pub path: PathBuf,
    pub total_duration_seconds: f64,
    pub probed: bool,
    pub format_name: Option<String>,
    pub has_audio: bool,
}

impl SourceMedia {
    /// Source that has been selected but not yet probed
    pub fn unprobed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            total_duration_seconds: 0.0,
            probed: false,
            format_name: None,
            has_audio: false,
        }
    }

    /// Source with a known duration
    pub fn probed(path: impl Into<PathBuf>, total_duration_seconds: f64) -> Self {
        Self {
            path: path.into(),
            total_duration_seconds: total_duration_seconds.max(0.0),
            probed: true,
            format_name: None,
            has_audio: false,
        }
    }

    pub fn with_format(mut self, format_name: impl Into<String>) -> Self {
        self.format_name = Some(format_name.into());
        self
    }

    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    /// Duration usable for planning, or why there is none
    pub fn planning_duration(&self) -> Result<f64, PlanError> {
        if !self.probed {
            return Err(PlanError::SourceNotProbed(
                self.path.to_string_lossy().to_string(),
            ));
        }
        Ok(self.total_duration_seconds)
    }

    /// File name without extension, used for output naming
    pub fn base_name(&self) -> String {
        OutputNaming::base_name(&self.path)
    }
}

/// One contiguous time interval of the source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    /// 1-based position in the plan
    pub index: usize,
    pub start_seconds: f64,
    pub length_seconds: f64,
}

impl Range {
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.length_seconds
    }
}

/// Ordered, immutable list of ranges to extract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPlan {
    ranges: Vec<Range>,
    total_duration_seconds: f64,
    nominal_length_seconds: f64,
}

impl SegmentPlan {
    pub(crate) fn from_parts(
        ranges: Vec<Range>,
        total_duration_seconds: f64,
        nominal_length_seconds: f64,
    ) -> Self {
        Self {
            ranges,
            total_duration_seconds,
            nominal_length_seconds,
        }
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.total_duration_seconds
    }

    pub fn nominal_length_seconds(&self) -> f64 {
        self.nominal_length_seconds
    }

    /// Range with the given 1-based index
    pub fn get(&self, index: usize) -> Option<&Range> {
        self.ranges.iter().find(|r| r.index == index)
    }

    /// Plan holding only the given ranges, keeping their original indices
    ///
    /// Used to re-submit failed ranges; output names stay identical to the
    /// first attempt.
    pub fn subset(&self, indices: &[usize]) -> SegmentPlan {
        let ranges = self
            .ranges
            .iter()
            .filter(|r| indices.contains(&r.index))
            .copied()
            .collect();
        Self {
            ranges,
            total_duration_seconds: self.total_duration_seconds,
            nominal_length_seconds: self.nominal_length_seconds,
        }
    }
}

/// Named compression preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    #[default]
    Medium,
    Low,
}

impl QualityTier {
    /// Constant rate factor passed to the encoder (lower keeps more detail)
    pub fn crf(&self) -> u8 {
        match self {
            QualityTier::High => 18,
            QualityTier::Medium => 23,
            QualityTier::Low => 28,
        }
    }

    /// Parse quality tier from string
    pub fn parse(tier: &str) -> Result<Self, DomainError> {
        match tier.trim().to_lowercase().as_str() {
            "high" => Ok(QualityTier::High),
            "medium" => Ok(QualityTier::Medium),
            "low" => Ok(QualityTier::Low),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid quality tier: {}. Valid tiers: high, medium, low",
                tier
            ))),
        }
    }
}

impl FromStr for QualityTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityTier::High => "high",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
        };
        write!(f, "{}", name)
    }
}

/// Output settings fixed for the duration of a job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeSettings {
    pub quality: QualityTier,
    pub keep_audio: bool,
    pub output_directory: PathBuf,
}

impl EncodeSettings {
    pub fn new(quality: QualityTier, keep_audio: bool, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            quality,
            keep_audio,
            output_directory: output_directory.into(),
        }
    }

    /// Settings writing into the default directory beside the source
    pub fn beside_source(source: &Path, quality: QualityTier, keep_audio: bool) -> Self {
        Self::new(quality, keep_audio, OutputNaming::default_output_dir(source))
    }
}

/// One planned range bound to its source and output
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub range: Range,
    pub source_path: PathBuf,
    pub settings: EncodeSettings,
    pub output_path: PathBuf,
}

impl EncodeJob {
    pub fn new(range: Range, source_path: &Path, settings: &EncodeSettings) -> Self {
        let output_path =
            OutputNaming::segment_path(&settings.output_directory, source_path, range.index);
        Self {
            range,
            source_path: source_path.to_path_buf(),
            settings: settings.clone(),
            output_path,
        }
    }
}

/// Progress reported by a running encode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub index: usize,
    pub encoded_seconds: f64,
    pub fraction: f64,
}

/// Terminal result of one encode
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeOutcome {
    Succeeded { output_path: PathBuf, size_bytes: u64 },
    Failed(EncodeFailure),
}

/// Lifecycle of a single range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RangeStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Per-range mutable record owned by the job runner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeJobState {
    pub range: Range,
    pub status: RangeStatus,
    pub progress_fraction: f64,
    pub output_path: PathBuf,
    pub error_cause: Option<EncodeFailure>,
    pub file_size_bytes: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl EncodeJobState {
    pub fn pending(range: Range, output_path: PathBuf) -> Self {
        Self {
            range,
            status: RangeStatus::Pending,
            progress_fraction: 0.0,
            output_path,
            error_cause: None,
            file_size_bytes: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RangeStatus::Succeeded | RangeStatus::Failed)
    }

    /// Whether the external tool was ever launched for this range
    pub fn was_launched(&self) -> bool {
        self.started_at.is_some()
    }

    /// Pending -> Running
    pub fn mark_running(&mut self) -> bool {
        if self.status != RangeStatus::Pending {
            return false;
        }
        self.status = RangeStatus::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// Raise progress; never lowers it and ignores non-running ranges
    pub fn advance(&mut self, fraction: f64) -> bool {
        if self.status != RangeStatus::Running || !fraction.is_finite() {
            return false;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction <= self.progress_fraction {
            return false;
        }
        self.progress_fraction = fraction;
        true
    }

    pub fn succeed(&mut self, size_bytes: u64) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = RangeStatus::Succeeded;
        self.progress_fraction = 1.0;
        self.file_size_bytes = Some(size_bytes);
        self.finished_at = Some(Utc::now());
        true
    }

    pub fn fail(&mut self, cause: EncodeFailure) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = RangeStatus::Failed;
        self.error_cause = Some(cause);
        self.finished_at = Some(Utc::now());
        true
    }

    /// Cancelled after dispatch but before the transcoder was entered
    pub fn withdraw(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.started_at = None;
        self.fail(EncodeFailure::Cancelled)
    }

    /// Contribution to overall progress; terminal ranges count as finished work
    fn effective_fraction(&self) -> f64 {
        if self.is_terminal() {
            1.0
        } else {
            self.progress_fraction
        }
    }
}

/// Job runner state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// File written for a successful range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProducedFile {
    pub index: usize,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration_seconds: f64,
}

/// Range that ended in failure, with its cause
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeFailure {
    pub index: usize,
    pub start_seconds: f64,
    pub length_seconds: f64,
    pub output_path: PathBuf,
    pub cause: EncodeFailure,
}

/// Read-only snapshot of a job, recomputed from range states
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub status: JobStatus,
    pub completed_ranges: usize,
    pub failed_ranges: Vec<RangeFailure>,
    pub produced_files: Vec<ProducedFile>,
    pub overall_progress_fraction: f64,
    pub done: bool,
    pub ranges: Vec<EncodeJobState>,
}

impl JobResult {
    /// Derive a snapshot from the current range states
    pub fn from_states(job_id: JobId, status: JobStatus, states: &[EncodeJobState]) -> Self {
        let produced_files: Vec<ProducedFile> = states
            .iter()
            .filter(|s| s.status == RangeStatus::Succeeded)
            .map(|s| ProducedFile {
                index: s.range.index,
                path: s.output_path.clone(),
                size_bytes: s.file_size_bytes.unwrap_or(0),
                duration_seconds: s.range.length_seconds,
            })
            .collect();

        let failed_ranges: Vec<RangeFailure> = states
            .iter()
            .filter(|s| s.status == RangeStatus::Failed)
            .map(|s| RangeFailure {
                index: s.range.index,
                start_seconds: s.range.start_seconds,
                length_seconds: s.range.length_seconds,
                output_path: s.output_path.clone(),
                cause: s
                    .error_cause
                    .clone()
                    .unwrap_or_else(|| EncodeFailure::Unknown("no cause recorded".to_string())),
            })
            .collect();

        let total_length: f64 = states.iter().map(|s| s.range.length_seconds).sum();
        let all_terminal = states.iter().all(EncodeJobState::is_terminal);
        let overall_progress_fraction = if total_length > 0.0 {
            let weighted: f64 = states
                .iter()
                .map(|s| s.range.length_seconds * s.effective_fraction())
                .sum();
            (weighted / total_length).clamp(0.0, 1.0)
        } else if all_terminal {
            1.0
        } else {
            0.0
        };

        Self {
            job_id,
            status,
            completed_ranges: produced_files.len(),
            failed_ranges,
            produced_files,
            overall_progress_fraction,
            done: status == JobStatus::Completed && all_terminal,
            ranges: states.to_vec(),
        }
    }

    /// Job ended without any range ever reaching the transcoder
    pub fn is_aborted(&self) -> bool {
        self.done
            && !self.ranges.is_empty()
            && self.ranges.iter().all(|s| {
                !s.was_launched()
                    && s.error_cause
                        .as_ref()
                        .map(EncodeFailure::is_cancelled)
                        .unwrap_or(false)
            })
    }

    /// Indices of failed ranges, in plan order
    pub fn failed_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.failed_ranges.iter().map(|f| f.index).collect();
        indices.sort_unstable();
        indices
    }

    pub fn total_bytes(&self) -> u64 {
        self.produced_files.iter().map(|f| f.size_bytes).sum()
    }

    /// Fold the result of a retry back into this job
    ///
    /// Ranges present in `retry` replace the ones with the same index here.
    pub fn merged_with(&self, retry: &JobResult) -> JobResult {
        let states: Vec<EncodeJobState> = self
            .ranges
            .iter()
            .map(|state| {
                retry
                    .ranges
                    .iter()
                    .find(|r| r.range.index == state.range.index)
                    .unwrap_or(state)
                    .clone()
            })
            .collect();
        JobResult::from_states(self.job_id, JobStatus::Completed, &states)
    }
}
