// Domain rules - Segment planning and output naming policies

use std::path::{Path, PathBuf};

use crate::domain::errors::PlanError;
use crate::domain::model::*;

/// Remainders below this are floating point noise, not a final segment.
///
/// Any real remainder, however short, is emitted as the last segment; there
/// is no minimum segment length.
pub const REMAINDER_EPSILON_SECONDS: f64 = 1e-6;

/// Upper bound on the number of ranges in one plan
pub const MAX_SEGMENTS: usize = 100_000;

/// Splits a duration into fixed-length ranges
pub struct SegmentPlanner;

impl SegmentPlanner {
    /// Plan ranges covering `total_duration_seconds` in steps of `nominal_length_seconds`
    pub fn plan(
        total_duration_seconds: f64,
        nominal_length_seconds: f64,
    ) -> Result<SegmentPlan, PlanError> {
        if !nominal_length_seconds.is_finite() || nominal_length_seconds <= 0.0 {
            return Err(PlanError::InvalidSegmentLength(nominal_length_seconds));
        }
        if !total_duration_seconds.is_finite() || total_duration_seconds <= 0.0 {
            return Err(PlanError::EmptySource(total_duration_seconds));
        }

        let ratio = total_duration_seconds / nominal_length_seconds;
        if ratio > MAX_SEGMENTS as f64 + 1.0 {
            return Err(PlanError::TooManySegments(nominal_length_seconds, MAX_SEGMENTS));
        }

        let mut count = ratio.ceil() as usize;
        // ceil() can overshoot by one when the ratio carries rounding error
        while count > 1
            && total_duration_seconds - (count - 1) as f64 * nominal_length_seconds
                < REMAINDER_EPSILON_SECONDS
        {
            count -= 1;
        }
        let count = count.max(1);
        if count > MAX_SEGMENTS {
            return Err(PlanError::TooManySegments(nominal_length_seconds, MAX_SEGMENTS));
        }

        let ranges = (1..=count)
            .map(|index| {
                let start_seconds = (index - 1) as f64 * nominal_length_seconds;
                let remaining = total_duration_seconds - start_seconds;
                let length_seconds = if index == count {
                    remaining
                } else {
                    nominal_length_seconds.min(remaining)
                };
                Range {
                    index,
                    start_seconds,
                    length_seconds,
                }
            })
            .collect();

        Ok(SegmentPlan::from_parts(
            ranges,
            total_duration_seconds,
            nominal_length_seconds,
        ))
    }

    /// Plan directly from a probed source
    pub fn plan_source(
        source: &SourceMedia,
        nominal_length_seconds: f64,
    ) -> Result<SegmentPlan, PlanError> {
        let total = source.planning_duration()?;
        Self::plan(total, nominal_length_seconds)
    }

    /// Nominal length from the minutes + seconds configuration pair
    pub fn nominal_length(minutes: u32, seconds: f64) -> f64 {
        minutes as f64 * 60.0 + seconds
    }
}

/// Output file naming convention: `{base}_part_{index:03}.mp4`
pub struct OutputNaming;

impl OutputNaming {
    /// Source file name without its extension
    pub fn base_name(source: &Path) -> String {
        source
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "video".to_string())
    }

    pub fn segment_file_name(source: &Path, index: usize) -> String {
        format!(
            "{}_part_{:03}.{}",
            Self::base_name(source),
            index,
            OUTPUT_EXTENSION
        )
    }

    pub fn segment_path(output_directory: &Path, source: &Path, index: usize) -> PathBuf {
        output_directory.join(Self::segment_file_name(source, index))
    }

    /// `video_segments/` next to the source file
    pub fn default_output_dir(source: &Path) -> PathBuf {
        source
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(DEFAULT_OUTPUT_DIR)
    }
}

#[cfg(test)]
mod tests;
