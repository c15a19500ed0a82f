//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::adapters::SplitConfig;
use crate::domain::model::QualityTier;

/// External tool locations
#[derive(Args, Debug, Default)]
pub struct ToolArgs {
    /// ffmpeg executable (default: found on PATH)
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe executable (default: next to --ffmpeg, else PATH)
    #[arg(long)]
    pub ffprobe: Option<PathBuf>,
}

impl ToolArgs {
    pub fn apply_to(&self, config: &mut SplitConfig) {
        if let Some(path) = &self.ffmpeg {
            config.ffmpeg_path = Some(path.clone());
        }
        if let Some(path) = &self.ffprobe {
            config.ffprobe_path = Some(path.clone());
        }
    }
}

/// Segment length as minutes plus seconds
#[derive(Args, Debug, Default)]
pub struct LengthArgs {
    /// Minutes per segment
    #[arg(short, long)]
    pub minutes: Option<u32>,

    /// Seconds per segment, added to the minutes
    #[arg(short, long)]
    pub seconds: Option<f64>,
}

impl LengthArgs {
    /// Giving either part replaces both configured parts
    pub fn apply_to(&self, config: &mut SplitConfig) {
        if self.minutes.is_none() && self.seconds.is_none() {
            return;
        }
        config.segment_minutes = self.minutes.unwrap_or(0);
        config.segment_seconds = self.seconds.unwrap_or(0.0);
    }
}

/// Arguments for the split command
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub length: LengthArgs,

    /// Quality tier (high, medium, low)
    #[arg(short, long)]
    pub quality: Option<QualityTier>,

    /// Drop the audio track
    #[arg(long)]
    pub no_audio: bool,

    /// Output directory (default: video_segments/ next to the input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of segments encoded at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    #[command(flatten)]
    pub tools: ToolArgs,

    /// Retry failed segments once after the first pass
    #[arg(long)]
    pub retry_failed: bool,

    /// Print the final result as JSON
    #[arg(long)]
    pub json: bool,
}

impl SplitArgs {
    pub fn apply_to(&self, config: &mut SplitConfig) {
        self.length.apply_to(config);
        self.tools.apply_to(config);
        if let Some(quality) = self.quality {
            config.quality = quality;
        }
        if self.no_audio {
            config.keep_audio = false;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Some(jobs) = self.jobs {
            config.concurrency = jobs;
        }
    }
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub tools: ToolArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Input video file path, probed for its duration
    #[arg(short, long, required_unless_present = "duration")]
    pub input: Option<PathBuf>,

    /// Total duration in seconds, instead of probing a file
    #[arg(long, conflicts_with = "input")]
    pub duration: Option<f64>,

    #[command(flatten)]
    pub length: LengthArgs,

    #[command(flatten)]
    pub tools: ToolArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_split_args_override_config() {
        let cli = Cli::parse_from([
            "splitter", "split", "-i", "a.mp4", "-m", "1", "-q", "high", "--no-audio", "-j", "2",
        ]);
        let Commands::Split(args) = cli.command else {
            panic!("expected split command");
        };

        let mut config = SplitConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.nominal_length_seconds(), 60.0);
        assert_eq!(config.quality, QualityTier::High);
        assert!(!config.keep_audio);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.output_dir, None);
    }

    #[test]
    fn test_split_args_keep_config_when_absent() {
        let cli = Cli::parse_from(["splitter", "split", "--input", "a.mp4"]);
        let Commands::Split(args) = cli.command else {
            panic!("expected split command");
        };

        let mut config = SplitConfig::default();
        let before = config.clone();
        args.apply_to(&mut config);
        assert_eq!(config, before);
    }

    #[test]
    fn test_plan_requires_input_or_duration() {
        assert!(Cli::try_parse_from(["splitter", "plan"]).is_err());
        assert!(Cli::try_parse_from(["splitter", "plan", "--duration", "320"]).is_ok());
        assert!(Cli::try_parse_from([
            "splitter", "plan", "-i", "a.mp4", "--duration", "320"
        ])
        .is_err());
    }

    #[test]
    fn test_invalid_quality_is_rejected() {
        assert!(Cli::try_parse_from(["splitter", "split", "-i", "a.mp4", "-q", "ultra"]).is_err());
    }
}
