//! Argument construction for the external transcoder
//!
//! Every argument the splitter passes to ffmpeg/ffprobe is built here so the
//! rest of the crate only deals with jobs and outcomes.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::model::EncodeJob;

/// Video encoder used for every segment
pub const VIDEO_CODEC: &str = "libx264";
/// Encoder speed preset
pub const VIDEO_PRESET: &str = "medium";
/// Audio encoder used when audio is kept
pub const AUDIO_CODEC: &str = "aac";
/// Audio bitrate used when audio is kept
pub const AUDIO_BITRATE: &str = "128k";
/// ffmpeg muxer name for the output container
pub const OUTPUT_MUXER: &str = "mp4";

/// Fully resolved invocation of an external tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolCommand {
    fn new(program: &Path, args: Vec<String>) -> Self {
        Self {
            program: program.to_path_buf(),
            args,
        }
    }

    /// Encode one planned range; progress is written to stdout as key=value lines
    pub fn encode(ffmpeg: &Path, job: &EncodeJob) -> Self {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-ss".into(),
            format_seconds(job.range.start_seconds),
            "-i".into(),
            job.source_path.to_string_lossy().to_string(),
            "-t".into(),
            format_seconds(job.range.length_seconds),
            "-c:v".into(),
            VIDEO_CODEC.into(),
            "-preset".into(),
            VIDEO_PRESET.into(),
            "-crf".into(),
            job.settings.quality.crf().to_string(),
        ];

        if job.settings.keep_audio {
            args.extend([
                "-c:a".to_string(),
                AUDIO_CODEC.to_string(),
                "-b:a".to_string(),
                AUDIO_BITRATE.to_string(),
            ]);
        } else {
            args.push("-an".into());
        }

        args.extend(
            [
                "-sn",
                "-avoid_negative_ts",
                "make_zero",
                "-movflags",
                "+faststart",
                "-f",
                OUTPUT_MUXER,
                "-progress",
                "pipe:1",
                "-nostats",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(job.output_path.to_string_lossy().to_string());

        Self::new(ffmpeg, args)
    }

    /// Metadata query returning format and streams as JSON
    pub fn probe(ffprobe: &Path, source: &Path) -> Self {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            source.to_string_lossy().to_string(),
        ];
        Self::new(ffprobe, args)
    }

    /// Input-only ffmpeg run; the banner on stderr carries `Duration:`
    pub fn duration_banner(ffmpeg: &Path, source: &Path) -> Self {
        let args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
        ];
        Self::new(ffmpeg, args)
    }

    pub fn version(program: &Path) -> Self {
        Self::new(program, vec!["-version".to_string()])
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Seconds as passed on the command line, without rounding
///
/// Uses the shortest representation that round-trips, so `140.0` becomes
/// `140` and `12.345` stays `12.345`.
pub fn format_seconds(seconds: f64) -> String {
    format!("{}", seconds.max(0.0))
}
