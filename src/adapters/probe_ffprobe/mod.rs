//! FFprobe adapter for media file probing
//!
//! Asks ffprobe for the container duration as JSON. When that fails, falls
//! back to the `Duration:` line ffmpeg prints while opening the input.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapters::spawnable;
use crate::domain::errors::ProbeError;
use crate::domain::model::SourceMedia;
use crate::engine::ToolCommand;
use crate::ports::ProbePort;
use crate::utils::time::parse_hms;

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    format_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    duration: Option<String>,
}

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FFprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
            timeout,
        }
    }

    async fn ensure_readable(path: &Path) -> Result<(), ProbeError> {
        let display = path.to_string_lossy().to_string();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ProbeError::NotFound(format!("{}: {}", display, e)))?;
        if !metadata.is_file() {
            return Err(ProbeError::NotFound(format!("{}: not a regular file", display)));
        }
        tokio::fs::File::open(path)
            .await
            .map_err(|e| ProbeError::NotFound(format!("{}: {}", display, e)))?;
        Ok(())
    }

    async fn run(cmd: &ToolCommand) -> std::io::Result<std::process::Output> {
        spawnable(cmd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
    }

    async fn query_metadata(&self, path: &Path) -> Result<SourceMedia, ProbeError> {
        let cmd = ToolCommand::probe(&self.ffprobe, path);
        let output = Self::run(&cmd).await.map_err(|e| {
            ProbeError::ToolUnavailable(format!("{}: {}", self.ffprobe.display(), e))
        })?;

        if !output.status.success() {
            return Err(ProbeError::UnreadableMedia(format!(
                "ffprobe exited with {}",
                output.status
            )));
        }
        parse_probe_json(path, &String::from_utf8_lossy(&output.stdout))
    }

    async fn query_banner(&self, path: &Path) -> Result<SourceMedia, ProbeError> {
        let cmd = ToolCommand::duration_banner(&self.ffmpeg, path);
        // Exits non-zero because no output is given; only the banner matters
        let output = Self::run(&cmd).await.map_err(|e| {
            ProbeError::ToolUnavailable(format!("{}: {}", self.ffmpeg.display(), e))
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        match parse_duration_banner(&stderr) {
            Some(duration) if duration > 0.0 => Ok(SourceMedia::probed(path, duration)
                .with_audio(stderr.contains("Audio:"))),
            _ => Err(ProbeError::UnreadableMedia(
                "no duration reported by ffmpeg".to_string(),
            )),
        }
    }

    async fn probe_inner(&self, path: &Path) -> Result<SourceMedia, ProbeError> {
        match self.query_metadata(path).await {
            Ok(source) => Ok(source),
            Err(primary) => {
                warn!("Could not get precise duration: {}", primary);
                match self.query_banner(path).await {
                    Ok(source) => {
                        debug!(
                            duration = source.total_duration_seconds,
                            "Duration recovered from ffmpeg banner"
                        );
                        Ok(source)
                    }
                    Err(ProbeError::ToolUnavailable(msg)) => match primary {
                        ProbeError::ToolUnavailable(_) => Err(ProbeError::ToolUnavailable(msg)),
                        other => Err(other),
                    },
                    Err(_) => match primary {
                        ProbeError::ToolUnavailable(_) => Err(ProbeError::UnreadableMedia(
                            "no duration reported by ffmpeg".to_string(),
                        )),
                        other => Err(other),
                    },
                }
            }
        }
    }
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe(&self, path: &Path) -> Result<SourceMedia, ProbeError> {
        Self::ensure_readable(path).await?;
        debug!(path = %path.display(), "Probing source duration");

        tokio::time::timeout(self.timeout, self.probe_inner(path))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout.as_secs()))?
    }
}

/// Build a probed source from ffprobe's JSON output
pub fn parse_probe_json(path: &Path, json: &str) -> Result<SourceMedia, ProbeError> {
    let parsed: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| ProbeError::UnreadableMedia(format!("invalid ffprobe output: {}", e)))?;

    let has_video = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));
    if !parsed.streams.is_empty() && !has_video {
        return Err(ProbeError::UnreadableMedia(
            "no video stream found".to_string(),
        ));
    }

    let format_duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds);
    let stream_duration = parsed
        .streams
        .iter()
        .filter_map(|s| s.duration.as_deref().and_then(parse_seconds))
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));

    let duration = format_duration
        .or(stream_duration)
        .filter(|d| *d > 0.0)
        .ok_or_else(|| ProbeError::UnreadableMedia("no duration in ffprobe output".to_string()))?;

    let mut source = SourceMedia::probed(path, duration).with_audio(has_audio);
    if let Some(name) = parsed.format.and_then(|f| f.format_name) {
        source = source.with_format(name);
    }
    Ok(source)
}

fn parse_seconds(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Extract `Duration: HH:MM:SS.xx` from ffmpeg's input banner
pub fn parse_duration_banner(stderr: &str) -> Option<f64> {
    stderr.lines().find_map(|line| {
        let (_, rest) = line.split_once("Duration:")?;
        let value = rest.split(',').next()?.trim();
        parse_hms(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_json_format_duration() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "duration": "120.000000"},
                {"codec_type": "audio", "duration": "119.9"}
            ],
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "320.040000"}
        }"#;
        let source = parse_probe_json(Path::new("a.mp4"), json).unwrap();
        assert!(source.probed);
        assert_eq!(source.total_duration_seconds, 320.04);
        assert!(source.has_audio);
        assert_eq!(source.format_name.as_deref(), Some("mov,mp4,m4a,3gp,3g2,mj2"));
    }

    #[test]
    fn test_parse_probe_json_falls_back_to_streams() {
        let json = r#"{"streams": [{"codec_type": "video", "duration": "42.5"}], "format": {}}"#;
        let source = parse_probe_json(Path::new("a.mkv"), json).unwrap();
        assert_eq!(source.total_duration_seconds, 42.5);
        assert!(!source.has_audio);
    }

    #[test]
    fn test_parse_probe_json_requires_duration() {
        let json = r#"{"streams": [{"codec_type": "video"}], "format": {"duration": "N/A"}}"#;
        assert!(matches!(
            parse_probe_json(Path::new("a.mp4"), json),
            Err(ProbeError::UnreadableMedia(_))
        ));
        assert!(matches!(
            parse_probe_json(Path::new("a.mp4"), "{}"),
            Err(ProbeError::UnreadableMedia(_))
        ));
        assert!(matches!(
            parse_probe_json(Path::new("a.mp4"), "garbage"),
            Err(ProbeError::UnreadableMedia(_))
        ));
    }

    #[test]
    fn test_parse_probe_json_rejects_audio_only() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "10.0"}}"#;
        assert!(matches!(
            parse_probe_json(Path::new("a.mp3"), json),
            Err(ProbeError::UnreadableMedia(_))
        ));
    }

    #[test]
    fn test_parse_duration_banner() {
        let stderr = "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'a.mp4':\n  \
                      Duration: 00:05:20.04, start: 0.000000, bitrate: 1205 kb/s\n";
        assert_eq!(parse_duration_banner(stderr), Some(320.04));
        assert_eq!(parse_duration_banner("  Duration: N/A, bitrate: N/A"), None);
        assert_eq!(parse_duration_banner("nothing here"), None);
    }

    #[tokio::test]
    async fn test_probe_missing_file_is_not_found() {
        let adapter = FFprobeAdapter::new("ffprobe", "ffmpeg", Duration::from_secs(5));
        let result = adapter.probe(Path::new("/no/such/file.mp4")).await;
        assert!(matches!(result, Err(ProbeError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_probe_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FFprobeAdapter::new("ffprobe", "ffmpeg", Duration::from_secs(5));
        let result = adapter.probe(dir.path()).await;
        assert!(matches!(result, Err(ProbeError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_probe_without_tools_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"not really a video").unwrap();

        let adapter = FFprobeAdapter::new(
            dir.path().join("missing-ffprobe"),
            dir.path().join("missing-ffmpeg"),
            Duration::from_secs(5),
        );
        let result = adapter.probe(&file).await;
        assert!(matches!(result, Err(ProbeError::ToolUnavailable(_))));
    }
}
