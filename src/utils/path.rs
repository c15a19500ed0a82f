//! Path utilities for tool lookup and output placement

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::rules::OutputNaming;

/// Default transcoder executable, looked up on PATH
pub const DEFAULT_FFMPEG: &str = "ffmpeg";
/// Default metadata tool executable, looked up on PATH
pub const DEFAULT_FFPROBE: &str = "ffprobe";

/// Transcoder executable: the override if given, else PATH lookup
pub fn resolve_ffmpeg(ffmpeg_override: Option<&Path>) -> PathBuf {
    ffmpeg_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FFMPEG))
}

/// Metadata tool executable
///
/// An explicit override wins. Otherwise, when ffmpeg itself was overridden
/// with a path that has a directory, ffprobe is expected next to it.
pub fn resolve_ffprobe(ffprobe_override: Option<&Path>, ffmpeg_override: Option<&Path>) -> PathBuf {
    if let Some(path) = ffprobe_override {
        return path.to_path_buf();
    }
    ffmpeg_override
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(format!("{}{}", DEFAULT_FFPROBE, std::env::consts::EXE_SUFFIX)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FFPROBE))
}

/// Output directory: the override if given, else `video_segments/` beside the source
pub fn resolve_output_dir(output_override: Option<&Path>, source: &Path) -> PathBuf {
    output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| OutputNaming::default_output_dir(source))
}

/// Delete a partially written output; a missing file is not an error
pub async fn remove_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {}", path.display(), e),
    }
}
