//! Exit classification for the external transcoder

use std::collections::VecDeque;
use std::path::Path;

use crate::domain::errors::EncodeFailure;
use crate::domain::model::EncodeOutcome;

/// Number of diagnostic lines kept per run
pub const DIAGNOSTIC_TAIL_LINES: usize = 20;

const DISK_FULL_MARKERS: &[&str] = &[
    "no space left on device",
    "disk quota exceeded",
    "enospc",
];

const CODEC_MARKERS: &[&str] = &[
    "unknown encoder",
    "encoder not found",
    "decoder not found",
    "unsupported codec",
    "codec not currently supported",
    "could not find tag for codec",
];

/// Bounded tail of the tool's diagnostic output
#[derive(Debug, Clone)]
pub struct DiagnosticTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines.into()
    }
}

impl Default for DiagnosticTail {
    fn default() -> Self {
        Self::new(DIAGNOSTIC_TAIL_LINES)
    }
}

/// How the tool process ended
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExit {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub diagnostics: Vec<String>,
}

impl ToolExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn last_diagnostic(&self) -> Option<&str> {
        self.diagnostics.last().map(String::as_str)
    }

    fn find_marker(&self, markers: &[&str]) -> Option<&str> {
        self.diagnostics
            .iter()
            .rev()
            .find(|line| {
                let lower = line.to_lowercase();
                markers.iter().any(|m| lower.contains(m))
            })
            .map(String::as_str)
    }
}

/// Decide the outcome of a finished encode
///
/// `output_size` is the size of the output file if it exists.
pub fn classify_exit(exit: &ToolExit, output_path: &Path, output_size: Option<u64>) -> EncodeOutcome {
    if exit.success() {
        return match output_size {
            Some(size) if size > 0 => EncodeOutcome::Succeeded {
                output_path: output_path.to_path_buf(),
                size_bytes: size,
            },
            Some(_) => EncodeOutcome::Failed(EncodeFailure::Unknown(
                "transcoder exited successfully but wrote an empty file".to_string(),
            )),
            None => EncodeOutcome::Failed(EncodeFailure::Unknown(
                "transcoder exited successfully but wrote no file".to_string(),
            )),
        };
    }
    EncodeOutcome::Failed(classify_failure(exit))
}

/// Map a non-zero exit and its diagnostics to a failure cause
pub fn classify_failure(exit: &ToolExit) -> EncodeFailure {
    if exit.find_marker(DISK_FULL_MARKERS).is_some() {
        return EncodeFailure::DiskFull;
    }
    if let Some(line) = exit.find_marker(CODEC_MARKERS) {
        return EncodeFailure::UnsupportedCodec(line.to_string());
    }

    match exit.code {
        None => EncodeFailure::ToolCrashed("terminated by signal".to_string()),
        // Shell-style signal codes and Windows exception codes (negative as i32)
        Some(code) if code >= 128 || code < 0 => {
            EncodeFailure::ToolCrashed(format!("exit code {}", code))
        }
        Some(code) => {
            let detail = exit.last_diagnostic().unwrap_or("no diagnostic output");
            EncodeFailure::Unknown(format!("exit code {}: {}", code, detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn exit(code: Option<i32>, lines: &[&str]) -> ToolExit {
        ToolExit {
            code,
            diagnostics: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_success_with_output() {
        let outcome = classify_exit(&exit(Some(0), &[]), Path::new("o.mp4"), Some(4096));
        assert_eq!(
            outcome,
            EncodeOutcome::Succeeded {
                output_path: PathBuf::from("o.mp4"),
                size_bytes: 4096
            }
        );
    }

    #[test]
    fn test_success_without_output_is_failure() {
        let missing = classify_exit(&exit(Some(0), &[]), Path::new("o.mp4"), None);
        assert!(matches!(missing, EncodeOutcome::Failed(EncodeFailure::Unknown(_))));

        let empty = classify_exit(&exit(Some(0), &[]), Path::new("o.mp4"), Some(0));
        assert!(matches!(empty, EncodeOutcome::Failed(EncodeFailure::Unknown(_))));
    }

    #[test]
    fn test_disk_full_detected() {
        let e = exit(
            Some(1),
            &["av_interleaved_write_frame(): No space left on device", "Conversion failed!"],
        );
        assert_eq!(classify_failure(&e), EncodeFailure::DiskFull);
    }

    #[test]
    fn test_unsupported_codec_detected() {
        let e = exit(Some(1), &["Unknown encoder 'libx264'"]);
        assert_eq!(
            classify_failure(&e),
            EncodeFailure::UnsupportedCodec("Unknown encoder 'libx264'".to_string())
        );
    }

    #[test]
    fn test_signal_and_high_codes_are_crashes() {
        assert!(matches!(
            classify_failure(&exit(None, &[])),
            EncodeFailure::ToolCrashed(_)
        ));
        assert!(matches!(
            classify_failure(&exit(Some(139), &[])),
            EncodeFailure::ToolCrashed(_)
        ));
        assert!(matches!(
            classify_failure(&exit(Some(-1073741819), &[])),
            EncodeFailure::ToolCrashed(_)
        ));
    }

    #[test]
    fn test_plain_error_is_unknown_with_detail() {
        let e = exit(Some(1), &["something odd", "Conversion failed!"]);
        assert_eq!(
            classify_failure(&e),
            EncodeFailure::Unknown("exit code 1: Conversion failed!".to_string())
        );
    }

    #[test]
    fn test_diagnostic_tail_is_bounded() {
        let mut tail = DiagnosticTail::new(2);
        tail.push("one");
        tail.push("   ");
        tail.push("two");
        tail.push("three");
        assert_eq!(tail.into_lines(), vec!["two".to_string(), "three".to_string()]);
    }
}
