//! FFmpeg execution adapter
//!
//! Runs one ffmpeg process per range. Progress comes from `-progress pipe:1`
//! on stdout, diagnostics from stderr. The process is killed and its partial
//! output removed on cancellation, stall, or failure.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::spawnable;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::{classify_exit, DiagnosticTail, RangeProgress, ToolCommand, ToolExit};
use crate::ports::EncodePort;
use crate::utils::path::remove_partial_output;
use crate::utils::time::format_hms_millis;

/// FFmpeg-based execution adapter
pub struct FFmpegAdapter {
    ffmpeg: PathBuf,
    stall_timeout: Duration,
}

impl FFmpegAdapter {
    /// Create new FFmpeg adapter
    ///
    /// `stall_timeout` bounds the silence between two progress lines.
    pub fn new(ffmpeg: impl Into<PathBuf>, stall_timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            stall_timeout,
        }
    }

    /// Read progress until `progress=end` or EOF, or return why it was cut short
    async fn follow_progress(
        &self,
        stdout: ChildStdout,
        job: &EncodeJob,
        tracker: &mut RangeProgress,
        progress: &UnboundedSender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> Option<EncodeFailure> {
        let mut lines = BufReader::new(stdout).lines();
        // `progress=end` is the last block ffmpeg writes
        while !tracker.ended() {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Some(EncodeFailure::Cancelled),
                next = tokio::time::timeout(self.stall_timeout, lines.next_line()) => next,
            };

            match next {
                Err(_) => {
                    warn!(
                        "Range {} produced no progress for {}s",
                        job.range.index,
                        self.stall_timeout.as_secs()
                    );
                    return Some(EncodeFailure::Timeout(self.stall_timeout.as_secs()));
                }
                Ok(Ok(Some(line))) => {
                    if let Some(fraction) = tracker.observe(&line) {
                        let _ = progress.send(ProgressEvent {
                            index: job.range.index,
                            encoded_seconds: tracker.encoded_seconds(),
                            fraction,
                        });
                    }
                }
                Ok(Ok(None)) => return None,
                Ok(Err(e)) => {
                    warn!("Progress stream of range {} unreadable: {}", job.range.index, e);
                    return Some(EncodeFailure::Unknown(format!(
                        "progress stream unreadable: {}",
                        e
                    )));
                }
            }
        }
        None
    }

    async fn abort(child: &mut Child, stderr_task: JoinHandle<Vec<String>>, output: &Path) {
        if let Err(e) = child.kill().await {
            debug!("Kill after abort failed: {}", e);
        }
        stderr_task.abort();
        remove_partial_output(output).await;
    }
}

fn drain_stderr(stderr: Option<tokio::process::ChildStderr>) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut tail = DiagnosticTail::default();
        if let Some(stderr) = stderr {
            // Raw lines: paths in diagnostics need not be UTF-8
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => tail.push(&String::from_utf8_lossy(&buf)),
                    Err(e) => {
                        debug!("Diagnostic stream closed with error: {}", e);
                        break;
                    }
                }
            }
        }
        tail.into_lines()
    })
}

#[async_trait]
impl EncodePort for FFmpegAdapter {
    async fn encode(
        &self,
        job: &EncodeJob,
        progress: UnboundedSender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> EncodeOutcome {
        if cancel.is_cancelled() {
            return EncodeOutcome::Failed(EncodeFailure::Cancelled);
        }

        if let Err(e) = tokio::fs::create_dir_all(&job.settings.output_directory).await {
            return EncodeOutcome::Failed(EncodeFailure::Unknown(format!(
                "cannot create output directory {}: {}",
                job.settings.output_directory.display(),
                e
            )));
        }

        let cmd = ToolCommand::encode(&self.ffmpeg, job);
        debug!("Running: {}", cmd);
        let mut child = match spawnable(&cmd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return EncodeOutcome::Failed(EncodeFailure::ToolCrashed(format!(
                    "failed to launch {}: {}",
                    self.ffmpeg.display(),
                    e
                )))
            }
        };

        info!(
            "Encoding segment {} ({} + {})",
            job.range.index,
            format_hms_millis(job.range.start_seconds),
            format_hms_millis(job.range.length_seconds)
        );

        let stderr_task = drain_stderr(child.stderr.take());
        let mut tracker = RangeProgress::new(job.range.length_seconds);

        if let Some(stdout) = child.stdout.take() {
            let interrupted = self
                .follow_progress(stdout, job, &mut tracker, &progress, &cancel)
                .await;
            if let Some(cause) = interrupted {
                Self::abort(&mut child, stderr_task, &job.output_path).await;
                return EncodeOutcome::Failed(cause);
            }
        }

        // Progress is over; the exit itself is held to the same watchdog
        let waited = tokio::select! {
            status = tokio::time::timeout(self.stall_timeout, child.wait()) => Some(status),
            _ = cancel.cancelled() => None,
        };
        let status = match waited {
            Some(Ok(Ok(status))) => status,
            Some(Err(_)) => {
                warn!(
                    "Range {} did not exit within {}s of its last progress",
                    job.range.index,
                    self.stall_timeout.as_secs()
                );
                Self::abort(&mut child, stderr_task, &job.output_path).await;
                return EncodeOutcome::Failed(EncodeFailure::Timeout(self.stall_timeout.as_secs()));
            }
            Some(Ok(Err(e))) => {
                Self::abort(&mut child, stderr_task, &job.output_path).await;
                return EncodeOutcome::Failed(EncodeFailure::ToolCrashed(format!(
                    "lost track of transcoder process: {}",
                    e
                )));
            }
            None => {
                Self::abort(&mut child, stderr_task, &job.output_path).await;
                return EncodeOutcome::Failed(EncodeFailure::Cancelled);
            }
        };

        let diagnostics = stderr_task.await.unwrap_or_default();
        let exit = ToolExit {
            code: status.code(),
            diagnostics,
        };
        let size = tokio::fs::metadata(&job.output_path)
            .await
            .ok()
            .map(|m| m.len());

        let outcome = classify_exit(&exit, &job.output_path, size);
        match &outcome {
            EncodeOutcome::Succeeded { .. } => {
                if let Some(fraction) = tracker.complete() {
                    let _ = progress.send(ProgressEvent {
                        index: job.range.index,
                        encoded_seconds: job.range.length_seconds,
                        fraction,
                    });
                }
            }
            EncodeOutcome::Failed(cause) => {
                warn!("Segment {} failed: {}", job.range.index, cause);
                remove_partial_output(&job.output_path).await;
            }
        }
        outcome
    }

    async fn check_available(&self) -> Result<(), DomainError> {
        let cmd = ToolCommand::version(&self.ffmpeg);
        let output = spawnable(&cmd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                DomainError::Probe(ProbeError::ToolUnavailable(format!(
                    "{}: {}",
                    self.ffmpeg.display(),
                    e
                )))
            })?;

        if !output.status.success() {
            return Err(DomainError::Probe(ProbeError::ToolUnavailable(format!(
                "{} -version exited with {}",
                self.ffmpeg.display(),
                output.status
            ))));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(banner) = stdout.lines().next() {
            debug!("{}", banner);
        }
        Ok(())
    }
}
