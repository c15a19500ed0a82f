//! Job runner - supervises the encodes of one segment plan
//!
//! One supervisor task owns every [`EncodeJobState`] of a job. Workers run a
//! single range each, bounded by the configured concurrency, and report back
//! over channels. The caller observes the job through a [`JobHandle`] and
//! never blocks the supervisor.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::EncodePort;
use crate::utils::path::remove_partial_output;
use crate::utils::time::{format_file_size, format_hms};

type Registry = Arc<Mutex<HashMap<JobId, CancellationToken>>>;

/// Notification published by a running job
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// Aggregate snapshot; `overall_progress_fraction` never decreases
    Snapshot(JobResult),
    /// A range reached its terminal state; sent once per range
    RangeFinished(EncodeJobState),
}

/// Caller's view of one running job
pub struct JobHandle {
    id: JobId,
    events: UnboundedReceiver<JobEvent>,
    cancel: CancellationToken,
    task: JoinHandle<JobResult>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Next event, or `None` once the job has finished and the stream is drained
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }

    /// Request cancellation of the whole job
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the final result
    pub async fn wait(self) -> Result<JobResult, DomainError> {
        self.task
            .await
            .map_err(|e| DomainError::InternalError(format!("job supervisor failed: {}", e)))
    }
}

/// Removes the job from the registry when the supervisor exits, however it exits
struct Registration {
    id: JobId,
    registry: Registry,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut active = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.id);
    }
}

/// Runs segment plans against an encode port
pub struct JobRunner {
    encode_port: Arc<dyn EncodePort>,
    concurrency: usize,
    active: Registry,
}

impl JobRunner {
    /// Create a runner; a concurrency of 0 is treated as 1
    pub fn new(encode_port: Arc<dyn EncodePort>, concurrency: usize) -> Self {
        Self {
            encode_port,
            concurrency: concurrency.max(1),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Start executing `plan`; returns immediately
    pub fn start(&self, plan: &SegmentPlan, settings: &EncodeSettings, source_path: &Path) -> JobHandle {
        let id = JobId::new();
        let cancel = CancellationToken::new();
        let jobs: Vec<EncodeJob> = plan
            .ranges()
            .iter()
            .map(|range| EncodeJob::new(*range, source_path, settings))
            .collect();

        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, cancel.clone());
        let registration = Registration {
            id,
            registry: Arc::clone(&self.active),
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let supervisor = Supervisor {
            id,
            jobs,
            encode_port: Arc::clone(&self.encode_port),
            concurrency: self.concurrency,
            cancel: cancel.clone(),
            events: events_tx,
        };
        let task = tokio::spawn(async move {
            let _registration = registration;
            supervisor.run().await
        });

        JobHandle {
            id,
            events: events_rx,
            cancel,
            task,
        }
    }

    /// Cancel a running job by id
    pub fn cancel(&self, id: JobId) -> Result<(), DomainError> {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match active.get(&id) {
            Some(token) => {
                token.cancel();
                Ok(())
            }
            None => Err(DomainError::JobNotFound(id.to_string())),
        }
    }

    /// Ids of jobs whose supervisor is still running
    pub fn active_jobs(&self) -> Vec<JobId> {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.keys().copied().collect()
    }
}

struct Supervisor {
    id: JobId,
    jobs: Vec<EncodeJob>,
    encode_port: Arc<dyn EncodePort>,
    concurrency: usize,
    cancel: CancellationToken,
    events: UnboundedSender<JobEvent>,
}

impl Supervisor {
    async fn run(self) -> JobResult {
        // Workers observe a child token; dropping the supervisor stops them
        let workers = self.cancel.child_token();
        let _workers_guard = workers.clone().drop_guard();

        let mut states: Vec<EncodeJobState> = self
            .jobs
            .iter()
            .map(|job| EncodeJobState::pending(job.range, job.output_path.clone()))
            .collect();
        let mut pending: VecDeque<usize> = (0..self.jobs.len()).collect();
        let mut running = FuturesUnordered::new();
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let mut last_fraction = 0.0_f64;

        info!(job_id = %self.id, ranges = self.jobs.len(), "Job started");
        self.publish(&states, JobStatus::InProgress, &mut last_fraction);

        loop {
            while running.len() < self.concurrency && !self.cancel.is_cancelled() {
                let Some(pos) = pending.pop_front() else {
                    break;
                };
                states[pos].mark_running();
                let job = self.jobs[pos].clone();
                debug!(
                    job_id = %self.id,
                    index = job.range.index,
                    "Dispatching {} - {}",
                    format_hms(job.range.start_seconds),
                    format_hms(job.range.end_seconds())
                );
                let worker = tokio::spawn(run_range(
                    Arc::clone(&self.encode_port),
                    job,
                    progress_tx.clone(),
                    workers.clone(),
                ));
                running.push(async move { (pos, worker.await) });
                self.publish(&states, JobStatus::InProgress, &mut last_fraction);
            }

            if self.cancel.is_cancelled() && !pending.is_empty() {
                self.abandon(&mut pending, &mut states, &mut last_fraction);
            }
            if running.is_empty() {
                break;
            }

            tokio::select! {
                Some(event) = progress_rx.recv() => {
                    if let Some(pos) = states.iter().position(|s| s.range.index == event.index) {
                        if states[pos].advance(event.fraction) {
                            self.publish(&states, JobStatus::InProgress, &mut last_fraction);
                        }
                    }
                }
                Some((pos, joined)) = running.next() => {
                    match joined {
                        Ok(Some(outcome)) => self.finish(pos, outcome, &mut states, &mut last_fraction),
                        Ok(None) => self.withdraw(pos, &mut states, &mut last_fraction),
                        Err(e) => {
                            let outcome = EncodeOutcome::Failed(EncodeFailure::ToolCrashed(format!(
                                "encode worker failed: {}",
                                e
                            )));
                            self.finish(pos, outcome, &mut states, &mut last_fraction);
                        }
                    }
                }
                _ = self.cancel.cancelled(), if !pending.is_empty() => {
                    self.abandon(&mut pending, &mut states, &mut last_fraction);
                }
            }
        }

        let result = self.publish(&states, JobStatus::Completed, &mut last_fraction);
        info!(
            job_id = %self.id,
            "Job finished: {} succeeded, {} failed, {}",
            result.completed_ranges,
            result.failed_ranges.len(),
            format_file_size(result.total_bytes())
        );
        result
    }

    /// Record a worker's terminal outcome exactly once
    fn finish(
        &self,
        pos: usize,
        outcome: EncodeOutcome,
        states: &mut [EncodeJobState],
        last_fraction: &mut f64,
    ) {
        let index = states[pos].range.index;
        let changed = match outcome {
            EncodeOutcome::Succeeded { size_bytes, .. } => {
                info!(
                    job_id = %self.id,
                    index,
                    "Segment {} written ({})",
                    states[pos].output_path.display(),
                    format_file_size(size_bytes)
                );
                states[pos].succeed(size_bytes)
            }
            EncodeOutcome::Failed(cause) => {
                if cause.is_cancelled() {
                    info!(job_id = %self.id, index, "Segment cancelled");
                } else {
                    warn!(job_id = %self.id, index, "Segment failed: {}", cause);
                }
                states[pos].fail(cause)
            }
        };

        if changed {
            let _ = self.events.send(JobEvent::RangeFinished(states[pos].clone()));
            self.publish(states, JobStatus::InProgress, last_fraction);
        }
    }

    /// Dispatched range whose worker saw cancellation before encoding
    fn withdraw(&self, pos: usize, states: &mut [EncodeJobState], last_fraction: &mut f64) {
        debug!(job_id = %self.id, index = states[pos].range.index, "Segment cancelled before launch");
        if states[pos].withdraw() {
            let _ = self.events.send(JobEvent::RangeFinished(states[pos].clone()));
            self.publish(states, JobStatus::InProgress, last_fraction);
        }
    }

    /// Fail every pending range as cancelled without launching it
    fn abandon(
        &self,
        pending: &mut VecDeque<usize>,
        states: &mut [EncodeJobState],
        last_fraction: &mut f64,
    ) {
        if pending.is_empty() {
            return;
        }
        info!(
            job_id = %self.id,
            "Cancellation requested, skipping {} pending segment(s)",
            pending.len()
        );
        while let Some(pos) = pending.pop_front() {
            if states[pos].fail(EncodeFailure::Cancelled) {
                let _ = self.events.send(JobEvent::RangeFinished(states[pos].clone()));
            }
        }
        self.publish(states, JobStatus::InProgress, last_fraction);
    }

    fn publish(&self, states: &[EncodeJobState], status: JobStatus, last_fraction: &mut f64) -> JobResult {
        let mut snapshot = JobResult::from_states(self.id, status, states);
        snapshot.overall_progress_fraction = snapshot.overall_progress_fraction.max(*last_fraction);
        *last_fraction = snapshot.overall_progress_fraction;
        let _ = self.events.send(JobEvent::Snapshot(snapshot.clone()));
        snapshot
    }
}

/// One worker: encode a range and make sure only complete files survive
///
/// Returns `None` when cancellation arrived before the encoder was entered.
async fn run_range(
    encode_port: Arc<dyn EncodePort>,
    job: EncodeJob,
    progress: UnboundedSender<ProgressEvent>,
    cancel: CancellationToken,
) -> Option<EncodeOutcome> {
    if cancel.is_cancelled() {
        return None;
    }

    let outcome = match encode_port.encode(&job, progress, cancel).await {
        EncodeOutcome::Succeeded { output_path, .. } => {
            match tokio::fs::metadata(&output_path).await {
                Ok(meta) if meta.len() > 0 => EncodeOutcome::Succeeded {
                    output_path,
                    size_bytes: meta.len(),
                },
                _ => {
                    remove_partial_output(&output_path).await;
                    EncodeOutcome::Failed(EncodeFailure::Unknown(format!(
                        "reported success but {} is missing or empty",
                        output_path.display()
                    )))
                }
            }
        }
        EncodeOutcome::Failed(cause) => {
            remove_partial_output(&job.output_path).await;
            EncodeOutcome::Failed(cause)
        }
    };
    Some(outcome)
}
