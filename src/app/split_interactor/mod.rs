// Split interactor - Orchestrates the probe, plan and encode use case

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::app::job_runner::{JobHandle, JobRunner};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;
use crate::utils::time::format_hms;

/// Interactor for splitting a video into fixed-length segments
pub struct SplitInteractor {
    probe_port: Arc<dyn ProbePort>,
    encode_port: Arc<dyn EncodePort>,
    runner: JobRunner,
}

impl SplitInteractor {
    /// Create new split interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        encode_port: Arc<dyn EncodePort>,
        concurrency: usize,
    ) -> Self {
        let runner = JobRunner::new(Arc::clone(&encode_port), concurrency);
        Self {
            probe_port,
            encode_port,
            runner,
        }
    }

    /// Establish the source duration
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn probe(&self, path: &Path) -> Result<SourceMedia, DomainError> {
        let source = self.probe_port.probe(path).await?;
        info!(
            "Source duration {} ({:.3}s)",
            format_hms(source.total_duration_seconds),
            source.total_duration_seconds
        );
        Ok(source)
    }

    /// Compute the ranges for a probed source
    pub fn plan(
        &self,
        source: &SourceMedia,
        nominal_length_seconds: f64,
    ) -> Result<SegmentPlan, DomainError> {
        let plan = SegmentPlanner::plan_source(source, nominal_length_seconds)?;
        info!(
            "Planned {} segment(s) of {} from {}",
            plan.len(),
            format_hms(nominal_length_seconds),
            source.path.display()
        );
        Ok(plan)
    }

    /// Start encoding every range of `plan`
    ///
    /// Fails before anything is launched when the plan is empty, the
    /// transcoder cannot be started or the output directory cannot be created.
    pub async fn execute(
        &self,
        plan: &SegmentPlan,
        settings: &EncodeSettings,
        source_path: &Path,
    ) -> Result<JobHandle, DomainError> {
        if plan.is_empty() {
            return Err(DomainError::BadArgs("segment plan has no ranges".to_string()));
        }
        self.encode_port.check_available().await?;
        tokio::fs::create_dir_all(&settings.output_directory)
            .await
            .map_err(|e| {
                DomainError::FsFail(format!(
                    "cannot create output directory {}: {}",
                    settings.output_directory.display(),
                    e
                ))
            })?;

        let handle = self.runner.start(plan, settings, source_path);
        info!(
            job_id = %handle.id(),
            "Writing {} segment(s) to {}",
            plan.len(),
            settings.output_directory.display()
        );
        Ok(handle)
    }

    /// Probe, plan and start in one step
    pub async fn split(
        &self,
        source_path: &Path,
        nominal_length_seconds: f64,
        settings: &EncodeSettings,
    ) -> Result<(SegmentPlan, JobHandle), DomainError> {
        let source = self.probe(source_path).await?;
        let plan = self.plan(&source, nominal_length_seconds)?;
        let handle = self.execute(&plan, settings, &source.path).await?;
        Ok((plan, handle))
    }

    /// Cancel a running job
    pub fn cancel(&self, job_id: JobId) -> Result<(), DomainError> {
        self.runner.cancel(job_id)
    }

    pub fn active_jobs(&self) -> Vec<JobId> {
        self.runner.active_jobs()
    }

    /// Re-submit only the failed ranges of a finished job
    ///
    /// Ranges keep their original index and output name. Returns `None` when
    /// nothing failed.
    pub async fn retry_failed(
        &self,
        plan: &SegmentPlan,
        result: &JobResult,
        settings: &EncodeSettings,
        source_path: &Path,
    ) -> Result<Option<JobHandle>, DomainError> {
        let failed = result.failed_indices();
        if failed.is_empty() {
            return Ok(None);
        }
        let retry_plan = plan.subset(&failed);
        if retry_plan.len() != failed.len() {
            return Err(DomainError::BadArgs(format!(
                "job {} has failed ranges that are not part of the given plan",
                result.job_id
            )));
        }
        info!("Retrying segment(s) {:?}", failed);
        self.execute(&retry_plan, settings, source_path)
            .await
            .map(Some)
    }
}
