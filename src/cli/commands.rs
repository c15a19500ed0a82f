//! Command implementations

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::{SplitConfig, TomlConfigAdapter};
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::app::job_runner::{JobEvent, JobHandle};
use crate::cli::args::{PlanArgs, ProbeArgs, SplitArgs};
use crate::cli::{Cli, Commands};
use crate::domain::errors::DomainError;
use crate::domain::model::{
    EncodeJobState, EncodeSettings, JobResult, RangeStatus, SegmentPlan, SourceMedia,
};
use crate::domain::rules::{OutputNaming, SegmentPlanner};
use crate::error::{SplitXError, SplitXResult};
use crate::utils::path::resolve_output_dir;
use crate::utils::time::{format_file_size, format_hms, format_hms_millis};

/// Resolve configuration: CLI > environment > file > defaults
///
/// Command-specific flags are applied later by each command.
pub fn load_config(cli: &Cli) -> SplitXResult<SplitConfig> {
    let adapter = match &cli.config {
        Some(path) => TomlConfigAdapter::with_file(path),
        None => TomlConfigAdapter::new(),
    };
    let mut config = adapter.load()?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

/// Dispatch a parsed command
pub async fn run(command: Commands, config: SplitConfig) -> SplitXResult<()> {
    match command {
        Commands::Split(args) => split(args, config).await,
        Commands::Probe(args) => probe(args, config).await,
        Commands::Plan(args) => plan(args, config).await,
        Commands::Config => show_config(&config),
    }
}

/// Execute the split command
pub async fn split(args: SplitArgs, mut config: SplitConfig) -> SplitXResult<()> {
    args.apply_to(&mut config);
    let container = DefaultAppContainer::new(&config)?;
    let service = container.split_interactor();

    let source = service.probe(&args.input).await?;
    let plan = service.plan(&source, config.nominal_length_seconds())?;
    let output_dir = resolve_output_dir(config.output_dir.as_deref(), &source.path);
    let settings = EncodeSettings::new(config.quality, config.keep_audio, output_dir);

    let handle = service.execute(&plan, &settings, &source.path).await?;
    let mut result = follow_job(handle, plan.len()).await?;

    let interrupted = result.failed_ranges.iter().any(|f| f.cause.is_cancelled());
    if args.retry_failed && !interrupted {
        if let Some(handle) = service
            .retry_failed(&plan, &result, &settings, &source.path)
            .await?
        {
            let retried = follow_job(handle, result.failed_ranges.len()).await?;
            result = result.merged_with(&retried);
        }
    }

    if args.json {
        print_json(&result)?;
    } else {
        print_summary(&result, &settings);
    }

    if result.is_aborted() {
        return Err(SplitXError::Aborted);
    }
    if !result.failed_ranges.is_empty() {
        return Err(SplitXError::PartialFailure {
            failed: result.failed_ranges.len(),
            total: result.ranges.len(),
        });
    }
    Ok(())
}

/// Execute the probe command
pub async fn probe(args: ProbeArgs, mut config: SplitConfig) -> SplitXResult<()> {
    args.tools.apply_to(&mut config);
    let container = DefaultAppContainer::new(&config)?;
    let source = container.split_interactor().probe(&args.input).await?;

    if args.json {
        print_json(&source)?;
    } else {
        display_source(&source);
    }
    Ok(())
}

#[derive(Serialize)]
struct PlannedSegment {
    index: usize,
    start_seconds: f64,
    length_seconds: f64,
    output_file: String,
}

#[derive(Serialize)]
struct PlanReport {
    total_duration_seconds: f64,
    nominal_length_seconds: f64,
    segments: Vec<PlannedSegment>,
}

/// Execute the plan command
pub async fn plan(args: PlanArgs, mut config: SplitConfig) -> SplitXResult<()> {
    args.length.apply_to(&mut config);
    args.tools.apply_to(&mut config);
    config.validate()?;
    let nominal = config.nominal_length_seconds();

    let (plan, source_path) = match (&args.duration, &args.input) {
        (Some(duration), _) => (
            SegmentPlanner::plan(*duration, nominal).map_err(DomainError::from)?,
            None,
        ),
        (None, Some(input)) => {
            let container = DefaultAppContainer::new(&config)?;
            let service = container.split_interactor();
            let source = service.probe(input).await?;
            (service.plan(&source, nominal)?, Some(source.path))
        }
        (None, None) => {
            return Err(DomainError::BadArgs(
                "either --input or --duration is required".to_string(),
            )
            .into())
        }
    };

    let report = plan_report(&plan, source_path.as_deref());
    if args.json {
        print_json(&report)?;
    } else {
        println!(
            "{} segment(s) of {} covering {}",
            report.segments.len(),
            format_hms_millis(report.nominal_length_seconds),
            format_hms_millis(report.total_duration_seconds)
        );
        for segment in &report.segments {
            println!(
                "  {:>3}  {} - {}  {}",
                segment.index,
                format_hms_millis(segment.start_seconds),
                format_hms_millis(segment.start_seconds + segment.length_seconds),
                segment.output_file
            );
        }
    }
    Ok(())
}

/// Print the effective configuration
pub fn show_config(config: &SplitConfig) -> SplitXResult<()> {
    config.validate()?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn plan_report(plan: &SegmentPlan, source: Option<&Path>) -> PlanReport {
    let source = source.unwrap_or_else(|| Path::new("video"));
    PlanReport {
        total_duration_seconds: plan.total_duration_seconds(),
        nominal_length_seconds: plan.nominal_length_seconds(),
        segments: plan
            .ranges()
            .iter()
            .map(|range| PlannedSegment {
                index: range.index,
                start_seconds: range.start_seconds,
                length_seconds: range.length_seconds,
                output_file: OutputNaming::segment_file_name(source, range.index),
            })
            .collect(),
    }
}

/// Drain a job's events, rendering progress on stderr; Ctrl-C cancels the job
async fn follow_job(mut handle: JobHandle, total: usize) -> SplitXResult<JobResult> {
    let token = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling job");
            token.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        match event {
            JobEvent::Snapshot(snapshot) => render_progress(&snapshot, total),
            JobEvent::RangeFinished(state) => render_finished(&state),
        }
    }
    interrupt.abort();

    let result = handle.wait().await?;
    eprintln!();
    info!(job_id = %result.job_id, "Job complete");
    Ok(result)
}

fn render_progress(snapshot: &JobResult, total: usize) {
    let finished = snapshot.completed_ranges + snapshot.failed_ranges.len();
    let mut stderr = std::io::stderr();
    let _ = write!(
        stderr,
        "\r[{:>5.1}%] {}/{} segment(s) finished",
        snapshot.overall_progress_fraction * 100.0,
        finished,
        total
    );
    let _ = stderr.flush();
}

fn render_finished(state: &EncodeJobState) {
    match state.status {
        RangeStatus::Succeeded => eprintln!(
            "\r  segment {:>3} done   {} ({})",
            state.range.index,
            state.output_path.display(),
            format_file_size(state.file_size_bytes.unwrap_or(0))
        ),
        _ => {
            let cause = state
                .error_cause
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_default();
            eprintln!("\r  segment {:>3} failed {}", state.range.index, cause);
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> SplitXResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn display_source(source: &SourceMedia) {
    println!("File:     {}", source.path.display());
    println!(
        "Duration: {} ({:.3}s)",
        format_hms_millis(source.total_duration_seconds),
        source.total_duration_seconds
    );
    if let Some(format) = &source.format_name {
        println!("Format:   {}", format);
    }
    println!("Audio:    {}", if source.has_audio { "yes" } else { "no" });
}

fn print_summary(result: &JobResult, settings: &EncodeSettings) {
    println!(
        "Created {} of {} segment(s) in {}",
        result.completed_ranges,
        result.ranges.len(),
        settings.output_directory.display()
    );
    for file in &result.produced_files {
        println!(
            "  {:>3}  {}  {}  {}",
            file.index,
            format_hms(file.duration_seconds),
            format_file_size(file.size_bytes),
            file.path.display()
        );
    }
    if !result.failed_ranges.is_empty() {
        println!("Failed:");
        for failure in &result.failed_ranges {
            println!(
                "  {:>3}  {} - {}  {}",
                failure.index,
                format_hms(failure.start_seconds),
                format_hms(failure.start_seconds + failure.length_seconds),
                failure.cause
            );
        }
    }
    println!("Total size: {}", format_file_size(result.total_bytes()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_report_names_segments_after_source() {
        let plan = SegmentPlanner::plan(320.0, 140.0).unwrap();
        let report = plan_report(&plan, Some(Path::new("/v/holiday.mov")));
        let names: Vec<&str> = report.segments.iter().map(|s| s.output_file.as_str()).collect();
        assert_eq!(
            names,
            vec!["holiday_part_001.mp4", "holiday_part_002.mp4", "holiday_part_003.mp4"]
        );
        assert_eq!(report.segments[2].length_seconds, 40.0);
    }

    #[test]
    fn test_plan_report_without_source() {
        let plan = SegmentPlanner::plan(140.0, 140.0).unwrap();
        let report = plan_report(&plan, None);
        assert_eq!(report.segments.len(), 1);
        assert_eq!(report.segments[0].output_file, "video_part_001.mp4");
    }
}
