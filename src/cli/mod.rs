//! CLI module for SplitX
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::logging::LogFormat;

pub mod args;
pub mod commands;

/// SplitX video splitter
///
/// Splits a video into fixed-length MP4 segments by running ffmpeg once per
/// segment, with live progress and per-segment failure reporting.
#[derive(Parser, Debug)]
#[command(name = "splitter")]
#[command(about = "SplitX - Split a video into fixed-length segments")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Configuration file (default: ./splitx.toml if present)
    #[arg(long, global = true, env = "SPLITX_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a video into segments
    Split(args::SplitArgs),
    /// Report the duration of a video file
    Probe(args::ProbeArgs),
    /// Show the segments a split would produce without encoding
    Plan(args::PlanArgs),
    /// Print the effective configuration as TOML
    Config,
}
