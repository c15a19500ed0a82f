// TOML config adapter - Configuration management using TOML files and environment

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::QualityTier;
use crate::domain::rules::SegmentPlanner;
use crate::utils::logging::{validate_level, LogFormat};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "splitx.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "SPLITX_";

/// Effective splitter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub segment_minutes: u32,
    pub segment_seconds: f64,
    pub quality: QualityTier,
    pub keep_audio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffprobe_path: Option<PathBuf>,
    pub concurrency: usize,
    pub probe_timeout_secs: u64,
    pub stall_timeout_secs: u64,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            segment_minutes: 2,
            segment_seconds: 30.0,
            quality: QualityTier::Medium,
            keep_audio: true,
            output_dir: None,
            ffmpeg_path: None,
            ffprobe_path: None,
            concurrency: 1,
            probe_timeout_secs: 30,
            stall_timeout_secs: 60,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl SplitConfig {
    pub fn nominal_length_seconds(&self) -> f64 {
        SegmentPlanner::nominal_length(self.segment_minutes, self.segment_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }

    /// Worker count, clamped to the number of CPUs
    pub fn effective_concurrency(&self) -> usize {
        let cpus = num_cpus::get().max(1);
        if self.concurrency > cpus {
            warn!(
                requested = self.concurrency,
                cpus, "Concurrency exceeds CPU count, clamping"
            );
            cpus
        } else {
            self.concurrency.max(1)
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.segment_seconds.is_finite() || self.segment_seconds < 0.0 {
            return Err(DomainError::Config(format!(
                "segment_seconds must be a non-negative number (got {})",
                self.segment_seconds
            )));
        }
        if self.nominal_length_seconds() <= 0.0 {
            return Err(DomainError::Config(
                "Segment length must be greater than 0".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(DomainError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.probe_timeout_secs == 0 || self.stall_timeout_secs == 0 {
            return Err(DomainError::Config(
                "timeouts must be greater than 0 seconds".to_string(),
            ));
        }
        validate_level(&self.log_level).map_err(|e| DomainError::Config(e.to_string()))?;
        Ok(())
    }

    /// Serialize to the on-disk format
    pub fn to_toml_string(&self) -> Result<String, DomainError> {
        let file = ConfigFile {
            splitx: self.clone(),
        };
        toml::to_string_pretty(&file)
            .map_err(|e| DomainError::Config(format!("Failed to serialize config: {}", e)))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    splitx: SplitConfig,
}

/// TOML configuration adapter
///
/// Layers defaults, then the config file, then `SPLITX_*` environment
/// variables. CLI overrides are applied by the caller on top.
pub struct TomlConfigAdapter {
    config_file_path: Option<PathBuf>,
}

impl TomlConfigAdapter {
    /// Adapter that looks for `splitx.toml` in the working directory
    pub fn new() -> Self {
        Self {
            config_file_path: None,
        }
    }

    /// Adapter reading an explicit config file, which must exist
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_file_path: Some(path.into()),
        }
    }

    /// Load the layered configuration from disk and the process environment
    pub fn load(&self) -> Result<SplitConfig, DomainError> {
        let mut config = match &self.config_file_path {
            Some(path) => {
                if !path.exists() {
                    return Err(DomainError::Config(format!(
                        "Config file does not exist: {}",
                        path.display()
                    )));
                }
                Self::load_file(path)?
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_file(default_path)?
                } else {
                    debug!("No config file found, using defaults");
                    SplitConfig::default()
                }
            }
        };

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<SplitConfig, DomainError> {
        info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::Config(format!("Failed to read config file: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse TOML content with a `[splitx]` table
    pub fn parse(content: &str) -> Result<SplitConfig, DomainError> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| DomainError::Config(format!("Failed to parse TOML config: {}", e)))?;
        Ok(file.splitx)
    }

    /// Apply `SPLITX_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(config: &mut SplitConfig, lookup: F) -> Result<(), DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut overrides = 0;

        if let Some(v) = var("SEGMENT_MINUTES") {
            config.segment_minutes = parse_env("SEGMENT_MINUTES", &v)?;
            overrides += 1;
        }
        if let Some(v) = var("SEGMENT_SECONDS") {
            config.segment_seconds = parse_env("SEGMENT_SECONDS", &v)?;
            overrides += 1;
        }
        if let Some(v) = var("QUALITY") {
            config.quality = QualityTier::parse(&v)?;
            overrides += 1;
        }
        if let Some(v) = var("KEEP_AUDIO") {
            config.keep_audio = parse_env("KEEP_AUDIO", &v)?;
            overrides += 1;
        }
        if let Some(v) = var("OUTPUT_DIR") {
            config.output_dir = Some(PathBuf::from(v));
            overrides += 1;
        }
        if let Some(v) = var("FFMPEG") {
            config.ffmpeg_path = Some(PathBuf::from(v));
            overrides += 1;
        }
        if let Some(v) = var("FFPROBE") {
            config.ffprobe_path = Some(PathBuf::from(v));
            overrides += 1;
        }
        if let Some(v) = var("CONCURRENCY") {
            config.concurrency = parse_env("CONCURRENCY", &v)?;
            overrides += 1;
        }
        if let Some(v) = var("PROBE_TIMEOUT") {
            config.probe_timeout_secs = parse_env("PROBE_TIMEOUT", &v)?;
            overrides += 1;
        }
        if let Some(v) = var("STALL_TIMEOUT") {
            config.stall_timeout_secs = parse_env("STALL_TIMEOUT", &v)?;
            overrides += 1;
        }
        if let Some(v) = var("LOG_LEVEL") {
            config.log_level = v;
            overrides += 1;
        }
        if let Some(v) = var("LOG_FORMAT") {
            config.log_format = v.parse()?;
            overrides += 1;
        }

        if overrides > 0 {
            debug!("Applied {} environment variable overrides", overrides);
        }
        Ok(())
    }
}

impl Default for TomlConfigAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, DomainError> {
    value.trim().parse().map_err(|_| {
        DomainError::Config(format!(
            "Invalid value for {}{}: {}",
            ENV_PREFIX, name, value
        ))
    })
}
