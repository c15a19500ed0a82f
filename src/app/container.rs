use std::sync::Arc;

use crate::adapters::{FFmpegAdapter, FFprobeAdapter, SplitConfig};
use crate::app::split_interactor::SplitInteractor;
use crate::domain::errors::DomainError;
use crate::ports::{EncodePort, ProbePort};
use crate::utils::path::{resolve_ffmpeg, resolve_ffprobe};

pub trait AppContainer: Send + Sync {
    fn split_interactor(&self) -> Arc<SplitInteractor>;
}

pub struct DefaultAppContainer {
    split_interactor: Arc<SplitInteractor>,
}

impl DefaultAppContainer {
    /// Wire the ffmpeg adapters from a validated configuration
    pub fn new(config: &SplitConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let ffmpeg = resolve_ffmpeg(config.ffmpeg_path.as_deref());
        let ffprobe = resolve_ffprobe(config.ffprobe_path.as_deref(), config.ffmpeg_path.as_deref());

        let probe_port = Arc::new(FFprobeAdapter::new(
            ffprobe,
            ffmpeg.clone(),
            config.probe_timeout(),
        ));
        let encode_port = Arc::new(FFmpegAdapter::new(ffmpeg, config.stall_timeout()));

        Ok(Self::with_ports(
            probe_port as Arc<dyn ProbePort>,
            encode_port as Arc<dyn EncodePort>,
            config.effective_concurrency(),
        ))
    }

    /// Wire arbitrary port implementations
    pub fn with_ports(
        probe_port: Arc<dyn ProbePort>,
        encode_port: Arc<dyn EncodePort>,
        concurrency: usize,
    ) -> Self {
        let split_interactor = Arc::new(SplitInteractor::new(probe_port, encode_port, concurrency));
        Self { split_interactor }
    }
}

impl AppContainer for DefaultAppContainer {
    fn split_interactor(&self) -> Arc<SplitInteractor> {
        Arc::clone(&self.split_interactor)
    }
}
