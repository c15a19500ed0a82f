// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for querying a source file's duration
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe the file and return it as a probed source
    ///
    /// Never retries; a failure here is a precondition failure.
    async fn probe(&self, path: &Path) -> Result<SourceMedia, ProbeError>;
}

/// Port for the external transcoder
///
/// One call encodes one range into one output file. Implementations own the
/// process for the duration of the call and must release it on every exit
/// path, including when `cancel` fires.
#[async_trait]
pub trait EncodePort: Send + Sync {
    /// Encode a single range, streaming progress until a terminal outcome
    async fn encode(
        &self,
        job: &EncodeJob,
        progress: UnboundedSender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> EncodeOutcome;

    /// Check that the transcoder can be launched
    async fn check_available(&self) -> Result<(), DomainError>;
}
