// Application layer - Use case interactors

pub mod container;
pub mod job_runner;
pub mod split_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use job_runner::{JobEvent, JobHandle, JobRunner};
pub use split_interactor::SplitInteractor;
