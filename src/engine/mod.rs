//! Transcoder-facing logic that does not touch processes
//!
//! Argument construction, progress parsing and exit classification live here
//! so a change in the external tool's format only touches this module.

pub mod command;
pub mod outcome;
pub mod progress;

pub use command::ToolCommand;
pub use outcome::{classify_exit, classify_failure, DiagnosticTail, ToolExit};
pub use progress::{parse_progress_line, ProgressLine, RangeProgress};
