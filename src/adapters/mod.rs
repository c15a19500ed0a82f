// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod probe_ffprobe;
pub mod toml_config;

// Re-export adapters
pub use exec_ffmpeg::FFmpegAdapter;
pub use probe_ffprobe::FFprobeAdapter;
pub use toml_config::{SplitConfig, TomlConfigAdapter};

use std::process::Stdio;

use crate::engine::ToolCommand;

/// Process builder shared by the tool adapters
///
/// The child never reads stdin, is killed if its handle is dropped, and on
/// Windows does not open a console window.
pub(crate) fn spawnable(cmd: &ToolCommand) -> tokio::process::Command {
    let mut command = tokio::process::Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    command
}
