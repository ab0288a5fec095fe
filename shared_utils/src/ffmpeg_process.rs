//! FFmpeg process module
//!
//! The encoder is invoked with inherited stdio so its own progress line
//! stays visible to the operator. The orchestrator only waits for the exit
//! status; there is no timeout.

use crate::errors::{Result, TranscodeError};
use crate::logging::log_external_tool;
use std::process::Command;
use std::time::Instant;
use tracing::info;

/// A fully synthesized encoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EncodeCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Space-joined command line, for logs only.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Executes encode commands. Non-zero exit is an error.
pub trait EncoderRunner {
    fn run(&self, command: &EncodeCommand) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegRunner;

impl EncoderRunner for FfmpegRunner {
    fn run(&self, command: &EncodeCommand) -> Result<()> {
        info!("CMD used: {}", command.display());

        let start = Instant::now();
        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::ToolNotFound(command.program.clone())
                } else {
                    TranscodeError::IoError(e)
                }
            })?;

        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
        log_external_tool(&command.program, &args, "", status.code(), start.elapsed());

        if status.success() {
            Ok(())
        } else {
            Err(TranscodeError::EncoderFailed {
                command: command.display(),
                exit_code: status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_program_and_args() {
        let cmd = EncodeCommand::new(
            "ffmpeg",
            vec!["-y".into(), "-i".into(), "in.avi".into(), "conv-in.mp4".into()],
        );
        assert_eq!(cmd.display(), "ffmpeg -y -i in.avi conv-in.mp4");
    }

    #[cfg(unix)]
    #[test]
    fn test_runner_reports_nonzero_exit() {
        let cmd = EncodeCommand::new("false", vec![]);
        match FfmpegRunner.run(&cmd) {
            Err(TranscodeError::EncoderFailed { exit_code, .. }) => assert_eq!(exit_code, Some(1)),
            other => panic!("expected EncoderFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_runner_success() {
        assert!(FfmpegRunner.run(&EncodeCommand::new("true", vec![])).is_ok());
    }

    #[test]
    fn test_runner_missing_program() {
        let cmd = EncodeCommand::new("definitely_not_an_encoder_xyz", vec![]);
        assert!(matches!(
            FfmpegRunner.run(&cmd),
            Err(TranscodeError::ToolNotFound(_))
        ));
    }
}
