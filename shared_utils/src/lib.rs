//! Shared Utilities for the vid-transcode tools
//!
//! - FFprobe wrapper producing one stream descriptor per file
//! - FFmpeg process runner
//! - Subtitle sidecar pipeline (`file` / `iconv`)
//! - Batch collection, CLI runner and summary report
//! - Logging, error types, encoder thread sizing, external tool detection

pub mod batch;
pub mod cli_runner;
pub mod common_utils;
pub mod errors;
pub mod ffmpeg_process;
pub mod ffprobe;
pub mod logging;
pub mod report;
pub mod subtitle;
pub mod thread_manager;
pub mod tools;

pub use batch::{collect_input_files, BatchResult, SUPPORTED_VIDEO_EXTENSIONS};
pub use cli_runner::{run_auto_command, run_batch, CliProcessingResult, CliRunnerConfig};
pub use errors::{Result, TranscodeError};
pub use ffmpeg_process::{EncodeCommand, EncoderRunner, FfmpegRunner};
pub use ffprobe::{Ffprobe, MediaProbe, StreamDescriptor};
pub use logging::{init_logging, LogConfig};
pub use subtitle::{sync_subtitle, SubtitleOutcome, SubtitleTools, SystemSubtitleTools};
