//! vid-transcode - batch video transcoding orchestrator
//!
//! Probes every video container under a path, decides per stream whether it
//! has to be re-encoded and drives ffmpeg accordingly:
//! - forced codecs (XviD, DTS, TrueHD by default) are re-encoded
//! - an optional video bitrate ceiling triggers a capped re-encode
//! - everything else is stream-copied
//!
//! ```rust,ignore
//! use vid_transcode::{transcode_file, PolicyConfig, TranscodeContext};
//! use shared_utils::{ffmpeg_process::FfmpegRunner, ffprobe::Ffprobe, subtitle::SystemSubtitleTools};
//!
//! let config = PolicyConfig::default();
//! let ctx = TranscodeContext {
//!     config: &config,
//!     probe: &Ffprobe,
//!     encoder: &FfmpegRunner,
//!     subtitles: &SystemSubtitleTools,
//!     dry_run: false,
//! };
//! transcode_file(std::path::Path::new("movie.avi"), &ctx)?;
//! ```

pub mod audio_args;
pub mod command;
pub mod config;
pub mod conversion_api;
pub mod policy;
pub mod video_args;

pub use command::synthesize;
pub use config::{load_settings, CliOverrides, PolicyConfig, SettingsFile};
pub use conversion_api::{
    output_path_for, print_media_info, transcode_file, FileOutcome, SkipReason, TranscodeContext,
};
pub use policy::{decide, evaluate, CodecRule, ConversionDecision, RuleKind, Verdict};

pub use shared_utils::errors::{Result, TranscodeError};
