//! External tool detection

use crate::errors::{Result, TranscodeError};
use tracing::warn;

pub const FFPROBE: &str = "ffprobe";
pub const FFMPEG: &str = "ffmpeg";
/// Character-encoding detector used for subtitle sidecars.
pub const FILE: &str = "file";
pub const ICONV: &str = "iconv";

pub fn is_tool_available(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Fails on the first missing tool.
pub fn require_tools(names: &[&str]) -> Result<()> {
    match names.iter().find(|name| !is_tool_available(name)) {
        Some(missing) => Err(TranscodeError::ToolNotFound(format!(
            "{} (install ffmpeg / coreutils and make sure it is on PATH)",
            missing
        ))),
        None => Ok(()),
    }
}

/// Logs a warning for every missing tool and reports whether all exist.
pub fn warn_missing_tools(names: &[&str]) -> bool {
    let mut all_present = true;
    for name in names {
        if !is_tool_available(name) {
            warn!("     '{}' not found on PATH, subtitle encoding conversion disabled", name);
            all_present = false;
        }
    }
    all_present
}
