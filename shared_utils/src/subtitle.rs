//! Subtitle sidecar pipeline
//!
//! Sidecar naming:
//! - `{stem}.srt`       original subtitle next to the media file
//! - `{stem}.utf8.srt`  canonicalized (UTF-8) copy
//! - `{output-stem}.srt` subtitle next to the converted output
//!
//! Legacy 8-bit subtitles are assumed to be Windows-1250. Nothing in here
//! returns an error to the caller: a subtitle problem must never fail the
//! media conversion it belongs to.

use crate::batch::collect_input_files;
use crate::common_utils::{file_name_lossy, file_stem_lossy, has_converted_prefix, has_extension};
use crate::errors::{Result, TranscodeError};
use crate::logging::log_external_tool;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tracing::{error, info};

/// `file --mime-encoding` answers that mean "needs conversion".
pub const LEGACY_ENCODINGS: &[&str] = &["unknown-8bit", "windows-1250"];
pub const LEGACY_SOURCE_CHARSET: &str = "windows-1250";

pub fn is_legacy_encoding(encoding: &str) -> bool {
    LEGACY_ENCODINGS.contains(&encoding.trim())
}

/// External encoding detector and converter.
pub trait SubtitleTools {
    fn detect_encoding(&self, path: &Path) -> Result<String>;
    fn convert_to_utf8(&self, source: &Path, destination: &Path) -> Result<()>;
}

/// `file -b --mime-encoding` + `iconv -f windows-1250 -t UTF-8`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSubtitleTools;

impl SubtitleTools for SystemSubtitleTools {
    fn detect_encoding(&self, path: &Path) -> Result<String> {
        let path_str = path.to_string_lossy();
        let args = ["-b", "--mime-encoding", path_str.as_ref()];
        let start = Instant::now();
        let output = Command::new(crate::tools::FILE).args(args).output()?;
        log_external_tool(
            crate::tools::FILE,
            &args,
            &String::from_utf8_lossy(&output.stderr),
            output.status.code(),
            start.elapsed(),
        );
        if !output.status.success() {
            return Err(TranscodeError::Subtitle(format!(
                "encoding detection failed for {}",
                path.display()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn convert_to_utf8(&self, source: &Path, destination: &Path) -> Result<()> {
        let src = source.to_string_lossy();
        let dst = destination.to_string_lossy();
        let args = [
            "-f",
            LEGACY_SOURCE_CHARSET,
            "-t",
            "UTF-8",
            "-o",
            dst.as_ref(),
            src.as_ref(),
        ];
        let start = Instant::now();
        let output = Command::new(crate::tools::ICONV).args(args).output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        log_external_tool(
            crate::tools::ICONV,
            &args,
            &stderr,
            output.status.code(),
            start.elapsed(),
        );
        if output.status.success() {
            Ok(())
        } else {
            Err(TranscodeError::Subtitle(format!(
                "iconv failed for {}: {}",
                source.display(),
                stderr.trim()
            )))
        }
    }
}

/// Sidecar locations for one media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarPaths {
    pub original: PathBuf,
    pub canonical: PathBuf,
}

impl SidecarPaths {
    pub fn for_media(media: &Path) -> Self {
        Self {
            original: media.with_extension("srt"),
            canonical: media.with_file_name(format!("{}.utf8.srt", file_stem_lossy(media))),
        }
    }
}

/// Subtitle path next to a converted output.
pub fn output_subtitle_path(output: &Path) -> PathBuf {
    output.with_extension("srt")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleOutcome {
    /// No `.srt` sidecar next to the input.
    NoSidecar,
    /// `{stem}.utf8.srt` copied next to the output.
    CopiedCanonical(PathBuf),
    /// Legacy sidecar converted to UTF-8 into the given path.
    Converted(PathBuf),
    /// Acceptable sidecar copied as-is.
    CopiedVerbatim(PathBuf),
    /// Acceptable sidecar, but the target already exists.
    AlreadyPresent(PathBuf),
    /// Acceptable sidecar, nothing to create (subtitles-only mode).
    NotRequired,
    /// Dry run: what would have been written.
    WouldWrite(PathBuf),
    Failed(String),
}

/// Carries the input's subtitle sidecar over to the converted output.
pub fn sync_subtitle(input: &Path, output: &Path, tools: &dyn SubtitleTools) -> SubtitleOutcome {
    let sidecars = SidecarPaths::for_media(input);
    let output_srt = output_subtitle_path(output);

    if sidecars.canonical.exists() {
        return match fs::copy(&sidecars.canonical, &output_srt) {
            Ok(_) => {
                info!("     Subtitle copied: {}", file_name_lossy(&output_srt));
                SubtitleOutcome::CopiedCanonical(output_srt)
            }
            Err(e) => {
                error!("     Error copying subtitle: {}", e);
                SubtitleOutcome::Failed(e.to_string())
            }
        };
    }

    if !sidecars.original.exists() {
        return SubtitleOutcome::NoSidecar;
    }

    let encoding = match tools.detect_encoding(&sidecars.original) {
        Ok(enc) => enc,
        Err(e) => {
            error!("     Error checking/converting subtitle: {}", e);
            return SubtitleOutcome::Failed(e.to_string());
        }
    };

    if is_legacy_encoding(&encoding) {
        return match tools.convert_to_utf8(&sidecars.original, &output_srt) {
            Ok(()) => {
                info!(
                    " --> Subtitle converted and saved: {}",
                    file_name_lossy(&output_srt)
                );
                SubtitleOutcome::Converted(output_srt)
            }
            Err(e) => {
                error!("     Error checking/converting subtitle: {}", e);
                SubtitleOutcome::Failed(e.to_string())
            }
        };
    }

    info!(
        "     Subtitle {} encoding '{}' does not require conversion.",
        sidecars.original.display(),
        encoding
    );
    if output_srt.exists() {
        return SubtitleOutcome::AlreadyPresent(output_srt);
    }
    match fs::copy(&sidecars.original, &output_srt) {
        Ok(_) => {
            info!(
                "     Subtitle copied (UTF-8, no conversion needed): {}",
                file_name_lossy(&output_srt)
            );
            SubtitleOutcome::CopiedVerbatim(output_srt)
        }
        Err(e) => {
            error!("     Error copying UTF-8 subtitle: {}", e);
            SubtitleOutcome::Failed(e.to_string())
        }
    }
}

/// Creates `{stem}.utf8.srt` for one media file when its sidecar is legacy.
pub fn canonicalize_sidecar(
    media: &Path,
    tools: &dyn SubtitleTools,
    dry_run: bool,
) -> SubtitleOutcome {
    let sidecars = SidecarPaths::for_media(media);

    if sidecars.canonical.exists() {
        info!(
            "     Subtitle already exists: {}",
            file_name_lossy(&sidecars.canonical)
        );
        return SubtitleOutcome::AlreadyPresent(sidecars.canonical);
    }
    if !sidecars.original.exists() {
        return SubtitleOutcome::NoSidecar;
    }

    let encoding = match tools.detect_encoding(&sidecars.original) {
        Ok(enc) => enc,
        Err(e) => {
            error!("     Error checking/converting subtitle: {}", e);
            return SubtitleOutcome::Failed(e.to_string());
        }
    };

    if !is_legacy_encoding(&encoding) {
        info!(
            "     Subtitle {} encoding '{}' does not require conversion.",
            file_name_lossy(&sidecars.original),
            encoding
        );
        return SubtitleOutcome::NotRequired;
    }

    if dry_run {
        info!(
            "     DRY RUN: Would convert {} and save as {}",
            file_name_lossy(&sidecars.original),
            file_name_lossy(&sidecars.canonical)
        );
        return SubtitleOutcome::WouldWrite(sidecars.canonical);
    }

    match tools.convert_to_utf8(&sidecars.original, &sidecars.canonical) {
        Ok(()) => {
            info!(
                "     Subtitle converted and saved: {}",
                file_name_lossy(&sidecars.canonical)
            );
            SubtitleOutcome::Converted(sidecars.canonical)
        }
        Err(e) => {
            error!("     Error checking/converting subtitle: {}", e);
            SubtitleOutcome::Failed(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtitleSummary {
    pub files_checked: usize,
    pub subtitles_created: usize,
}

/// Subtitles-only mode over a file or directory tree. Media files that
/// already have a canonical sidecar are not counted as checked.
pub fn convert_subtitles_only(
    input: &Path,
    extensions: &[&str],
    tools: &dyn SubtitleTools,
    dry_run: bool,
) -> SubtitleSummary {
    let mut summary = SubtitleSummary::default();

    for media in collect_input_files(input, extensions) {
        if !has_extension(&media, extensions) || has_converted_prefix(&media) {
            continue;
        }
        match canonicalize_sidecar(&media, tools, dry_run) {
            SubtitleOutcome::AlreadyPresent(_) => continue,
            SubtitleOutcome::Converted(_) | SubtitleOutcome::WouldWrite(_) => {
                summary.subtitles_created += 1
            }
            _ => {}
        }
        summary.files_checked += 1;
    }

    info!("");
    info!("Subtitles Summary:");
    info!("  Files checked: {}", summary.files_checked);
    info!("  Subtitles created: {}", summary.subtitles_created);
    summary
}
