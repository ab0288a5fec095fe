//! Video Conversion API Module
//!
//! Per-file pipeline: classify → probe once → policy → synthesize → run the
//! encoder → carry the subtitle over. External tools are reached only
//! through the [`MediaProbe`], [`EncoderRunner`] and [`SubtitleTools`] seams.

use crate::command::synthesize;
use crate::config::PolicyConfig;
use crate::policy::{evaluate, Verdict};
use anyhow::Context;
use shared_utils::batch::{collect_input_files, SUPPORTED_VIDEO_EXTENSIONS};
use shared_utils::cli_runner::CliProcessingResult;
use shared_utils::common_utils::{
    converted_output_path, get_extension_lowercase, has_converted_prefix, has_extension,
};
use shared_utils::ffmpeg_process::EncoderRunner;
use shared_utils::ffprobe::{MediaProbe, StreamDescriptor};
use shared_utils::subtitle::{sync_subtitle, SubtitleTools};
use std::path::{Path, PathBuf};
use tracing::info;

/// Collaborators and switches shared by every file of a run.
pub struct TranscodeContext<'a> {
    pub config: &'a PolicyConfig,
    pub probe: &'a dyn MediaProbe,
    pub encoder: &'a dyn EncoderRunner,
    pub subtitles: &'a dyn SubtitleTools,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyConverted,
    UnsupportedExtension,
    OutputExists,
    UndetectableCodec,
    AlreadyCorrect,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyConverted => "already converted",
            SkipReason::UnsupportedExtension => "unsupported extension",
            SkipReason::OutputExists => "output exists",
            SkipReason::UndetectableCodec => "could not detect codecs",
            SkipReason::AlreadyCorrect => "already in correct format",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Skipped(SkipReason),
    Converted {
        input: PathBuf,
        output: PathBuf,
        /// Descriptor of the source, as probed before conversion.
        original: StreamDescriptor,
        dry_run: bool,
    },
}

impl CliProcessingResult for FileOutcome {
    fn skip_reason(&self) -> Option<&str> {
        match self {
            FileOutcome::Skipped(reason) => Some(reason.as_str()),
            FileOutcome::Converted { .. } => None,
        }
    }

    fn summary(&self) -> String {
        match self {
            FileOutcome::Skipped(reason) => reason.as_str().to_string(),
            FileOutcome::Converted {
                input, original, ..
            } => format!(
                "{} (Video was: {}, audio was: {}, bitrate was: {:.2} kbps)",
                input.display(),
                original.video_codec.as_deref().unwrap_or("N/A"),
                original.audio_codec.as_deref().unwrap_or("N/A"),
                original.video_bitrate_kbps
            ),
        }
    }
}

/// `conv-{stem}.mkv` for mkv sources unless MP4 is forced, `conv-{stem}.mp4`
/// otherwise; always next to the input.
pub fn output_path_for(input: &Path, force_mp4: bool) -> PathBuf {
    let ext = if !force_mp4 && get_extension_lowercase(input) == "mkv" {
        "mkv"
    } else {
        "mp4"
    };
    converted_output_path(input, ext)
}

/// Runs one file through the pipeline. Only an encoder failure is an error;
/// everything else ends in [`FileOutcome`].
pub fn transcode_file(input: &Path, ctx: &TranscodeContext<'_>) -> anyhow::Result<FileOutcome> {
    if has_converted_prefix(input) {
        info!(
            "     File {} has already been converted (starts with 'conv-')",
            input.display()
        );
        return Ok(FileOutcome::Skipped(SkipReason::AlreadyConverted));
    }

    if !has_extension(input, SUPPORTED_VIDEO_EXTENSIONS) {
        return Ok(FileOutcome::Skipped(SkipReason::UnsupportedExtension));
    }

    let output = output_path_for(input, ctx.config.force_mp4);
    if output.exists() {
        info!(
            "     File {} has already been converted (output {} exists)",
            input.display(),
            output.display()
        );
        return Ok(FileOutcome::Skipped(SkipReason::OutputExists));
    }

    let descriptor = ctx.probe.probe(input);

    if ctx.dry_run {
        if let Some((video, audio)) = descriptor.detected_codecs() {
            info!("");
            info!("DRY-RUN: Checking {}", input.display());
            info!("     Detected codecs: video={}, audio={}", video, audio);
        }
    }

    let decision = match evaluate(&descriptor, ctx.config) {
        Verdict::Undetectable => {
            info!("     Skipping {} (could not detect codecs)", input.display());
            return Ok(FileOutcome::Skipped(SkipReason::UndetectableCodec));
        }
        Verdict::AlreadyCorrect => {
            info!("     File {} already in correct format.", input.display());
            return Ok(FileOutcome::Skipped(SkipReason::AlreadyCorrect));
        }
        Verdict::Convert(decision) => decision,
    };

    let command = synthesize(input, &output, &decision, &descriptor, ctx.config);

    if ctx.dry_run {
        let reasons: Vec<String> = decision.reasons.iter().map(ToString::to_string).collect();
        info!("---> It would convert this file due to: {}", reasons.join(", "));
        info!("     DRY RUN: Would run: {}", command.display());
        return Ok(FileOutcome::Converted {
            input: input.to_path_buf(),
            output,
            original: descriptor,
            dry_run: true,
        });
    }

    ctx.encoder
        .run(&command)
        .with_context(|| format!("Error converting file {}", input.display()))?;

    let status = |convert: bool, codec: &Option<String>| {
        if convert {
            codec.clone().unwrap_or_default()
        } else {
            "OK".to_string()
        }
    };
    info!(
        " --> File {} has been converted (video was: {}, audio was: {})",
        output.display(),
        status(decision.convert_video, &descriptor.video_codec),
        status(decision.convert_audio, &descriptor.audio_codec)
    );

    sync_subtitle(input, &output, ctx.subtitles);

    Ok(FileOutcome::Converted {
        input: input.to_path_buf(),
        output,
        original: descriptor,
        dry_run: false,
    })
}

/// Info-only mode: codecs and bitrate of a file, or of every recognised
/// source file under a directory.
pub fn print_media_info(input: &Path, probe: &dyn MediaProbe) -> Vec<(PathBuf, StreamDescriptor)> {
    let files: Vec<PathBuf> = if input.is_dir() {
        collect_input_files(input, SUPPORTED_VIDEO_EXTENSIONS)
            .into_iter()
            .filter(|f| !has_converted_prefix(f))
            .collect()
    } else {
        vec![input.to_path_buf()]
    };

    files
        .into_iter()
        .map(|file| {
            let descriptor = probe.probe(&file);
            info!("{}", file.display());
            info!(
                "  video codec: {}",
                descriptor.video_codec.as_deref().unwrap_or("None")
            );
            info!(
                "  audio codec: {}",
                descriptor.audio_codec.as_deref().unwrap_or("None")
            );
            info!("  bitrate (kbps): {}", descriptor.video_bitrate_kbps);
            (file, descriptor)
        })
        .collect()
}
