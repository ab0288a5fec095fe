use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use shared_utils::batch::SUPPORTED_VIDEO_EXTENSIONS;
use shared_utils::cli_runner::{run_auto_command, CliRunnerConfig};
use shared_utils::ffmpeg_process::FfmpegRunner;
use shared_utils::ffprobe::Ffprobe;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::subtitle::{convert_subtitles_only, SystemSubtitleTools};
use shared_utils::tools::{require_tools, warn_missing_tools, FFMPEG, FFPROBE, FILE, ICONV};
use vid_transcode::{
    load_settings, print_media_info, transcode_file, CliOverrides, PolicyConfig, TranscodeContext,
};

#[derive(Parser)]
#[command(name = "vid-transcode")]
#[command(
    version,
    about = "Batch video converter: re-encodes legacy video/audio codecs with ffmpeg",
    long_about = None
)]
struct Cli {
    /// Video file or directory (searched recursively)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Only print codec and bitrate information
    #[arg(short, long = "info")]
    info: bool,

    /// Only convert legacy-encoded .srt subtitles to UTF-8
    #[arg(short, long)]
    subs_only: bool,

    /// Append log output to this file instead of stdout
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Show what would be converted without running ffmpeg
    #[arg(long)]
    dry_run: bool,

    /// Always write MP4 output, even for MKV sources
    #[arg(long)]
    output_mp4: bool,

    /// Re-encode video above this bitrate in kbps (0 = no limit)
    #[arg(long, value_name = "KBPS")]
    max_video_bitrate: Option<u32>,

    /// Constant rate factor for the video encoder
    #[arg(long, value_name = "N")]
    crf: Option<u8>,

    /// Re-encode all audio and video streams regardless of codec
    #[arg(long)]
    force: bool,

    /// TOML file overriding the built-in codec policy
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    if std::env::args_os().len() <= 1 {
        return match Cli::command().print_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    let cli = Cli::parse();

    let mut log_config = LogConfig::default();
    if let Some(path) = &cli.log {
        log_config = log_config.with_log_file(path);
    }
    if let Err(e) = init_logging(log_config) {
        eprintln!("Could not initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(input) = cli.input else {
        anyhow::bail!("No input path given");
    };
    if !input.exists() {
        anyhow::bail!("Input path does not exist: {}", input.display());
    }

    let settings = cli.config.as_deref().map(load_settings).transpose()?;
    let config = PolicyConfig::resolve(
        settings,
        &CliOverrides {
            crf: cli.crf.map(|crf| crf.to_string()),
            max_video_bitrate_kbps: cli.max_video_bitrate,
            force: cli.force,
            force_mp4: cli.output_mp4,
        },
    )?;

    if cli.info {
        require_tools(&[FFPROBE])?;
        print_media_info(&input, &Ffprobe);
        return Ok(());
    }

    if cli.subs_only {
        warn_missing_tools(&[FILE, ICONV]);
        convert_subtitles_only(
            &input,
            SUPPORTED_VIDEO_EXTENSIONS,
            &SystemSubtitleTools,
            cli.dry_run,
        );
        return Ok(());
    }

    if cli.dry_run {
        require_tools(&[FFPROBE])?;
    } else {
        require_tools(&[FFPROBE, FFMPEG])?;
    }
    warn_missing_tools(&[FILE, ICONV]);

    if config.force_mode {
        info!(" ===> FORCE mode enabled: all audio and video streams will be re-encoded.");
    }
    info!(
        "   Video: {} (CRF {}), audio: {}",
        config.output_video_codec, config.crf, config.output_audio_codec
    );
    if config.max_video_bitrate_kbps > 0 {
        info!("   Max video bitrate: {} kbps", config.max_video_bitrate_kbps);
    }
    if config.force_mp4 {
        info!("   Output container: MP4");
    }
    info!("");

    let ctx = TranscodeContext {
        config: &config,
        probe: &Ffprobe,
        encoder: &FfmpegRunner,
        subtitles: &SystemSubtitleTools,
        dry_run: cli.dry_run,
    };

    run_auto_command(
        CliRunnerConfig {
            input,
            extensions: SUPPORTED_VIDEO_EXTENSIONS,
            label: "vid-transcode".to_string(),
            encoder_threads: config.encoder_threads,
            dry_run: cli.dry_run,
        },
        |file| transcode_file(file, &ctx),
    )?;

    Ok(())
}
