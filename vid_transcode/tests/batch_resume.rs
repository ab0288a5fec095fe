//! Re-running over an already processed tree must not convert anything.

use shared_utils::batch::SUPPORTED_VIDEO_EXTENSIONS;
use shared_utils::cli_runner::{run_batch, CliRunnerConfig};
use shared_utils::errors::{Result, TranscodeError};
use shared_utils::ffmpeg_process::{EncodeCommand, EncoderRunner};
use shared_utils::ffprobe::{ChannelCount, MediaProbe, StreamDescriptor};
use shared_utils::subtitle::SubtitleTools;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vid_transcode::{transcode_file, PolicyConfig, TranscodeContext};

/// XviD/AC3 for `.avi`, HEVC/AAC for everything else; fails for `broken*`.
struct NameProbe;

impl MediaProbe for NameProbe {
    fn probe(&self, path: &Path) -> StreamDescriptor {
        let name = path.file_name().unwrap().to_string_lossy();
        if name.starts_with("broken") {
            return StreamDescriptor::default();
        }
        let avi = name.ends_with(".avi");
        StreamDescriptor {
            video_codec: Some(if avi { "MPEG4-XVID" } else { "HEVC" }.into()),
            audio_codec: Some(if avi { "AC3" } else { "AAC" }.into()),
            audio_channels: Some(ChannelCount::Count(2)),
            audio_sample_rate: Some("48000".into()),
            video_bitrate_kbps: 1200.0,
        }
    }
}

/// Writes the output file; fails for sources named `fail*`.
#[derive(Default)]
struct TouchEncoder {
    runs: RefCell<Vec<PathBuf>>,
}

impl EncoderRunner for TouchEncoder {
    fn run(&self, command: &EncodeCommand) -> Result<()> {
        let input = PathBuf::from(&command.args[2]);
        self.runs.borrow_mut().push(input.clone());
        if input.file_name().unwrap().to_string_lossy().starts_with("fail") {
            return Err(TranscodeError::EncoderFailed {
                command: command.display(),
                exit_code: Some(1),
            });
        }
        fs::write(command.args.last().unwrap(), b"encoded")?;
        Ok(())
    }
}

struct Utf8Subtitles;

impl SubtitleTools for Utf8Subtitles {
    fn detect_encoding(&self, _path: &Path) -> Result<String> {
        Ok("utf-8".into())
    }
    fn convert_to_utf8(&self, _source: &Path, _destination: &Path) -> Result<()> {
        Ok(())
    }
}

fn runner_config(input: &Path) -> CliRunnerConfig {
    CliRunnerConfig {
        input: input.to_path_buf(),
        extensions: SUPPORTED_VIDEO_EXTENSIONS,
        label: "test".to_string(),
        encoder_threads: None,
        dry_run: false,
    }
}

#[test]
fn second_pass_converts_nothing() {
    let dir = TempDir::new().unwrap();
    let season = dir.path().join("season1");
    fs::create_dir(&season).unwrap();
    for path in [
        dir.path().join("a.avi"),
        dir.path().join("b.mkv"),
        dir.path().join("broken.avi"),
        season.join("e01.avi"),
        season.join("fail.avi"),
    ] {
        fs::write(path, b"source").unwrap();
    }
    fs::write(dir.path().join("a.srt"), b"subtitle").unwrap();

    let config = PolicyConfig::default();
    let encoder = TouchEncoder::default();
    let ctx = TranscodeContext {
        config: &config,
        probe: &NameProbe,
        encoder: &encoder,
        subtitles: &Utf8Subtitles,
        dry_run: false,
    };

    let first = run_batch(&runner_config(dir.path()), |f| transcode_file(f, &ctx));
    assert_eq!(first.converted, 2, "a.avi and season1/e01.avi");
    assert_eq!(first.failed, 1);
    assert_eq!(first.skip_reasons["could not detect codecs"], 1);
    assert_eq!(first.skip_reasons["already in correct format"], 1);
    assert_eq!(first.total, first.converted + first.skipped + first.failed);
    assert!(dir.path().join("conv-a.mp4").exists());
    assert!(dir.path().join("conv-a.srt").exists());
    assert!(season.join("conv-e01.mp4").exists());

    let runs_after_first = encoder.runs.borrow().len();

    let second = run_batch(&runner_config(dir.path()), |f| transcode_file(f, &ctx));
    assert_eq!(second.converted, 0);
    assert_eq!(second.skip_reasons["already converted"], 2);
    assert_eq!(second.skip_reasons["output exists"], 2);
    // only the failed file is attempted again
    assert_eq!(encoder.runs.borrow().len(), runs_after_first + 1);
}

#[test]
fn failure_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    for name in ["fail1.avi", "good.avi"] {
        fs::write(dir.path().join(name), b"source").unwrap();
    }

    let config = PolicyConfig::default();
    let encoder = TouchEncoder::default();
    let ctx = TranscodeContext {
        config: &config,
        probe: &NameProbe,
        encoder: &encoder,
        subtitles: &Utf8Subtitles,
        dry_run: false,
    };

    let result = run_batch(&runner_config(dir.path()), |f| transcode_file(f, &ctx));
    assert_eq!(result.failed, 1);
    assert_eq!(result.converted, 1);
    assert!(result.errors[0].0.ends_with("fail1.avi"));
}
