//! Encoder command synthesis
//!
//! Argument order: `-y -i INPUT`, subtitle copy (mkv → mkv only), video
//! block, audio block, `-threads N`, output.

use crate::audio_args::derive_audio_args;
use crate::config::PolicyConfig;
use crate::policy::ConversionDecision;
use crate::video_args::{derive_video_args, VideoArgsRequest};
use shared_utils::common_utils::get_extension_lowercase;
use shared_utils::ffmpeg_process::EncodeCommand;
use shared_utils::ffprobe::StreamDescriptor;
use shared_utils::tools::FFMPEG;
use std::path::Path;

fn both_mkv(input: &Path, output: &Path) -> bool {
    get_extension_lowercase(input) == "mkv" && get_extension_lowercase(output) == "mkv"
}

pub fn synthesize(
    input: &Path,
    output: &Path,
    decision: &ConversionDecision,
    descriptor: &StreamDescriptor,
    config: &PolicyConfig,
) -> EncodeCommand {
    let copy_all = config.copy_all_for_output(output);

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
    ];

    if both_mkv(input, output) {
        args.extend(["-map", "0:s?", "-c:s", "copy"].map(String::from));
    }

    args.extend(derive_video_args(&VideoArgsRequest {
        convert: decision.convert_video,
        encoder: &config.output_video_codec,
        crf: &config.crf,
        bitrate_limit_triggered: decision.bitrate_limit_triggered,
        max_kbps: config.max_video_bitrate_kbps,
        copy_all,
    }));

    args.extend(derive_audio_args(
        descriptor,
        config,
        decision.convert_audio,
        copy_all,
    ));

    if let Some(threads) = config.encoder_threads {
        args.push("-threads".into());
        args.push(threads.to_string());
    }

    args.push(output.to_string_lossy().into_owned());
    EncodeCommand::new(FFMPEG, args)
}
