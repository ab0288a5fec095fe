//! Audio stream directives
//!
//! Derives the `-map`/`-c:a`/bitrate/metadata block for the first audio
//! stream, or a plain stream copy when the audio is left alone.

use crate::config::{parse_bitrate_bps, PolicyConfig};
use shared_utils::ffprobe::{ChannelCount, StreamDescriptor};
use tracing::warn;

/// Label written when the channel count cannot be read.
pub const FALLBACK_LABEL: &str = "5.1";
pub const OUTPUT_SAMPLE_RATE: &str = "48000";

/// Encoders that cannot carry more than 5.1.
const CHANNEL_CAPPED_CODECS: &[&str] = &["AC3", "EAC3"];

/// Leading `F[.L]` of a layout: `6` → 6, `"5.1"` → 6, `"7.1(wide)"` → 8,
/// `"2"` → 2; `None` when there are no leading digits.
pub fn parse_channel_count(channels: &ChannelCount) -> Option<u32> {
    match channels {
        ChannelCount::Count(n) => Some(*n),
        ChannelCount::Layout(layout) => {
            let (front, rest) = split_leading_digits(layout.trim());
            let front = front.parse::<u32>().ok()?;
            let lfe = match rest.strip_prefix('.') {
                Some(after_dot) => {
                    let (lfe, _) = split_leading_digits(after_dot);
                    if lfe.is_empty() {
                        0
                    } else {
                        lfe.parse::<u32>().ok()?
                    }
                }
                None => 0,
            };
            front.checked_add(lfe)
        }
    }
}

fn split_leading_digits(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    s.split_at(end)
}

pub fn channel_label(channels: u32) -> String {
    match channels {
        1 => "Mono".to_string(),
        2 => "2.0".to_string(),
        6 => "5.1".to_string(),
        8 => "7.1".to_string(),
        n => format!("{}ch", n),
    }
}

pub fn is_channel_capped(codec: &str) -> bool {
    CHANNEL_CAPPED_CODECS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(codec.trim()))
}

/// Channel count and label actually written to the output. `channels` is
/// `None` when the probe gave nothing usable; the label then reads 5.1 but
/// no channel count is forced and the default bitrate applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    pub channels: Option<u32>,
    pub label: String,
}

/// Normalizes the probed channel info and clamps 7.1 to 5.1 for capped
/// encoders.
pub fn output_layout(raw: Option<&ChannelCount>, output_codec: &str) -> ChannelLayout {
    let Some(channels) = raw.and_then(parse_channel_count) else {
        warn!(
            "     Audio channel count '{}' not recognized, labelling it {}",
            raw.map(ToString::to_string).unwrap_or_else(|| "none".to_string()),
            FALLBACK_LABEL
        );
        return ChannelLayout {
            channels: None,
            label: FALLBACK_LABEL.to_string(),
        };
    };

    let label = channel_label(channels);
    if is_channel_capped(output_codec) && label == "7.1" {
        return ChannelLayout {
            channels: Some(6),
            label: channel_label(6),
        };
    }
    ChannelLayout {
        channels: Some(channels),
        label,
    }
}

/// `"768k"` → `"768000"`; values that are not a bitrate pass through.
pub fn bitrate_metadata_value(bitrate: &str) -> String {
    parse_bitrate_bps(bitrate)
        .map(|bps| bps.to_string())
        .unwrap_or_else(|| bitrate.to_string())
}

pub fn derive_audio_args(
    descriptor: &StreamDescriptor,
    config: &PolicyConfig,
    convert: bool,
    copy_all: bool,
) -> Vec<String> {
    if !convert {
        let map = if copy_all { "0:a" } else { "0:a:0" };
        return vec![
            "-map".into(),
            map.into(),
            "-c:a".into(),
            "copy".into(),
        ];
    }

    let codec = config.output_audio_codec.as_str();
    let layout = output_layout(descriptor.audio_channels.as_ref(), codec);
    let bitrate = match layout.channels {
        Some(channels) => config.audio_bitrate_for(channels),
        None => config.default_audio_bitrate.as_str(),
    };
    let sample_rate = descriptor.audio_sample_rate.as_deref().unwrap_or("unknown");

    let mut args: Vec<String> = vec![
        "-map".into(),
        "0:a:0".into(),
        "-map_metadata".into(),
        "-1".into(),
        "-c:a".into(),
        codec.into(),
        "-b:a".into(),
        bitrate.into(),
        "-metadata:s:a:0".into(),
        format!(
            "title={} Audio / {} / {} Hz / {}",
            codec.to_uppercase(),
            layout.label,
            sample_rate,
            bitrate
        ),
    ];

    if is_channel_capped(codec) {
        args.extend(["-ac", "6", "-channel_layout", "5.1"].map(String::from));
    } else if let Some(channels) = layout.channels.filter(|&n| n > 2) {
        args.push("-ac".into());
        args.push(channels.to_string());
    }

    args.push("-ar".into());
    args.push(OUTPUT_SAMPLE_RATE.into());
    args.push("-metadata:s:a:0".into());
    args.push(format!("BPS={}", bitrate_metadata_value(bitrate)));
    args
}
