//! FFprobe wrapper module
//!
//! Normalizes a single `ffprobe -show_format -show_streams` call into a
//! [`StreamDescriptor`]. Probing a file never fails outright: pieces that
//! cannot be determined come back as `None` (codecs) or `0.0` (bitrate) and a
//! warning is logged.

use crate::errors::{Result, TranscodeError};
use crate::logging::log_external_tool;
use crate::tools::FFPROBE;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::time::Instant;
use tracing::{debug, warn};

/// Raw channel information of an audio stream.
///
/// ffprobe reports a plain integer, but layout descriptors such as `"5.1"`
/// show up in some containers and have to be parsed downstream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChannelCount {
    Count(u32),
    Layout(String),
}

impl std::fmt::Display for ChannelCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelCount::Count(n) => write!(f, "{}", n),
            ChannelCount::Layout(s) => write!(f, "{}", s),
        }
    }
}

/// What the orchestrator knows about one media file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDescriptor {
    /// Uppercased codec name, `NAME-TAG` when the container carries a FourCC.
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub audio_channels: Option<ChannelCount>,
    pub audio_sample_rate: Option<String>,
    pub video_bitrate_kbps: f64,
}

impl StreamDescriptor {
    /// Both codec labels, or `None` when either stream could not be detected.
    pub fn detected_codecs(&self) -> Option<(&str, &str)> {
        Some((self.video_codec.as_deref()?, self.audio_codec.as_deref()?))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FfprobeStream {
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default)]
    pub codec_tag_string: Option<String>,
    #[serde(default)]
    pub channels: Option<ChannelCount>,
    #[serde(default)]
    pub sample_rate: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FfprobeFormat {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    #[serde(default)]
    pub format: Option<FfprobeFormat>,
}

impl FfprobeOutput {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TranscodeError::ProbeParse(e.to_string()))
    }

    pub fn first_stream(&self, codec_type: &str) -> Option<&FfprobeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(codec_type))
    }
}

/// Bitrate signal sources, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateSource {
    /// Stream-level `bit_rate` field.
    StreamBitRate,
    /// `BPS` stream tag written by mkvmerge.
    BpsTag,
    /// `size * 8 / duration`, covers the whole container.
    SizeOverDuration,
}

pub const BITRATE_STRATEGIES: [BitrateSource; 3] = [
    BitrateSource::StreamBitRate,
    BitrateSource::BpsTag,
    BitrateSource::SizeOverDuration,
];

const BPS_TAG_KEYS: &[&str] = &["BPS", "BPS-eng"];

/// Everything the bitrate strategies may look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitrateInputs<'a> {
    pub video_stream: Option<&'a FfprobeStream>,
    pub duration: Option<&'a str>,
    pub file_size: Option<u64>,
}

impl BitrateSource {
    pub fn resolve(self, inputs: &BitrateInputs<'_>) -> Result<f64> {
        match self {
            BitrateSource::StreamBitRate => {
                let raw = inputs
                    .video_stream
                    .and_then(|s| s.bit_rate.as_deref())
                    .ok_or_else(|| TranscodeError::ProbeParse("no stream bit_rate".into()))?;
                bits_per_second_to_kbps(raw)
            }
            BitrateSource::BpsTag => {
                let stream = inputs
                    .video_stream
                    .ok_or_else(|| TranscodeError::ProbeParse("no video stream".into()))?;
                let raw = BPS_TAG_KEYS
                    .iter()
                    .find_map(|key| stream.tags.get(*key))
                    .ok_or_else(|| TranscodeError::ProbeParse("no BPS tag".into()))?;
                bits_per_second_to_kbps(raw)
            }
            BitrateSource::SizeOverDuration => {
                let size = inputs
                    .file_size
                    .ok_or_else(|| TranscodeError::ProbeParse("file size unknown".into()))?;
                let raw = inputs
                    .duration
                    .ok_or_else(|| TranscodeError::ProbeParse("no format duration".into()))?;
                let duration = raw.trim().parse::<f64>().map_err(|e| {
                    TranscodeError::ProbeParse(format!("duration '{}': {}", raw, e))
                })?;
                if !duration.is_finite() || duration <= 0.0 {
                    return Err(TranscodeError::ProbeParse(format!(
                        "unusable duration {}",
                        duration
                    )));
                }
                Ok(size as f64 * 8.0 / duration / 1000.0)
            }
        }
    }
}

fn bits_per_second_to_kbps(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TranscodeError::ProbeParse(format!(
            "'{}' is not a bits/s value",
            raw
        )));
    }
    let bps = raw
        .parse::<u64>()
        .map_err(|e| TranscodeError::ProbeParse(e.to_string()))?;
    Ok(bps as f64 / 1000.0)
}

/// First strategy that yields a value wins; 0 when none does.
pub fn resolve_video_bitrate(inputs: &BitrateInputs<'_>) -> f64 {
    for source in BITRATE_STRATEGIES {
        match source.resolve(inputs) {
            Ok(kbps) => {
                debug!(source = ?source, kbps, "Video bitrate resolved");
                return kbps;
            }
            Err(e) => debug!(source = ?source, error = %e, "Bitrate source unavailable"),
        }
    }
    0.0
}

/// `H264` + `AVC1` → `H264-AVC1`; bracketed placeholders such as
/// `[0][0][0][0]` are not real tags.
pub fn video_codec_label(codec_name: &str, codec_tag: Option<&str>) -> String {
    let name = codec_name.trim().to_uppercase();
    match codec_tag.map(|t| t.trim().to_uppercase()) {
        Some(tag) if !tag.is_empty() && !tag.starts_with('[') => format!("{}-{}", name, tag),
        _ => name,
    }
}

impl StreamDescriptor {
    pub fn from_probe_output(output: &FfprobeOutput, file_size: Option<u64>) -> Self {
        let video = output.first_stream("video");
        let audio = output.first_stream("audio");

        let video_codec = video.and_then(|s| {
            s.codec_name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .map(|n| video_codec_label(n, s.codec_tag_string.as_deref()))
        });

        let format = output.format.as_ref();
        let file_size = file_size.or_else(|| {
            format
                .and_then(|f| f.size.as_deref())
                .and_then(|s| s.parse::<u64>().ok())
        });

        let video_bitrate_kbps = resolve_video_bitrate(&BitrateInputs {
            video_stream: video,
            duration: format.and_then(|f| f.duration.as_deref()),
            file_size,
        });

        Self {
            video_codec,
            audio_codec: audio
                .and_then(|s| s.codec_name.as_deref())
                .filter(|n| !n.trim().is_empty())
                .map(|n| n.trim().to_uppercase()),
            audio_channels: audio.and_then(|s| s.channels.clone()),
            audio_sample_rate: audio.and_then(|s| s.sample_rate.clone()),
            video_bitrate_kbps,
        }
    }
}

/// Runs ffprobe once and parses its JSON output.
pub fn run_ffprobe(path: &Path) -> Result<FfprobeOutput> {
    let path_str = path.to_str().ok_or_else(|| TranscodeError::ProbeFailed {
        path: path.to_path_buf(),
        reason: "invalid path encoding".to_string(),
    })?;

    let args = [
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
        "--",
        path_str,
    ];
    let start = Instant::now();
    let output = Command::new(FFPROBE).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TranscodeError::ToolNotFound(FFPROBE.to_string())
        } else {
            TranscodeError::IoError(e)
        }
    })?;
    log_external_tool(
        FFPROBE,
        &args,
        &String::from_utf8_lossy(&output.stderr),
        output.status.code(),
        start.elapsed(),
    );

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TranscodeError::ProbeFailed {
            path: path.to_path_buf(),
            reason: if stderr.trim().is_empty() {
                format!("exit code {:?}", output.status.code())
            } else {
                stderr.trim().to_string()
            },
        });
    }

    FfprobeOutput::from_json(&String::from_utf8_lossy(&output.stdout))
}

/// Source of [`StreamDescriptor`]s for the conversion pipeline.
pub trait MediaProbe {
    fn probe(&self, path: &Path) -> StreamDescriptor;
}

/// The real prober, backed by the `ffprobe` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ffprobe;

impl MediaProbe for Ffprobe {
    fn probe(&self, path: &Path) -> StreamDescriptor {
        let file_size = std::fs::metadata(path).map(|m| m.len()).ok();
        match run_ffprobe(path) {
            Ok(output) => StreamDescriptor::from_probe_output(&output, file_size),
            Err(e) => {
                warn!("     Error analyzing file {}: {}", path.display(), e);
                StreamDescriptor::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XVID_AVI: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "mpeg4", "codec_tag_string": "XVID", "bit_rate": "1843000"},
            {"codec_type": "audio", "codec_name": "ac3", "channels": 6, "sample_rate": "48000"}
        ],
        "format": {"duration": "5400.0", "size": "1400000000"}
    }"#;

    #[test]
    fn test_xvid_avi_descriptor() {
        let out = FfprobeOutput::from_json(XVID_AVI).unwrap();
        let d = StreamDescriptor::from_probe_output(&out, None);
        assert_eq!(d.video_codec.as_deref(), Some("MPEG4-XVID"));
        assert_eq!(d.audio_codec.as_deref(), Some("AC3"));
        assert_eq!(d.audio_channels, Some(ChannelCount::Count(6)));
        assert_eq!(d.audio_sample_rate.as_deref(), Some("48000"));
        assert!((d.video_bitrate_kbps - 1843.0).abs() < 1e-9);
    }

    #[test]
    fn test_video_codec_label() {
        assert_eq!(video_codec_label("h264", Some("avc1")), "H264-AVC1");
        assert_eq!(video_codec_label("hevc", Some("[0][0][0][0]")), "HEVC");
        assert_eq!(video_codec_label("hevc", Some("")), "HEVC");
        assert_eq!(video_codec_label("vp9", None), "VP9");
    }

    #[test]
    fn test_missing_audio_stream() {
        let json = r#"{"streams":[{"codec_type":"video","codec_name":"h264"}],"format":{}}"#;
        let d = StreamDescriptor::from_probe_output(&FfprobeOutput::from_json(json).unwrap(), None);
        assert_eq!(d.video_codec.as_deref(), Some("H264"));
        assert!(d.audio_codec.is_none());
        assert!(d.detected_codecs().is_none());
    }

    #[test]
    fn test_empty_audio_codec_name_is_undetected() {
        let json = r#"{"streams":[{"codec_type":"video","codec_name":"h264"},{"codec_type":"audio","codec_name":"  "}]}"#;
        let d = StreamDescriptor::from_probe_output(&FfprobeOutput::from_json(json).unwrap(), None);
        assert!(d.audio_codec.is_none());
        assert!(d.detected_codecs().is_none());
    }

    #[test]
    fn test_layout_string_channels() {
        let json = r#"{"streams":[{"codec_type":"audio","codec_name":"dts","channels":"5.1"}]}"#;
        let d = StreamDescriptor::from_probe_output(&FfprobeOutput::from_json(json).unwrap(), None);
        assert_eq!(d.audio_channels, Some(ChannelCount::Layout("5.1".to_string())));
        assert!(d.video_codec.is_none());
    }

    #[test]
    fn test_bitrate_falls_back_to_bps_tag() {
        let json = r#"{"streams":[{"codec_type":"video","codec_name":"h264","bit_rate":"N/A",
            "tags":{"BPS":"2500000"}}],"format":{"duration":"10.0"}}"#;
        let out = FfprobeOutput::from_json(json).unwrap();
        let d = StreamDescriptor::from_probe_output(&out, Some(1));
        assert!((d.video_bitrate_kbps - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_bitrate_accepts_language_suffixed_bps_tag() {
        let json = r#"{"streams":[{"codec_type":"video","codec_name":"h264",
            "tags":{"BPS-eng":"800000"}}]}"#;
        let out = FfprobeOutput::from_json(json).unwrap();
        assert!((StreamDescriptor::from_probe_output(&out, None).video_bitrate_kbps - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_bitrate_falls_back_to_size_over_duration() {
        let json = r#"{"streams":[{"codec_type":"video","codec_name":"h264"}],
            "format":{"duration":"100.0","size":"999"}}"#;
        let out = FfprobeOutput::from_json(json).unwrap();
        // 25_000_000 bytes * 8 / 100 s / 1000 = 2000 kbps; explicit size wins over format.size
        let d = StreamDescriptor::from_probe_output(&out, Some(25_000_000));
        assert!((d.video_bitrate_kbps - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_bitrate_zero_when_everything_fails() {
        let json = r#"{"streams":[{"codec_type":"video","codec_name":"h264"}],
            "format":{"duration":"0"}}"#;
        let out = FfprobeOutput::from_json(json).unwrap();
        assert_eq!(StreamDescriptor::from_probe_output(&out, Some(1000)).video_bitrate_kbps, 0.0);
    }

    #[test]
    fn test_strategy_order() {
        assert_eq!(BITRATE_STRATEGIES[0], BitrateSource::StreamBitRate);
        assert_eq!(BITRATE_STRATEGIES[1], BitrateSource::BpsTag);
        assert_eq!(BITRATE_STRATEGIES[2], BitrateSource::SizeOverDuration);
    }

    #[test]
    fn test_size_over_duration_rejects_garbage_duration() {
        let inputs = BitrateInputs {
            video_stream: None,
            duration: Some("N/A"),
            file_size: Some(10),
        };
        assert!(BitrateSource::SizeOverDuration.resolve(&inputs).is_err());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            FfprobeOutput::from_json("not json"),
            Err(TranscodeError::ProbeParse(_))
        ));
    }
}
