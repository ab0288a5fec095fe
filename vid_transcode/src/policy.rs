//! Conversion policy
//!
//! Decides, per file, which streams have to be re-encoded. The decision only
//! looks at the [`StreamDescriptor`] and the process-wide [`PolicyConfig`];
//! it never touches the filesystem.

use crate::config::PolicyConfig;
use shared_utils::ffprobe::StreamDescriptor;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Matches the full `CODEC-TAG` label exactly.
    ExactTagged,
    /// Matches any label starting with the bare codec name.
    PrefixBare,
}

/// One entry of the forced video codec list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecRule {
    pub kind: RuleKind,
    pub value: String,
}

impl CodecRule {
    /// Entries containing `-` are tagged labels, everything else is a bare
    /// codec name.
    pub fn parse(entry: &str) -> Self {
        let value = entry.trim().to_uppercase();
        let kind = if value.contains('-') {
            RuleKind::ExactTagged
        } else {
            RuleKind::PrefixBare
        };
        Self { kind, value }
    }

    pub fn matches(&self, video_codec: &str) -> bool {
        let label = video_codec.to_uppercase();
        match self.kind {
            RuleKind::ExactTagged => label == self.value,
            RuleKind::PrefixBare => label.starts_with(&self.value),
        }
    }
}

impl fmt::Display for CodecRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Why a stream was flagged, reported in dry-run mode.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionReason {
    ForceMode,
    BitrateAboveLimit { bitrate_kbps: f64, max_kbps: u32 },
    ForcedVideoCodec(String),
    ForcedAudioCodec(String),
}

impl fmt::Display for ConversionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionReason::ForceMode => write!(f, "forced conversion mode is enabled"),
            ConversionReason::BitrateAboveLimit {
                bitrate_kbps,
                max_kbps,
            } => write!(
                f,
                "video bitrate {:.2} kbps exceeds the limit of {} kbps",
                bitrate_kbps, max_kbps
            ),
            ConversionReason::ForcedVideoCodec(codec) => {
                write!(f, "video codec {} is on the forced conversion list", codec)
            }
            ConversionReason::ForcedAudioCodec(codec) => {
                write!(f, "audio codec {} is on the forced conversion list", codec)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversionDecision {
    pub convert_video: bool,
    pub convert_audio: bool,
    /// `max > 0 && bitrate > max`, independent of force mode.
    pub bitrate_limit_triggered: bool,
    pub reasons: Vec<ConversionReason>,
}

impl ConversionDecision {
    pub fn requires_conversion(&self) -> bool {
        self.convert_video || self.convert_audio
    }
}

/// Outcome of running the policy against one descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Video or audio codec missing; the policy was not consulted.
    Undetectable,
    AlreadyCorrect,
    Convert(ConversionDecision),
}

pub fn bitrate_limit_exceeded(bitrate_kbps: f64, max_kbps: u32) -> bool {
    max_kbps > 0 && bitrate_kbps > f64::from(max_kbps)
}

/// Per-stream decision for detected codecs.
pub fn decide(
    video_codec: &str,
    audio_codec: &str,
    bitrate_kbps: f64,
    config: &PolicyConfig,
) -> ConversionDecision {
    let bitrate_limit_triggered =
        bitrate_limit_exceeded(bitrate_kbps, config.max_video_bitrate_kbps);
    let mut reasons = Vec::new();

    if config.force_mode {
        reasons.push(ConversionReason::ForceMode);
        if bitrate_limit_triggered {
            reasons.push(ConversionReason::BitrateAboveLimit {
                bitrate_kbps,
                max_kbps: config.max_video_bitrate_kbps,
            });
        }
        return ConversionDecision {
            convert_video: true,
            convert_audio: true,
            bitrate_limit_triggered,
            reasons,
        };
    }

    let forced_video = config
        .forced_video_codecs
        .iter()
        .any(|rule| rule.matches(video_codec));
    if forced_video {
        reasons.push(ConversionReason::ForcedVideoCodec(video_codec.to_uppercase()));
    }

    let audio_upper = audio_codec.to_uppercase();
    let convert_audio = config.forced_audio_codecs.contains(&audio_upper);
    if convert_audio {
        reasons.push(ConversionReason::ForcedAudioCodec(audio_upper));
    }

    if bitrate_limit_triggered {
        reasons.push(ConversionReason::BitrateAboveLimit {
            bitrate_kbps,
            max_kbps: config.max_video_bitrate_kbps,
        });
    }

    ConversionDecision {
        convert_video: forced_video || bitrate_limit_triggered,
        convert_audio,
        bitrate_limit_triggered,
        reasons,
    }
}

/// Full classification of a probed file.
pub fn evaluate(descriptor: &StreamDescriptor, config: &PolicyConfig) -> Verdict {
    let Some((video, audio)) = descriptor.detected_codecs() else {
        return Verdict::Undetectable;
    };

    let decision = decide(video, audio, descriptor.video_bitrate_kbps, config);
    if decision.requires_conversion() {
        Verdict::Convert(decision)
    } else {
        Verdict::AlreadyCorrect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn descriptor(video: &str, audio: &str, bitrate: f64) -> StreamDescriptor {
        StreamDescriptor {
            video_codec: Some(video.to_string()),
            audio_codec: Some(audio.to_string()),
            video_bitrate_kbps: bitrate,
            ..StreamDescriptor::default()
        }
    }

    #[test]
    fn test_rule_kind_from_entry() {
        assert_eq!(CodecRule::parse("mpeg4-xvid").kind, RuleKind::ExactTagged);
        assert_eq!(CodecRule::parse("mpeg4-xvid").value, "MPEG4-XVID");
        assert_eq!(CodecRule::parse("MSMPEG4").kind, RuleKind::PrefixBare);
    }

    #[test]
    fn test_exact_tagged_rule() {
        let rule = CodecRule::parse("MPEG4-XVID");
        assert!(rule.matches("MPEG4-XVID"));
        assert!(rule.matches("mpeg4-xvid"));
        assert!(!rule.matches("MPEG4-DIVX"));
        assert!(!rule.matches("MPEG4"));
    }

    #[test]
    fn test_prefix_bare_rule() {
        let rule = CodecRule::parse("MSMPEG4");
        assert!(rule.matches("MSMPEG4V3"));
        assert!(rule.matches("MSMPEG4V2-DIV3"));
        assert!(!rule.matches("MPEG4-XVID"));
    }

    // XviD video with AC3 audio under the default lists.
    #[test]
    fn test_xvid_with_ac3_converts_video_only() {
        let config = PolicyConfig::default();
        let verdict = evaluate(&descriptor("MPEG4-XVID", "AC3", 1500.0), &config);
        match verdict {
            Verdict::Convert(d) => {
                assert!(d.convert_video);
                assert!(!d.convert_audio);
                assert!(!d.bitrate_limit_triggered);
                assert_eq!(d.reasons, vec![ConversionReason::ForcedVideoCodec("MPEG4-XVID".into())]);
            }
            other => panic!("expected Convert, got {:?}", other),
        }
    }

    #[test]
    fn test_forced_audio_codec() {
        let d = decide("HEVC", "truehd", 1000.0, &PolicyConfig::default());
        assert!(!d.convert_video);
        assert!(d.convert_audio);
    }

    // bitrate above the cap converts a codec that is not forced.
    #[test]
    fn test_bitrate_limit_triggers_video_conversion() {
        let config = PolicyConfig {
            max_video_bitrate_kbps: 2000,
            ..PolicyConfig::default()
        };
        let d = decide("H264-AVC1", "AAC", 2500.0, &config);
        assert!(d.convert_video);
        assert!(d.bitrate_limit_triggered);
        assert!(!d.convert_audio);
    }

    #[test]
    fn test_bitrate_limit_disabled_by_zero() {
        assert!(!bitrate_limit_exceeded(1_000_000.0, 0));
        assert!(!bitrate_limit_exceeded(2000.0, 2000));
        assert!(bitrate_limit_exceeded(2000.01, 2000));
    }

    #[test]
    fn test_already_correct() {
        let verdict = evaluate(&descriptor("HEVC", "AAC", 900.0), &PolicyConfig::default());
        assert_eq!(verdict, Verdict::AlreadyCorrect);
    }

    #[test]
    fn test_missing_codec_is_undetectable_even_in_force_mode() {
        let config = PolicyConfig {
            force_mode: true,
            ..PolicyConfig::default()
        };
        let mut d = descriptor("H264", "AAC", 0.0);
        d.audio_codec = None;
        assert_eq!(evaluate(&d, &config), Verdict::Undetectable);
        assert_eq!(evaluate(&StreamDescriptor::default(), &config), Verdict::Undetectable);
    }

    #[test]
    fn test_force_mode_still_reports_bitrate_limit() {
        let config = PolicyConfig {
            force_mode: true,
            max_video_bitrate_kbps: 1000,
            ..PolicyConfig::default()
        };
        let d = decide("HEVC", "AAC", 4000.0, &config);
        assert!(d.bitrate_limit_triggered);
        assert_eq!(d.reasons[0], ConversionReason::ForceMode);
    }

    proptest! {
        #[test]
        fn prop_force_mode_converts_both_streams(
            video in "[A-Z0-9]{1,8}(-[A-Z0-9]{4})?",
            audio in "[A-Z0-9]{1,6}",
            bitrate in 0.0f64..100_000.0,
            max in 0u32..50_000,
        ) {
            let config = PolicyConfig {
                force_mode: true,
                max_video_bitrate_kbps: max,
                ..PolicyConfig::default()
            };
            let d = decide(&video, &audio, bitrate, &config);
            prop_assert!(d.convert_video);
            prop_assert!(d.convert_audio);
            prop_assert_eq!(d.bitrate_limit_triggered, bitrate_limit_exceeded(bitrate, max));
        }
    }
}
