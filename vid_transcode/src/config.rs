//! Policy configuration
//!
//! Built-in defaults, optionally overridden by a TOML settings file, then by
//! command-line flags. The result is validated once at startup and shared
//! read-only for the whole run.

use crate::policy::CodecRule;
use anyhow::Context;
use serde::Deserialize;
use shared_utils::errors::{Result, TranscodeError};
use shared_utils::thread_manager::{encoder_threads, ThreadConfig, MAX_ENCODER_THREADS};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const DEFAULT_FORCED_VIDEO_CODECS: &[&str] = &["MPEG4-XVID"];
pub const DEFAULT_FORCED_AUDIO_CODECS: &[&str] = &["DTS", "TRUEHD"];
pub const DEFAULT_VIDEO_ENCODER: &str = "libx265";
pub const DEFAULT_AUDIO_ENCODER: &str = "aac";
pub const DEFAULT_CRF: &str = "20";
pub const DEFAULT_AUDIO_BITRATE: &str = "768k";

/// Channel count → audio bitrate.
pub const DEFAULT_AUDIO_BITRATES: &[(u32, &str)] = &[
    (2, "384k"),
    (3, "448k"),
    (5, "768k"),
    (6, "768k"),
    (7, "1024k"),
    (8, "1536k"),
];

/// Highest CRF accepted by the x264/x265 encoders.
const MAX_CRF: u32 = 51;

/// Everything the policy, the derivers and the synthesizer read.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    pub forced_video_codecs: Vec<CodecRule>,
    /// Uppercase, exact match.
    pub forced_audio_codecs: BTreeSet<String>,
    /// 0 disables the cap.
    pub max_video_bitrate_kbps: u32,
    pub crf: String,
    pub force_mode: bool,
    pub output_video_codec: String,
    pub output_audio_codec: String,
    pub audio_bitrates: BTreeMap<u32, String>,
    pub default_audio_bitrate: String,
    /// Stream copies take every stream of the kind instead of the first.
    pub copy_all_streams: bool,
    pub force_mp4: bool,
    /// `None` when encoder multithreading is disabled.
    pub encoder_threads: Option<usize>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            forced_video_codecs: DEFAULT_FORCED_VIDEO_CODECS
                .iter()
                .map(|c| CodecRule::parse(c))
                .collect(),
            forced_audio_codecs: DEFAULT_FORCED_AUDIO_CODECS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            max_video_bitrate_kbps: 0,
            crf: DEFAULT_CRF.to_string(),
            force_mode: false,
            output_video_codec: DEFAULT_VIDEO_ENCODER.to_string(),
            output_audio_codec: DEFAULT_AUDIO_ENCODER.to_string(),
            audio_bitrates: DEFAULT_AUDIO_BITRATES
                .iter()
                .map(|(ch, b)| (*ch, b.to_string()))
                .collect(),
            default_audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            copy_all_streams: false,
            force_mp4: false,
            encoder_threads: encoder_threads(&ThreadConfig::default()),
        }
    }
}

impl PolicyConfig {
    /// Bitrate for a (normalized) channel count.
    pub fn audio_bitrate_for(&self, channels: u32) -> &str {
        self.audio_bitrates
            .get(&channels)
            .unwrap_or(&self.default_audio_bitrate)
    }

    /// Stream copies only take every stream when the container can hold them.
    pub fn copy_all_for_output(&self, output: &Path) -> bool {
        self.copy_all_streams && !output_is_mp4(output)
    }

    /// Defaults ← settings file ← command-line flags.
    pub fn resolve(settings: Option<SettingsFile>, overrides: &CliOverrides) -> Result<Self> {
        let mut config = Self::default();

        if let Some(file) = settings {
            file.apply(&mut config)?;
        }

        if let Some(crf) = &overrides.crf {
            config.crf = crf.clone();
        }
        if let Some(max) = overrides.max_video_bitrate_kbps {
            config.max_video_bitrate_kbps = max;
        }
        config.force_mode |= overrides.force;
        config.force_mp4 |= overrides.force_mp4;
        if config.force_mp4 {
            config.copy_all_streams = false;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_video_codec.trim().is_empty() {
            return Err(invalid("output video codec is empty"));
        }
        if self.output_audio_codec.trim().is_empty() {
            return Err(invalid("output audio codec is empty"));
        }
        if self.forced_video_codecs.iter().any(|r| r.value.is_empty()) {
            return Err(invalid("forced video codec entries must not be empty"));
        }
        if self.forced_audio_codecs.iter().any(|c| c.is_empty()) {
            return Err(invalid("forced audio codec entries must not be empty"));
        }

        match self.crf.trim().parse::<u32>() {
            Ok(crf) if crf <= MAX_CRF => {}
            _ => {
                return Err(invalid(format!(
                    "CRF must be an integer between 0 and {}, got '{}'",
                    MAX_CRF, self.crf
                )))
            }
        }

        let bitrates = self
            .audio_bitrates
            .values()
            .chain(std::iter::once(&self.default_audio_bitrate));
        for bitrate in bitrates {
            if parse_bitrate_bps(bitrate).is_none() {
                return Err(invalid(format!("unparseable audio bitrate '{}'", bitrate)));
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> TranscodeError {
    TranscodeError::InvalidConfig(message.into())
}

pub fn output_is_mp4(output: &Path) -> bool {
    shared_utils::common_utils::get_extension_lowercase(output) == "mp4"
}

/// `"768k"` → 768000, `"192000"` → 192000.
pub fn parse_bitrate_bps(bitrate: &str) -> Option<u64> {
    let bitrate = bitrate.trim();
    let (digits, multiplier) = match bitrate.strip_suffix(['k', 'K']) {
        Some(d) => (d, 1000),
        None => (bitrate, 1),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok()?.checked_mul(multiplier)
}

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub crf: Option<String>,
    pub max_video_bitrate_kbps: Option<u32>,
    pub force: bool,
    pub force_mp4: bool,
}

/// On-disk settings. Every key is optional.
///
/// ```toml
/// forced_video_codecs = ["MPEG4-XVID", "MSMPEG4"]
/// forced_audio_codecs = ["DTS", "TRUEHD"]
/// output_video_codec = "libx265"
/// crf = "22"
///
/// [audio_bitrates]
/// 2 = "256k"
/// 6 = "640k"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub forced_video_codecs: Option<Vec<String>>,
    pub forced_audio_codecs: Option<Vec<String>>,
    pub output_video_codec: Option<String>,
    pub output_audio_codec: Option<String>,
    pub crf: Option<String>,
    pub max_video_bitrate_kbps: Option<u32>,
    /// Table keys are channel counts.
    pub audio_bitrates: Option<BTreeMap<String, String>>,
    pub default_audio_bitrate: Option<String>,
    pub copy_all_streams: Option<bool>,
    pub multithreading: Option<bool>,
    pub max_threads: Option<usize>,
    pub force_mp4: Option<bool>,
}

impl SettingsFile {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| invalid(e.to_string()))
    }

    fn apply(self, config: &mut PolicyConfig) -> Result<()> {
        if let Some(codecs) = self.forced_video_codecs {
            config.forced_video_codecs = codecs.iter().map(|c| CodecRule::parse(c)).collect();
        }
        if let Some(codecs) = self.forced_audio_codecs {
            config.forced_audio_codecs = codecs.iter().map(|c| c.trim().to_uppercase()).collect();
        }
        if let Some(codec) = self.output_video_codec {
            config.output_video_codec = codec;
        }
        if let Some(codec) = self.output_audio_codec {
            config.output_audio_codec = codec;
        }
        if let Some(crf) = self.crf {
            config.crf = crf;
        }
        if let Some(max) = self.max_video_bitrate_kbps {
            config.max_video_bitrate_kbps = max;
        }
        if let Some(table) = self.audio_bitrates {
            let mut bitrates = BTreeMap::new();
            for (channels, bitrate) in table {
                let channels = channels.trim().parse::<u32>().map_err(|_| {
                    invalid(format!("audio_bitrates key '{}' is not a channel count", channels))
                })?;
                bitrates.insert(channels, bitrate);
            }
            config.audio_bitrates = bitrates;
        }
        if let Some(bitrate) = self.default_audio_bitrate {
            config.default_audio_bitrate = bitrate;
        }
        if let Some(copy_all) = self.copy_all_streams {
            config.copy_all_streams = copy_all;
        }
        if let Some(force_mp4) = self.force_mp4 {
            config.force_mp4 = force_mp4;
        }
        if self.multithreading.is_some() || self.max_threads.is_some() {
            config.encoder_threads = encoder_threads(&ThreadConfig {
                multithreading: self.multithreading.unwrap_or(true),
                max_threads: self.max_threads.unwrap_or(MAX_ENCODER_THREADS),
            });
        }
        Ok(())
    }
}

pub fn load_settings(path: &Path) -> anyhow::Result<SettingsFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    SettingsFile::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
