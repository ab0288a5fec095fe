//! Video stream directives

/// Encoder-specific way of expressing the bitrate ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    X265Params,
    X264Params,
    Generic,
}

impl RateControl {
    pub fn for_encoder(encoder: &str) -> Self {
        match encoder.trim().to_ascii_lowercase().as_str() {
            "libx265" => RateControl::X265Params,
            "libx264" => RateControl::X264Params,
            _ => RateControl::Generic,
        }
    }

    /// Ceiling `max_kbps` with a buffer of twice that.
    pub fn cap_args(self, max_kbps: u32) -> Vec<String> {
        let bufsize = u64::from(max_kbps) * 2;
        match self {
            RateControl::X265Params => vec![
                "-x265-params".into(),
                format!("vbv-maxrate={}:vbv-bufsize={}", max_kbps, bufsize),
            ],
            RateControl::X264Params => vec![
                "-x264-params".into(),
                format!("vbv-maxrate={}:vbv-bufsize={}", max_kbps, bufsize),
            ],
            RateControl::Generic => vec![
                "-maxrate".into(),
                format!("{}k", max_kbps),
                "-bufsize".into(),
                format!("{}k", bufsize),
            ],
        }
    }
}

pub struct VideoArgsRequest<'a> {
    pub convert: bool,
    pub encoder: &'a str,
    pub crf: &'a str,
    pub bitrate_limit_triggered: bool,
    pub max_kbps: u32,
    pub copy_all: bool,
}

pub fn derive_video_args(request: &VideoArgsRequest<'_>) -> Vec<String> {
    if !request.convert {
        let map = if request.copy_all { "0:v" } else { "0:v:0" };
        return vec!["-map".into(), map.into(), "-c:v".into(), "copy".into()];
    }

    let mut args: Vec<String> = vec![
        "-map".into(),
        "0:v:0".into(),
        "-c:v".into(),
        request.encoder.into(),
        "-preset".into(),
        "fast".into(),
        "-crf".into(),
        request.crf.into(),
    ];
    if request.bitrate_limit_triggered && request.max_kbps > 0 {
        args.extend(RateControl::for_encoder(request.encoder).cap_args(request.max_kbps));
    }
    args
}
