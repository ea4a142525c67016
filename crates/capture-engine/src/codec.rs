//! Capture codec selection.

use std::path::Path;
use std::process::Stdio;

use serde::Serialize;

use vidframe_common::error::{VidframeError, VidframeResult};
use vidframe_frame_model::ExportFormat;

/// Codec/container pairs the capture stage can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureCodec {
    Vp9,
    Vp8,
    H264,
}

impl CaptureCodec {
    /// Tried in this order.
    pub const PREFERENCE: [CaptureCodec; 3] = [CaptureCodec::Vp9, CaptureCodec::Vp8, CaptureCodec::H264];

    /// ffmpeg encoder name.
    pub fn encoder(self) -> &'static str {
        match self {
            Self::Vp9 => "libvpx-vp9",
            Self::Vp8 => "libvpx",
            Self::H264 => "libx264",
        }
    }

    pub fn container(self) -> ExportFormat {
        match self {
            Self::Vp9 | Self::Vp8 => ExportFormat::Webm,
            Self::H264 => ExportFormat::Mp4,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Vp9 => "video/webm;codecs=vp9",
            Self::Vp8 => "video/webm;codecs=vp8",
            Self::H264 => "video/mp4;codecs=avc1",
        }
    }

    /// Encoder options tuned for real-time capture.
    pub fn encoder_args(self) -> Vec<&'static str> {
        match self {
            Self::Vp9 => vec![
                "-deadline", "realtime", "-cpu-used", "8", "-row-mt", "1", "-b:v", "0", "-crf",
                "30",
            ],
            Self::Vp8 => vec!["-deadline", "realtime", "-cpu-used", "8", "-b:v", "8M"],
            Self::H264 => vec!["-preset", "veryfast", "-crf", "20"],
        }
    }

    /// Muxer arguments for writing to a pipe.
    pub fn muxer_args(self) -> Vec<&'static str> {
        match self.container() {
            ExportFormat::Webm => vec!["-f", "webm"],
            ExportFormat::Mp4 => vec!["-movflags", "frag_keyframe+empty_moov", "-f", "mp4"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Vp9 => "VP9",
            Self::Vp8 => "VP8",
            Self::H264 => "H.264",
        }
    }
}

/// First codec in [`CaptureCodec::PREFERENCE`] whose encoder appears in
/// `ffmpeg -encoders` output.
pub fn negotiate_codec(encoders_listing: &str) -> Option<CaptureCodec> {
    let available: Vec<&str> = encoders_listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    CaptureCodec::PREFERENCE
        .into_iter()
        .find(|codec| available.contains(&codec.encoder()))
}

/// Raw `ffmpeg -encoders` listing.
pub async fn list_encoders(ffmpeg: &Path) -> VidframeResult<String> {
    let output = tokio::process::Command::new(ffmpeg)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| VidframeError::capture(format!("Failed to run {}: {e}", ffmpeg.display())))?;
    if !output.status.success() {
        return Err(VidframeError::capture(format!(
            "ffmpeg -encoders failed (status {})",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D libvpx               libvpx VP8 (codec vp8)
 A....D aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn test_prefers_vp9_when_available() {
        let listing = format!("{LISTING} V....D libvpx-vp9           libvpx VP9 (codec vp9)\n");
        assert_eq!(negotiate_codec(&listing), Some(CaptureCodec::Vp9));
    }

    #[test]
    fn test_falls_back_in_order() {
        assert_eq!(negotiate_codec(LISTING), Some(CaptureCodec::Vp8));
        let h264_only = LISTING.replace("libvpx ", "other ");
        assert_eq!(negotiate_codec(&h264_only), Some(CaptureCodec::H264));
        assert_eq!(negotiate_codec(" A....D aac  AAC\n"), None);
    }

    #[test]
    fn test_mime_names_container() {
        for codec in CaptureCodec::PREFERENCE {
            assert_eq!(ExportFormat::from_mime(codec.mime_type()), Some(codec.container()));
        }
    }
}
