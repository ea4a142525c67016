//! Stream metadata via `ffprobe`.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use serde::Deserialize;

use vidframe_common::error::{VidframeError, VidframeResult};

use crate::source::VideoMetadata;

const FALLBACK_FRAME_RATE: f64 = 30.0;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Read natural size, duration and frame rate of the first video stream.
pub async fn probe_video(ffprobe: &Path, path: &Path) -> VidframeResult<VideoMetadata> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate,duration:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            VidframeError::source_not_ready(format!(
                "Failed to run {}: {e}",
                ffprobe.display()
            ))
        })?;

    if !output.status.success() {
        return Err(VidframeError::source_not_ready(format!(
            "ffprobe failed on {} (status {}): {}",
            path.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let metadata = parse_probe_json(&output.stdout)?;
    tracing::debug!(
        path = %path.display(),
        width = metadata.width,
        height = metadata.height,
        duration_secs = metadata.duration_secs,
        frame_rate = metadata.frame_rate,
        "Probed video"
    );
    Ok(metadata)
}

fn parse_probe_json(raw: &[u8]) -> VidframeResult<VideoMetadata> {
    let parsed: ProbeOutput = serde_json::from_slice(raw)?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| VidframeError::source_not_ready("No video stream found"))?;

    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(VidframeError::source_not_ready(
            "Video stream has zero natural size",
        ));
    }

    let duration_secs = parsed
        .format
        .and_then(|f| f.duration)
        .or(stream.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| VidframeError::source_not_ready("Video duration is unknown"))?;

    let frame_rate = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or(FALLBACK_FRAME_RATE);

    Ok(VideoMetadata {
        width,
        height,
        duration_secs,
        frame_rate,
    })
}

/// Parse an ffprobe rational such as `30000/1001`.
fn parse_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.split_once('/').unwrap_or((raw, "1"));
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    let rate = num / den;
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Whether `binary` can be resolved on the current `PATH`.
pub async fn command_exists(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
