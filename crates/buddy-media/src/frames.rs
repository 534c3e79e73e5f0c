//! Video frame sampling.
//!
//! The video is written once to a temporary file that the duration lookup and
//! every extraction read. The default extractor shells out to `ffprobe` and
//! `ffmpeg`, each call bounded by a timeout.

use async_trait::async_trait;
use buddy_core::error::MediaError;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Relative positions of the sampled frames.
const FRAME_OFFSETS: [f64; 3] = [0.2, 0.5, 0.8];

/// Margin kept from both ends of the video, in seconds.
const EDGE_MARGIN: f64 = 0.05;

/// Pulls still frames out of a video.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Duration of the video at `video`, in seconds.
    async fn probe_duration(&self, video: &Path) -> Result<f64, MediaError>;

    /// One PNG-encoded frame at `timestamp` seconds.
    async fn extract_frame(&self, video: &Path, timestamp: f64) -> Result<Vec<u8>, MediaError>;
}

/// Clamp a timestamp to `[0.05, d - 0.05]`, or `[0, d]` when the video is
/// too short for the margin.
pub fn clamp_video_timestamp(timestamp: f64, duration: f64) -> f64 {
    if duration.is_nan() || duration <= 0.0 {
        return 0.0;
    }
    let (mut lo, mut hi) = (EDGE_MARGIN, duration - EDGE_MARGIN);
    if hi < lo {
        lo = 0.0;
        hi = duration;
    }
    timestamp.clamp(lo, hi)
}

/// Timestamps at 20%, 50% and 80% of the video, clamped. Empty for a
/// non-positive duration.
pub fn video_frame_timestamps(duration: f64) -> Vec<f64> {
    if duration <= 0.0 || !duration.is_finite() {
        return Vec::new();
    }
    FRAME_OFFSETS
        .iter()
        .map(|offset| clamp_video_timestamp(duration * offset, duration))
        .collect()
}

/// Sample frames from a video. Timestamps that fail are skipped.
pub async fn extract_video_frames(
    extractor: &dyn FrameExtractor,
    video: &[u8],
) -> Result<Vec<Vec<u8>>, MediaError> {
    let path = spill(video).await?;
    let duration = extractor.probe_duration(&path).await?;
    let timestamps = video_frame_timestamps(duration);
    if timestamps.is_empty() {
        return Err(MediaError::InvalidDuration(duration));
    }

    let mut frames = Vec::with_capacity(timestamps.len());
    for ts in timestamps {
        match extractor.extract_frame(&path, ts).await {
            Ok(frame) => frames.push(frame),
            Err(e) => warn!("frame at {ts:.3}s skipped: {e}"),
        }
    }

    if frames.is_empty() {
        return Err(MediaError::NoFramesExtracted);
    }
    debug!("extracted {} frames from {duration:.2}s video", frames.len());
    Ok(frames)
}

/// Write the video to a temporary file that is removed on drop.
async fn spill(video: &[u8]) -> Result<tempfile::TempPath, MediaError> {
    let path = tempfile::Builder::new()
        .prefix("buddy-video-")
        .suffix(".mp4")
        .tempfile()
        .map_err(|e| MediaError::Tool(format!("failed to create temp file: {e}")))?
        .into_temp_path();
    tokio::fs::write(&path, video)
        .await
        .map_err(|e| MediaError::Tool(format!("failed to write temp file: {e}")))?;
    Ok(path)
}

/// `ffprobe`/`ffmpeg` backed extractor.
pub struct FfmpegExtractor {
    ffmpeg: String,
    ffprobe: String,
    timeout: Duration,
}

impl FfmpegExtractor {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout,
        }
    }

    /// Run a tool with the configured timeout; stdout on success.
    async fn run(&self, mut cmd: Command, label: &str) -> Result<Vec<u8>, MediaError> {
        cmd.kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                MediaError::Tool(format!(
                    "{label} timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| MediaError::Tool(format!("failed to run {label}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Tool(format!(
                "{label} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl FrameExtractor for FfmpegExtractor {
    async fn probe_duration(&self, video: &Path) -> Result<f64, MediaError> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(video);

        let stdout = self.run(cmd, "ffprobe").await?;
        parse_duration(&String::from_utf8_lossy(&stdout))
    }

    async fn extract_frame(&self, video: &Path, timestamp: f64) -> Result<Vec<u8>, MediaError> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-v", "error", "-ss", &format!("{timestamp:.3}"), "-i"])
            .arg(video)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "pipe:1"]);

        let frame = self.run(cmd, "ffmpeg").await?;
        if frame.is_empty() {
            return Err(MediaError::Tool("ffmpeg returned empty frame".into()));
        }
        Ok(frame)
    }
}

/// Parse ffprobe's bare duration output.
fn parse_duration(output: &str) -> Result<f64, MediaError> {
    let value = output.trim();
    if value.is_empty() {
        return Err(MediaError::Tool("ffprobe returned empty duration".into()));
    }
    let duration: f64 = value
        .parse()
        .map_err(|e| MediaError::Tool(format!("invalid duration {value:?}: {e}")))?;
    if duration <= 0.0 || !duration.is_finite() {
        return Err(MediaError::InvalidDuration(duration));
    }
    Ok(duration)
}
