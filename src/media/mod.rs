pub mod ffmpeg;
pub mod handle;

pub use ffmpeg::{check_tool, FfmpegBackend};
pub use handle::{AudioTrack, MediaHandle};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Frame rate as a rational, e.g. `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Frames per second, or `None` when either term is zero.
    pub fn as_f64(&self) -> Option<f64> {
        if self.num == 0 || self.den == 0 {
            return None;
        }
        Some(self.num as f64 / self.den as f64)
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl std::str::FromStr for FrameRate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (num, den) = s.split_once('/').unwrap_or((s, "1"));
        let num = num
            .trim()
            .parse()
            .map_err(|e| format!("Invalid frame rate '{s}': {e}"))?;
        let den = den
            .trim()
            .parse()
            .map_err(|e| format!("Invalid frame rate '{s}': {e}"))?;
        Ok(FrameRate { num, den })
    }
}

/// First video stream of a container.
#[derive(Debug, Clone, Default)]
pub struct VideoStream {
    pub codec: Option<String>,
    pub frame_rate: Option<FrameRate>,
    /// Frame count as recorded by the container, when it records one.
    pub frame_count: Option<u64>,
}

/// First audio stream of a container.
#[derive(Debug, Clone, Default)]
pub struct AudioStream {
    pub codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Probed metadata about a media file.
#[derive(Debug, Clone, Default)]
pub struct MediaInfo {
    pub duration: Option<Duration>,
    pub video: Option<VideoStream>,
    pub audio: Option<AudioStream>,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// What an encode run should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeTarget {
    /// Video file; the audio track is muxed in only when `audio_codec` is set.
    Video {
        video_codec: String,
        audio_codec: Option<String>,
    },
    /// Audio-only file. Without a codec the encoder is picked from the extension.
    Audio { codec: Option<String> },
}

/// A single encode of `input[start, start + duration)` into `output`.
#[derive(Debug, Clone)]
pub struct EncodeJob<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub start: Duration,
    /// `None` encodes to the end of the source.
    pub duration: Option<Duration>,
    pub target: EncodeTarget,
}

/// Decode/encode engine behind [`MediaHandle`].
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Verify the engine is usable.
    async fn check(&self) -> Result<()> {
        Ok(())
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Count video frames by demuxing, for containers without a frame count.
    async fn count_frames(&self, path: &Path) -> Result<u64>;

    async fn encode(&self, job: &EncodeJob<'_>) -> Result<()>;

    /// Called exactly once when a handle over `path` is released.
    fn release(&self, _path: &Path) {}

    fn name(&self) -> &'static str;
}
