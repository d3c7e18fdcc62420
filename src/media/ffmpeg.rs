use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, VidsliceError};

use super::{AudioStream, EncodeJob, EncodeTarget, MediaBackend, MediaInfo, VideoStream};

/// Check that `binary` runs and answers `-version`; `name` is used in messages.
pub async fn check_tool(binary: &str, name: &str) -> Result<()> {
    let output = Command::new(binary)
        .arg("-version")
        .output()
        .await
        .map_err(|e| {
            VidsliceError::ToolMissing(format!(
                "{name} not found at '{binary}'. Install FFmpeg or point the config at it. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(VidsliceError::ToolMissing(format!(
            "{name} at '{binary}' exited with {}",
            output.status
        )));
    }

    debug!("{} is available", name);
    Ok(())
}

/// [`MediaBackend`] driving the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegBackend {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ffmpeg_path.clone(), config.ffprobe_path.clone())
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn check(&self) -> Result<()> {
        check_tool(&self.ffmpeg, "FFmpeg").await?;
        check_tool(&self.ffprobe, "FFprobe").await
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration:stream=codec_type,codec_name,r_frame_rate,avg_frame_rate,nb_frames,sample_rate,channels",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| VidsliceError::ToolMissing(format!("Failed to run FFprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidsliceError::Load(format!(
                "FFprobe could not read {}: {}",
                path.display(),
                stderr.trim()
            )));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn count_frames(&self, path: &Path) -> Result<u64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_packets",
                "-show_entries",
                "stream=nb_read_packets",
                "-of",
                "csv=p=0",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| VidsliceError::ToolMissing(format!("Failed to run FFprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidsliceError::Load(format!(
                "FFprobe failed: {}",
                stderr.trim()
            )));
        }

        let count_str = String::from_utf8_lossy(&output.stdout);
        count_str.trim().trim_end_matches(',').parse().map_err(|e| {
            VidsliceError::InvalidMedia(format!(
                "Failed to parse frame count '{}': {e}",
                count_str.trim()
            ))
        })
    }

    async fn encode(&self, job: &EncodeJob<'_>) -> Result<()> {
        let args = encode_args(job);
        debug!("Running {} {:?}", self.ffmpeg, args);

        let output = Command::new(&self.ffmpeg)
            .args(&args)
            .output()
            .await
            .map_err(|e| VidsliceError::ToolMissing(format!("Failed to run FFmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidsliceError::Encode(format!(
                "FFmpeg failed writing {}: {}",
                job.output.display(),
                stderr.trim()
            )));
        }

        let written = tokio::fs::metadata(job.output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(VidsliceError::Encode(format!(
                "FFmpeg produced no output for {}",
                job.output.display()
            )));
        }

        Ok(())
    }

    fn release(&self, path: &Path) {
        debug!("Released {}", path.display());
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Build the ffmpeg argument list for an encode job.
///
/// Seeking happens before `-i`, which ffmpeg resolves frame-accurately when
/// re-encoding.
pub fn encode_args(job: &EncodeJob<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error", "-ss"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(format_seconds(job.start).into());
    args.push("-i".into());
    args.push(job.input.as_os_str().to_owned());
    if let Some(duration) = job.duration {
        args.push("-t".into());
        args.push(format_seconds(duration).into());
    }

    match &job.target {
        EncodeTarget::Video {
            video_codec,
            audio_codec,
        } => {
            args.push("-c:v".into());
            args.push(video_codec.into());
            match audio_codec {
                Some(codec) => {
                    args.push("-c:a".into());
                    args.push(codec.into());
                }
                None => args.push("-an".into()),
            }
        }
        EncodeTarget::Audio { codec } => {
            args.push("-vn".into());
            if let Some(codec) = codec {
                args.push("-c:a".into());
                args.push(codec.into());
            }
        }
    }

    args.push(job.output.as_os_str().to_owned());
    args
}

fn format_seconds(d: Duration) -> String {
    format!("{:.3}", d.as_secs_f64())
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output into [`MediaInfo`].
pub fn parse_probe_output(json: &str) -> Result<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    if probe.streams.is_empty() {
        return Err(VidsliceError::Load(
            "No decodable streams found".to_string(),
        ));
    }

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .map(|s| VideoStream {
            codec: s.codec_name.clone(),
            // avg_frame_rate is "0/0" for some containers, fall back to r_frame_rate
            frame_rate: [&s.avg_frame_rate, &s.r_frame_rate]
                .into_iter()
                .flatten()
                .filter_map(|r| r.parse::<super::FrameRate>().ok())
                .find(|r| r.as_f64().is_some()),
            frame_count: s.nb_frames.as_deref().and_then(|n| n.parse().ok()),
        });

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioStream {
            codec: s.codec_name.clone(),
            sample_rate: s.sample_rate.as_deref().and_then(|r| r.parse().ok()),
            channels: s.channels,
        });

    Ok(MediaInfo {
        duration,
        video,
        audio,
    })
}
