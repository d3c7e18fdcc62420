use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::TempPath;
use tracing::{debug, error, info, warn};

use crate::config::{AudioFormat, DEFAULT_AUDIO_CODEC, DEFAULT_VIDEO_CODEC};
use crate::error::{Result, VidsliceError};
use crate::media::{MediaBackend, MediaHandle};

/// Codecs used when writing a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub video_codec: String,
    /// Codec for the audio track muxed into the video file.
    pub audio_codec: String,
    /// Codec for the standalone audio file. Inferred from its extension when unset.
    pub audio_file_codec: Option<String>,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_file_codec: None,
        }
    }
}

impl EncodeSettings {
    /// Encoder for a standalone audio file at `path`.
    pub fn audio_file_codec_for(&self, path: &Path) -> Option<String> {
        self.audio_file_codec.clone().or_else(|| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .and_then(AudioFormat::from_extension)
                .map(|format| format.codec().to_string())
        })
    }
}

/// Files written by one segment extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentOutput {
    pub video: PathBuf,
    /// `None` when the segment has no audio track.
    pub audio: Option<PathBuf>,
}

/// Cut `[start, end)` out of `input`, writing the video to `output_video` and,
/// when the source has an audio track, the audio alone to `output_audio`.
///
/// Outputs are encoded into temporary files next to their destination and
/// only moved into place once every encode has succeeded, so a failed call
/// leaves no partial files behind.
pub async fn extract_segment(
    backend: &dyn MediaBackend,
    input: &Path,
    output_video: &Path,
    output_audio: &Path,
    start: Duration,
    end: Duration,
    settings: &EncodeSettings,
) -> Result<SegmentOutput> {
    info!("Loading video: {}", input.display());
    let video = MediaHandle::open(backend, input).await?;
    let sliced = video.subclip(start, end)?;

    info!("Saving sliced video to: {}", output_video.display());
    let staged_video = stage(output_video)?;
    sliced
        .write_videofile(&staged_video, &settings.video_codec, &settings.audio_codec)
        .await?;

    info!("Extracting audio to: {}", output_audio.display());
    let staged_audio = match sliced.audio() {
        Some(track) => {
            debug!("Audio track codec: {:?}", track.stream().codec);
            let staged = stage(output_audio)?;
            let codec = settings.audio_file_codec_for(output_audio);
            track.write_audiofile(&staged, codec.as_deref()).await?;
            Some(staged)
        }
        None => {
            warn!("The video slice has no audio track");
            None
        }
    };

    sliced.close();
    video.close();

    let audio = commit(staged_video, output_video, staged_audio, output_audio)?;

    info!("Done!");
    Ok(SegmentOutput {
        video: output_video.to_path_buf(),
        audio,
    })
}

/// Best-effort variant of [`extract_segment`]: failures are logged and
/// reported as `None`.
pub async fn process_video(
    backend: &dyn MediaBackend,
    input: &Path,
    output_video: &Path,
    output_audio: &Path,
    start: Duration,
    end: Duration,
    settings: &EncodeSettings,
) -> Option<SegmentOutput> {
    match extract_segment(backend, input, output_video, output_audio, start, end, settings).await
    {
        Ok(output) => Some(output),
        Err(e) => {
            error!("An error occurred: {e}");
            None
        }
    }
}

/// Reserve a hidden temporary file beside `target`, keeping its extension so
/// the muxer can be inferred from the name.
fn stage(target: &Path) -> Result<TempPath> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let suffix = target
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let file = tempfile::Builder::new()
        .prefix(".vidslice-")
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(|e| {
            VidsliceError::Encode(format!(
                "Cannot create output file in {}: {e}",
                dir.display()
            ))
        })?;
    Ok(file.into_temp_path())
}

fn persist(staged: TempPath, target: &Path) -> Result<()> {
    staged.persist(target).map_err(|e| VidsliceError::Io(e.error))
}

/// Move staged outputs into place as a unit.
///
/// A previous video at `output_video` is set aside first and restored if
/// either move fails.
fn commit(
    staged_video: TempPath,
    output_video: &Path,
    staged_audio: Option<TempPath>,
    output_audio: &Path,
) -> Result<Option<PathBuf>> {
    let backup = if output_video.is_file() {
        let backup = stage(output_video)?;
        std::fs::rename(output_video, &backup)?;
        Some(backup)
    } else {
        None
    };

    let moved = persist(staged_video, output_video).and_then(|()| match staged_audio {
        Some(staged) => persist(staged, output_audio).map(|()| Some(output_audio.to_path_buf())),
        None => Ok(None),
    });

    match moved {
        Ok(audio) => Ok(audio),
        Err(e) => {
            if output_video.is_file() {
                let _ = std::fs::remove_file(output_video);
            }
            if let Some(backup) = backup {
                if let Err(restore) = persist(backup, output_video) {
                    warn!(
                        "Could not restore previous {}: {}",
                        output_video.display(),
                        restore
                    );
                }
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_settings_default() {
        let settings = EncodeSettings::default();
        assert_eq!(settings.video_codec, "libx264");
        assert_eq!(settings.audio_codec, "aac");
        assert!(settings.audio_file_codec.is_none());
    }

    #[test]
    fn test_audio_codec_inferred_from_extension() {
        let settings = EncodeSettings::default();
        assert_eq!(
            settings.audio_file_codec_for(Path::new("out/audio_0_3.mp3")),
            Some("libmp3lame".to_string())
        );
        assert_eq!(
            settings.audio_file_codec_for(Path::new("clip.wav")),
            Some("pcm_s16le".to_string())
        );
        assert_eq!(settings.audio_file_codec_for(Path::new("clip.xyz")), None);
    }

    #[test]
    fn test_audio_codec_override() {
        let settings = EncodeSettings {
            audio_file_codec: Some("libshine".to_string()),
            ..Default::default()
        };
        assert_eq!(
            settings.audio_file_codec_for(Path::new("clip.mp3")),
            Some("libshine".to_string())
        );
    }

    #[test]
    fn test_stage_keeps_extension_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("video_0_3.mp4");

        let staged = stage(&target).unwrap();
        let staged_path = staged.to_path_buf();
        assert_eq!(staged_path.parent(), Some(dir.path()));
        assert_eq!(staged_path.extension().unwrap(), "mp4");
        assert!(staged_path.exists());

        drop(staged);
        assert!(!staged_path.exists());
        assert!(!target.exists());
    }

    #[test]
    fn test_persist_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("video_0_3.mp4");
        std::fs::write(&target, b"old").unwrap();

        let staged = stage(&target).unwrap();
        std::fs::write(&staged, b"new").unwrap();
        persist(staged, &target).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }
}
