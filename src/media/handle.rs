use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, VidsliceError};

use super::{AudioStream, EncodeJob, EncodeTarget, MediaBackend, MediaInfo};

/// An open media source, or a sub-range view over one.
///
/// The handle is released exactly once, either through [`MediaHandle::close`]
/// or when it is dropped.
pub struct MediaHandle<'b> {
    backend: &'b dyn MediaBackend,
    path: PathBuf,
    info: MediaInfo,
    range: Option<(Duration, Duration)>,
    released: bool,
}

impl<'b> std::fmt::Debug for MediaHandle<'b> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHandle")
            .field("backend", &self.backend.name())
            .field("path", &self.path)
            .field("range", &self.range)
            .field("released", &self.released)
            .finish()
    }
}

impl<'b> MediaHandle<'b> {
    /// Open a media file, probing its streams.
    pub async fn open(backend: &'b dyn MediaBackend, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VidsliceError::FileNotFound(path.display().to_string()));
        }

        let info = backend.probe(path).await?;
        debug!(
            "Opened {} (duration: {:?}, video: {}, audio: {})",
            path.display(),
            info.duration,
            info.video.is_some(),
            info.has_audio()
        );

        Ok(Self {
            backend,
            path: path.to_path_buf(),
            info,
            range: None,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    /// Offset into the source where this handle begins.
    pub fn start(&self) -> Duration {
        self.range.map(|(start, _)| start).unwrap_or(Duration::ZERO)
    }

    /// Playable length of this handle, if known.
    pub fn duration(&self) -> Option<Duration> {
        match self.range {
            Some((start, end)) => Some(end - start),
            None => self.info.duration,
        }
    }

    /// Derive a view over `[start, end)`, relative to this handle.
    ///
    /// Bounds past the end of the source are passed through to the encoder.
    pub fn subclip(&self, start: Duration, end: Duration) -> Result<MediaHandle<'b>> {
        if end <= start {
            return Err(VidsliceError::InvalidRange(format!(
                "segment end ({:.3}s) must be after start ({:.3}s)",
                end.as_secs_f64(),
                start.as_secs_f64()
            )));
        }

        if let Some(available) = self.duration() {
            if end > available {
                warn!(
                    "Requested end {:.3}s is beyond the source duration {:.3}s; output may be truncated",
                    end.as_secs_f64(),
                    available.as_secs_f64()
                );
            }
        }

        let base = self.start();
        Ok(MediaHandle {
            backend: self.backend,
            path: self.path.clone(),
            info: self.info.clone(),
            range: Some((base + start, base + end)),
            released: false,
        })
    }

    /// The audio track of this handle, if the source has one.
    pub fn audio(&self) -> Option<AudioTrack<'_, 'b>> {
        self.info.audio.as_ref().map(|stream| AudioTrack {
            handle: self,
            stream,
        })
    }

    /// Encode this handle to `output`, muxing the audio track when present.
    pub async fn write_videofile(
        &self,
        output: &Path,
        video_codec: &str,
        audio_codec: &str,
    ) -> Result<()> {
        let target = EncodeTarget::Video {
            video_codec: video_codec.to_string(),
            audio_codec: self.info.has_audio().then(|| audio_codec.to_string()),
        };
        self.backend.encode(&self.job(output, target)).await
    }

    /// Release decode resources now.
    pub fn close(mut self) {
        self.release();
    }

    fn job<'a>(&'a self, output: &'a Path, target: EncodeTarget) -> EncodeJob<'a> {
        EncodeJob {
            input: &self.path,
            output,
            start: self.start(),
            duration: self.range.map(|(start, end)| end - start),
            target,
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.backend.release(&self.path);
    }
}

impl Drop for MediaHandle<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Audio track of a [`MediaHandle`].
#[derive(Debug)]
pub struct AudioTrack<'h, 'b> {
    handle: &'h MediaHandle<'b>,
    stream: &'h AudioStream,
}

impl AudioTrack<'_, '_> {
    pub fn stream(&self) -> &AudioStream {
        self.stream
    }

    /// Encode the audio track alone to `output`.
    ///
    /// Without an explicit codec the encoder is chosen from the output extension.
    pub async fn write_audiofile(&self, output: &Path, codec: Option<&str>) -> Result<()> {
        let target = EncodeTarget::Audio {
            codec: codec.map(str::to_string),
        };
        self.handle
            .backend
            .encode(&self.handle.job(output, target))
            .await
    }
}
