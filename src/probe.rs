use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, VidsliceError};
use crate::media::{MediaBackend, MediaHandle};

/// Playback duration in seconds for `frame_count` frames at `fps`.
pub fn duration_from_frames(frame_count: u64, fps: f64) -> Result<f64> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(VidsliceError::InvalidMedia(format!(
            "frame rate must be positive, got {fps}"
        )));
    }
    Ok(frame_count as f64 / fps)
}

/// Report the duration of a video from its frame count and frame rate.
///
/// Returns `Ok(None)` when the file cannot be opened.
pub async fn probe_duration(backend: &dyn MediaBackend, path: &Path) -> Result<Option<f64>> {
    let handle = match MediaHandle::open(backend, path).await {
        Ok(handle) => handle,
        Err(e) if e.is_unopenable() => {
            warn!("Could not open video file {}: {}", path.display(), e);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let (frame_rate, frame_count) = match &handle.info().video {
        Some(video) => (video.frame_rate, video.frame_count),
        None => {
            return Err(VidsliceError::InvalidMedia(format!(
                "{} has no video stream",
                path.display()
            )))
        }
    };

    let fps = frame_rate.and_then(|r| r.as_f64()).ok_or_else(|| {
        VidsliceError::InvalidMedia(format!("{} has no usable frame rate", path.display()))
    })?;

    let frame_count = match frame_count {
        Some(count) => count,
        None => {
            debug!("Container has no frame count, counting packets");
            backend.count_frames(path).await?
        }
    };

    let duration = duration_from_frames(frame_count, fps)?;
    info!(
        "Video duration: {:.3} seconds ({} frames at {:.3} fps)",
        duration, frame_count, fps
    );

    handle.close();
    Ok(Some(duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_frames() {
        assert_eq!(duration_from_frames(300, 30.0).unwrap(), 10.0);
        assert_eq!(duration_from_frames(0, 25.0).unwrap(), 0.0);

        let ntsc = duration_from_frames(1001, 30000.0 / 1001.0).unwrap();
        assert!((ntsc - 33.3667).abs() < 1e-3);
    }

    #[test]
    fn test_duration_from_frames_zero_rate() {
        assert!(matches!(
            duration_from_frames(300, 0.0),
            Err(VidsliceError::InvalidMedia(_))
        ));
        assert!(duration_from_frames(300, f64::NAN).is_err());
        assert!(duration_from_frames(300, -30.0).is_err());
    }
}
