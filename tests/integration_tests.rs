//! Integration tests for vidslice
//!
//! The FFmpeg tests build a tiny synthetic source with lavfi and skip
//! themselves when the required binaries or encoders are missing.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;
use vidslice::config::{AudioFormat, Config};
use vidslice::{
    extract_segment, plan_windows, probe_duration, run_batch, BatchConfig, BatchReport,
    EncodeSettings, FfmpegBackend, MediaHandle, Window,
};

// ============================================================================
// Windowing Tests
// ============================================================================

mod windowing_tests {
    use super::*;

    #[test]
    fn test_windows_are_exhaustive_and_non_overlapping() {
        let windows = plan_windows(0, 10, 3).unwrap();

        assert_eq!(windows.first().unwrap().start, 0);
        assert_eq!(windows.last().unwrap().end, 10);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!(windows.iter().all(|w| w.len() <= 3 && !w.is_empty()));
        assert_eq!(windows.last().unwrap().len(), 1);
    }

    #[test]
    fn test_windows_with_offset_start() {
        let windows = plan_windows(30, 100, 30).unwrap();
        assert_eq!(
            windows,
            vec![Window::new(30, 60), Window::new(60, 90), Window::new(90, 100)]
        );
    }

    #[test]
    fn test_output_names_follow_window_bounds() {
        let config = BatchConfig {
            output_dir: PathBuf::from("clips"),
            audio_format: AudioFormat::Wav,
            ..Default::default()
        };
        let window = Window::new(6, 9);

        assert_eq!(config.video_path(&window), PathBuf::from("clips/video_6_9.mp4"));
        assert_eq!(config.audio_path(&window), PathBuf::from("clips/audio_6_9.wav"));
    }
}

// ============================================================================
// Config Integration Tests
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_batch_config_from_config() {
        let mut config = Config::default();
        config.output_dir = PathBuf::from("elsewhere");
        config.video_codec = "libx265".to_string();

        let batch = BatchConfig::from_config(&config);
        assert_eq!(batch.output_dir, PathBuf::from("elsewhere"));
        assert_eq!(batch.encode.video_codec, "libx265");
        assert_eq!(batch.encode.audio_codec, "aac");
        assert!(batch.show_progress);
    }

    #[test]
    fn test_config_file_round_trip() {
        let config = Config::from_toml(
            r#"
            output_dir = "segments"
            audio_format = "flac"
            audio_file_codec = "flac"
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.ffprobe_path, "ffprobe");
        assert_eq!(
            config.encode_settings().audio_file_codec.as_deref(),
            Some("flac")
        );
    }
}

// ============================================================================
// Report Tests
// ============================================================================

mod report_tests {
    use super::*;
    use vidslice::batch::WindowOutcome;
    use vidslice::SegmentOutput;

    fn sample_report() -> BatchReport {
        BatchReport {
            input: PathBuf::from("talk.mp4"),
            output_dir: PathBuf::from("output_segments"),
            window_size: 3,
            outcomes: vec![
                WindowOutcome {
                    window: Window::new(0, 3),
                    output: Some(SegmentOutput {
                        video: PathBuf::from("output_segments/video_0_3.mp4"),
                        audio: None,
                    }),
                    error: None,
                    duration_ms: 120,
                },
                WindowOutcome {
                    window: Window::new(3, 5),
                    output: None,
                    error: Some("Encoding failed: disk full".to_string()),
                    duration_ms: 40,
                },
            ],
            total_time_ms: 160,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = sample_report();
        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_report_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");

        sample_report().write_json(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"window_size\": 3"));
        assert!(json.contains("disk full"));

        let parsed: BatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.outcomes[1].window, Window::new(3, 5));
    }
}

// ============================================================================
// FFmpeg End-to-End Tests
// ============================================================================

mod ffmpeg_tests {
    use super::*;

    fn encoders_available() -> bool {
        let probe_ok = Command::new("ffprobe")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        let encoders = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).into_owned())
            .unwrap_or_default();

        probe_ok && encoders.contains("libx264") && encoders.contains("libmp3lame")
    }

    /// Generate a 4 second 25 fps test clip, optionally with a sine tone.
    fn make_source(dir: &Path, with_audio: bool) -> Option<PathBuf> {
        let path = dir.join(if with_audio { "tone.mp4" } else { "silent.mp4" });
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(["-f", "lavfi", "-i", "testsrc=duration=4:size=160x120:rate=25"]);
        if with_audio {
            cmd.args(["-f", "lavfi", "-i", "sine=frequency=440:duration=4"])
                .args(["-c:a", "aac", "-shortest"]);
        }
        cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p"]).arg(&path);

        let ok = cmd.status().map(|s| s.success()).unwrap_or(false);
        ok.then_some(path)
    }

    #[tokio::test]
    async fn test_probe_real_file() {
        if !encoders_available() {
            eprintln!("Skipping test: FFmpeg with libx264/libmp3lame not available");
            return;
        }
        let dir = TempDir::new().unwrap();
        let Some(source) = make_source(dir.path(), false) else {
            eprintln!("Skipping test: could not generate source clip");
            return;
        };

        let duration = probe_duration(&FfmpegBackend::default(), &source)
            .await
            .unwrap()
            .unwrap();
        assert!((duration - 4.0).abs() <= 2.0 / 25.0, "duration was {duration}");
    }

    #[tokio::test]
    async fn test_segment_duration_matches_request() {
        if !encoders_available() {
            eprintln!("Skipping test: FFmpeg with libx264/libmp3lame not available");
            return;
        }
        let dir = TempDir::new().unwrap();
        let Some(source) = make_source(dir.path(), true) else {
            eprintln!("Skipping test: could not generate source clip");
            return;
        };
        let backend = FfmpegBackend::default();
        let video = dir.path().join("cut.mp4");
        let audio = dir.path().join("cut.mp3");

        let output = extract_segment(
            &backend,
            &source,
            &video,
            &audio,
            Duration::from_secs(1),
            Duration::from_secs(3),
            &EncodeSettings::default(),
        )
        .await
        .unwrap();

        assert!(output.audio.is_some());
        let duration = probe_duration(&backend, &video).await.unwrap().unwrap();
        assert!((duration - 2.0).abs() <= 2.0 / 25.0, "duration was {duration}");

        let audio_handle = MediaHandle::open(&backend, &audio).await.unwrap();
        assert!(audio_handle.info().has_audio());
        let audio_duration = audio_handle.info().duration.unwrap().as_secs_f64();
        // one frame interval plus mp3 encoder padding
        assert!(
            (audio_duration - duration).abs() <= 1.0 / 25.0 + 0.05,
            "audio {audio_duration}s vs video {duration}s"
        );
    }

    #[tokio::test]
    async fn test_batch_on_silent_source() {
        if !encoders_available() {
            eprintln!("Skipping test: FFmpeg with libx264/libmp3lame not available");
            return;
        }
        let dir = TempDir::new().unwrap();
        let Some(source) = make_source(dir.path(), false) else {
            eprintln!("Skipping test: could not generate source clip");
            return;
        };
        let out = dir.path().join("output_segments");
        let config = BatchConfig {
            output_dir: out.clone(),
            show_progress: false,
            ..Default::default()
        };

        let report = run_batch(&FfmpegBackend::default(), &source, 0, 4, 3, &config)
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 2, "failures: {:?}", report.outcomes);
        assert!(out.join("video_0_3.mp4").exists());
        assert!(out.join("video_3_4.mp4").exists());
        assert!(!out.join("audio_0_3.mp3").exists());
    }
}
