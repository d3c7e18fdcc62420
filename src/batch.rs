use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AudioFormat, Config};
use crate::error::{Result, VidsliceError};
use crate::media::MediaBackend;
use crate::segment::{extract_segment, EncodeSettings, SegmentOutput};

/// One step of the sliding window, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: u64,
    pub end: u64,
}

impl Window {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn start_time(&self) -> Duration {
        Duration::from_secs(self.start)
    }

    pub fn end_time(&self) -> Duration {
        Duration::from_secs(self.end)
    }

    pub fn video_file_name(&self) -> String {
        format!("video_{}_{}.mp4", self.start, self.end)
    }

    pub fn audio_file_name(&self, format: AudioFormat) -> String {
        format!("audio_{}_{}.{}", self.start, self.end, format.extension())
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}s, {}s)", self.start, self.end)
    }
}

/// Partition `[start, end)` into consecutive windows of `window_size` seconds.
///
/// The last window is clipped to `end`. An empty or inverted range yields no
/// windows.
pub fn plan_windows(start: u64, end: u64, window_size: u64) -> Result<Vec<Window>> {
    if window_size == 0 {
        return Err(VidsliceError::InvalidRange(
            "window size must be greater than 0".to_string(),
        ));
    }

    let mut windows = Vec::new();
    let mut current = start;

    while current < end {
        let window_end = current.saturating_add(window_size).min(end);
        windows.push(Window::new(current, window_end));
        current = window_end;
    }

    Ok(windows)
}

/// Configuration for a batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Destination for all produced segment files.
    pub output_dir: PathBuf,
    pub encode: EncodeSettings,
    pub audio_format: AudioFormat,
    /// Show a progress bar.
    pub show_progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BatchConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            encode: config.encode_settings(),
            audio_format: config.audio_format,
            show_progress: true,
        }
    }

    pub fn video_path(&self, window: &Window) -> PathBuf {
        self.output_dir.join(window.video_file_name())
    }

    pub fn audio_path(&self, window: &Window) -> PathBuf {
        self.output_dir.join(window.audio_file_name(self.audio_format))
    }
}

/// Result of extracting a single window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowOutcome {
    pub window: Window,
    pub output: Option<SegmentOutput>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl WindowOutcome {
    pub fn is_success(&self) -> bool {
        self.output.is_some()
    }
}

/// Outcome of a whole batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub window_size: u64,
    pub outcomes: Vec<WindowOutcome>,
    pub total_time_ms: u64,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &WindowOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Slice `input` over `[start, end)` in windows of `window_size` seconds.
///
/// Each window is extracted in turn; a failing window is recorded in the
/// report and the run moves on to the next one.
pub async fn run_batch(
    backend: &dyn MediaBackend,
    input: &Path,
    start: u64,
    end: u64,
    window_size: u64,
    config: &BatchConfig,
) -> Result<BatchReport> {
    let run_start = Instant::now();
    let windows = plan_windows(start, end, window_size)?;

    if windows.is_empty() {
        warn!("No windows to process for range {}s..{}s", start, end);
    }

    std::fs::create_dir_all(&config.output_dir)?;
    debug!("Output directory: {}", config.output_dir.display());

    info!(
        "Slicing {} into {} windows of {}s",
        input.display(),
        windows.len(),
        window_size
    );

    let progress_bar = if config.show_progress && !windows.is_empty() {
        let pb = ProgressBar::new(windows.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} windows {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut outcomes = Vec::with_capacity(windows.len());

    for window in windows {
        if let Some(ref pb) = progress_bar {
            pb.set_message(window.to_string());
        }
        info!("Processing window {}", window);

        let window_start = Instant::now();
        let result = extract_segment(
            backend,
            input,
            &config.video_path(&window),
            &config.audio_path(&window),
            window.start_time(),
            window.end_time(),
            &config.encode,
        )
        .await;
        let duration_ms = window_start.elapsed().as_millis() as u64;

        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }

        let outcome = match result {
            Ok(output) => WindowOutcome {
                window,
                output: Some(output),
                error: None,
                duration_ms,
            },
            Err(e) => {
                warn!("Window {} failed: {}", window, e);
                WindowOutcome {
                    window,
                    output: None,
                    error: Some(e.to_string()),
                    duration_ms,
                }
            }
        };
        outcomes.push(outcome);
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("done");
    }

    let report = BatchReport {
        input: input.to_path_buf(),
        output_dir: config.output_dir.clone(),
        window_size,
        outcomes,
        total_time_ms: run_start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} windows succeeded",
        report.succeeded(),
        report.total()
    );

    Ok(report)
}

/// Print a summary of a batch run.
pub fn print_summary(report: &BatchReport) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Slicing Complete                          ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Input:      {}", report.input.display());
    println!("  Output:     {}", report.output_dir.display());
    println!("  Window:     {}s", report.window_size);
    println!(
        "  Segments:   {} ok, {} failed",
        style(report.succeeded()).green(),
        style(report.failed()).red()
    );
    println!(
        "  Total:      {:.2}s",
        Duration::from_millis(report.total_time_ms).as_secs_f64()
    );

    if report.failed() > 0 {
        println!();
        println!("  Failures:");
        for outcome in report.failures() {
            println!(
                "    {} {}",
                style(outcome.window).yellow(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
