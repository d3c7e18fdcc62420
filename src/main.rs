use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vidslice::config::{AudioFormat, Config};
use vidslice::{
    extract_segment, print_summary, probe_duration, run_batch, BatchConfig, FfmpegBackend,
    MediaBackend,
};

#[derive(Parser)]
#[command(name = "vidslice")]
#[command(version, about = "Slice videos into time-bounded segments")]
#[command(long_about = "Cut video and audio segments out of a media file with FFmpeg, either once or over a sliding window.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Cut a single segment
    Cut {
        /// Input video file
        input: PathBuf,

        /// Segment start (seconds, MM:SS or HH:MM:SS)
        #[arg(short, long, value_parser = parse_timestamp)]
        start: Duration,

        /// Segment end (seconds, MM:SS or HH:MM:SS)
        #[arg(short, long, value_parser = parse_timestamp)]
        end: Duration,

        /// Output video file (defaults to <input>_slice.mp4)
        #[arg(long)]
        video_out: Option<PathBuf>,

        /// Output audio file (defaults to <input>_slice.<audio format>)
        #[arg(long)]
        audio_out: Option<PathBuf>,
    },

    /// Cut consecutive windows across a time range
    Batch {
        /// Input video file
        input: PathBuf,

        /// Range start in seconds
        #[arg(short, long, default_value = "0")]
        start: u64,

        /// Range end in seconds
        #[arg(short, long)]
        end: u64,

        /// Window size in seconds
        #[arg(short, long)]
        window: u64,

        /// Destination for all produced segment files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Audio file format: mp3, wav, m4a, ogg, flac, opus
        #[arg(long)]
        audio_format: Option<String>,

        /// Write a JSON report of per-window outcomes
        #[arg(long)]
        report: Option<PathBuf>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Print a video's duration computed from frame count and frame rate
    Probe {
        /// Input video file
        input: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Parse `SS[.mmm]`, `MM:SS[.mmm]` or `HH:MM:SS[.mmm]`.
fn parse_timestamp(s: &str) -> std::result::Result<Duration, String> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() > 3 {
        return Err(format!("Invalid timestamp: {s}"));
    }

    let mut seconds = 0.0;
    for (i, part) in parts.iter().enumerate() {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| format!("Invalid timestamp: {s}"))?;
        if !value.is_finite() || value.is_sign_negative() {
            return Err(format!("Timestamp must be non-negative: {s}"));
        }
        // only the leading field may exceed its unit
        if i > 0 && value >= 60.0 {
            return Err(format!("Minutes and seconds must be below 60: {s}"));
        }
        seconds = seconds * 60.0 + value;
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| format!("Invalid timestamp: {s}"))
}

fn derive_output_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}_slice.{}", stem.to_string_lossy(), extension));
    output
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load and validate configuration
    let mut config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let backend = FfmpegBackend::from_config(&config);
    backend
        .check()
        .await
        .context("FFmpeg is required. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux)")?;

    match cli.command {
        Command::Cut {
            input,
            start,
            end,
            video_out,
            audio_out,
        } => {
            let video_out = video_out.unwrap_or_else(|| derive_output_path(&input, "mp4"));
            let audio_out = audio_out
                .unwrap_or_else(|| derive_output_path(&input, config.audio_format.extension()));

            let output = extract_segment(
                &backend,
                &input,
                &video_out,
                &audio_out,
                start,
                end,
                &config.encode_settings(),
            )
            .await
            .with_context(|| format!("Failed to slice {}", input.display()))?;

            info!("Video: {}", output.video.display());
            if let Some(audio) = output.audio {
                info!("Audio: {}", audio.display());
            }
        }
        Command::Batch {
            input,
            start,
            end,
            window,
            output_dir,
            audio_format,
            report,
            no_progress,
        } => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(format) = audio_format {
                config.audio_format = format
                    .parse::<AudioFormat>()
                    .map_err(|e: String| anyhow::anyhow!(e))?;
            }

            let batch_config = BatchConfig {
                show_progress: !no_progress,
                ..BatchConfig::from_config(&config)
            };

            let result = run_batch(&backend, &input, start, end, window, &batch_config)
                .await
                .context("Batch slicing failed")?;

            print_summary(&result);

            if let Some(path) = report {
                result
                    .write_json(&path)
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                info!("Report written to {}", path.display());
            }

            if result.failed() > 0 {
                anyhow::bail!("{} of {} windows failed", result.failed(), result.total());
            }
        }
        Command::Probe { input } => match probe_duration(&backend, &input).await? {
            Some(duration) => println!("{duration:.3}"),
            None => anyhow::bail!("Could not open video file: {}", input.display()),
        },
    }

    Ok(())
}
