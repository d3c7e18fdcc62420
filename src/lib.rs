pub mod batch;
pub mod config;
pub mod error;
pub mod media;
pub mod probe;
pub mod segment;

pub use batch::{plan_windows, print_summary, run_batch, BatchConfig, BatchReport, Window};
pub use config::Config;
pub use error::{Result, VidsliceError};
pub use media::{FfmpegBackend, MediaBackend, MediaHandle};
pub use probe::{duration_from_frames, probe_duration};
pub use segment::{extract_segment, process_video, EncodeSettings, SegmentOutput};
