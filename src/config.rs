use crate::error::{Result, VidsliceError};
use crate::segment::EncodeSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_OUTPUT_DIR: &str = "output_segments";
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";

/// Container used for the standalone audio file of each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    M4a,
    Ogg,
    Flac,
    Opus,
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "wav" => Ok(AudioFormat::Wav),
            "m4a" | "aac" => Ok(AudioFormat::M4a),
            "ogg" => Ok(AudioFormat::Ogg),
            "flac" => Ok(AudioFormat::Flac),
            "opus" => Ok(AudioFormat::Opus),
            _ => Err(format!(
                "Unknown audio format: {}. Use 'mp3', 'wav', 'm4a', 'ogg', 'flac' or 'opus'",
                s
            )),
        }
    }
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::M4a => "m4a",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
            AudioFormat::Opus => "opus",
        }
    }

    /// FFmpeg encoder conventionally used for this container.
    pub fn codec(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::Wav => "pcm_s16le",
            AudioFormat::M4a => "aac",
            AudioFormat::Ogg => "libvorbis",
            AudioFormat::Flac => "flac",
            AudioFormat::Opus => "libopus",
        }
    }

    /// Infer the format from a file extension, if it is one we know.
    pub fn from_extension(ext: &str) -> Option<Self> {
        ext.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination for all produced segment files.
    pub output_dir: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_format: AudioFormat,
    /// Overrides the encoder inferred from the audio file extension.
    pub audio_file_codec: Option<String>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_format: AudioFormat::default(),
            audio_file_codec: None,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = Self::from_toml(&contents)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str::<Config>(contents)?)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("VIDSLICE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(codec) = std::env::var("VIDSLICE_VIDEO_CODEC") {
            self.video_codec = codec;
        }
        if let Ok(codec) = std::env::var("VIDSLICE_AUDIO_CODEC") {
            self.audio_codec = codec;
        }
        if let Ok(path) = std::env::var("VIDSLICE_FFMPEG") {
            self.ffmpeg_path = path;
        }
        if let Ok(path) = std::env::var("VIDSLICE_FFPROBE") {
            self.ffprobe_path = path;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.video_codec.trim().is_empty() {
            return Err(VidsliceError::Config(
                "video_codec must not be empty".to_string(),
            ));
        }
        if self.audio_codec.trim().is_empty() {
            return Err(VidsliceError::Config(
                "audio_codec must not be empty".to_string(),
            ));
        }
        if matches!(&self.audio_file_codec, Some(c) if c.trim().is_empty()) {
            return Err(VidsliceError::Config(
                "audio_file_codec must not be empty when set".to_string(),
            ));
        }
        if self.ffmpeg_path.trim().is_empty() || self.ffprobe_path.trim().is_empty() {
            return Err(VidsliceError::Config(
                "ffmpeg_path and ffprobe_path must not be empty".to_string(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(VidsliceError::Config(
                "output_dir must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            audio_file_codec: self.audio_file_codec.clone(),
        }
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vidslice").join("config.toml"))
    }
}
