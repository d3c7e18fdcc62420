use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidsliceError {
    #[error("Failed to load media: {0}")]
    Load(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("{0}")]
    ToolMissing(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl VidsliceError {
    /// Whether the error means the source could not be opened at all.
    pub fn is_unopenable(&self) -> bool {
        matches!(self, VidsliceError::Load(_) | VidsliceError::FileNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, VidsliceError>;
