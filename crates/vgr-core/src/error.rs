use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No frame data supplied")]
    NoFrameData,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid byte pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid header registration {header}: {message}")]
    InvalidHeader { header: String, message: String },

    #[error("Truth record not found for replay: {0}")]
    TruthNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
