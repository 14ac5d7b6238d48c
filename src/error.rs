//! Error handling for the tape decoder
//!
//! Only fatal conditions are errors. Stage-local failures (bad checksums, missing
//! patches, framing trouble) are carried in the stage reports instead, so the
//! caller can still write out partial data.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for tape decoder operations
pub type Result<T> = std::result::Result<T, TapeError>;

/// Main error type for tape decoder operations
#[derive(Error, Debug)]
pub enum TapeError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Audio Errors
    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<hound::Error>,
    },

    #[error("Unsupported sample width in wave file: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Configuration Errors
    #[error("Invalid parameter '{param}': {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Invalid configuration file {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // Sysex Errors
    #[error("Malformed sysex file: {reason}")]
    MalformedSysex { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TapeError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            TapeError::FileNotFound { .. } => "FILE_NOT_FOUND",
            TapeError::FileReadError { .. } => "FILE_READ_ERROR",
            TapeError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            TapeError::InvalidAudio { .. } => "INVALID_AUDIO",
            TapeError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            TapeError::EmptyAudio => "EMPTY_AUDIO",
            TapeError::InvalidParameter { .. } => "INVALID_PARAMETER",
            TapeError::InvalidConfig { .. } => "INVALID_CONFIG",
            TapeError::MalformedSysex { .. } => "MALFORMED_SYSEX",
            TapeError::Io(_) => "IO_ERROR",
        }
    }

    /// Check if this error is recoverable by re-running with different input or settings
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TapeError::FileNotFound { .. }
                | TapeError::InvalidAudio { .. }
                | TapeError::UnsupportedFormat { .. }
                | TapeError::InvalidParameter { .. }
                | TapeError::InvalidConfig { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TapeError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            TapeError::InvalidAudio { .. } => vec![
                "Check if the file plays in another application",
                "Re-export the recording as a plain PCM WAV file",
            ],
            TapeError::UnsupportedFormat { .. } => vec![
                "Convert the recording to 16-bit integer PCM",
                "Supported sample widths: 8, 16, 24 and 32 bit integer",
            ],
            TapeError::EmptyAudio => vec![
                "The recording contains no samples - record the tape again",
            ],
            TapeError::InvalidParameter { .. } | TapeError::InvalidConfig { .. } => vec![
                "Check the configuration values against the documented ranges",
                "Remove the setting to fall back to the default",
            ],
            TapeError::MalformedSysex { .. } => vec![
                "Make sure the file is a raw .syx dump (F0 ... F7 messages)",
            ],
            _ => vec![],
        }
    }
}
