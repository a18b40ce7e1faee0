//! Unified error type for alwaysconvert.
//!
//! Every stage of a conversion batch funnels its failure into [`Error`]. The
//! HTTP boundary derives a status code via [`Error::http_status`]; anything
//! other than a caller mistake lands in the 500 class.

use std::path::{Path, PathBuf};

/// Unified error type covering all failure modes of a conversion batch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Persisting an upload to its scratch path failed.
    #[error("failed to write upload to {}: {source}", path.display())]
    UploadWrite {
        /// Scratch path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The external conversion engine reported a failure.
    #[error("conversion failed [{tool}]: {message}")]
    ConversionEngine {
        /// Name of the engine that failed (e.g. "ffmpeg").
        tool: String,
        /// Diagnostic detail from the engine.
        message: String,
    },

    /// Building the output archive failed.
    #[error("archive error: {0}")]
    Archive(String),

    /// Request data failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// An I/O operation outside of upload persistence failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::UploadWrite { .. } => 500,
            Error::ConversionEngine { .. } => 500,
            Error::Archive(_) => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::UploadWrite { .. } => "upload_write_error",
            Error::ConversionEngine { .. } => "conversion_error",
            Error::Archive(_) => "archive_error",
            Error::Validation(_) => "validation_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::UploadWrite`].
    pub fn upload_write(path: &Path, source: std::io::Error) -> Self {
        Error::UploadWrite {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for [`Error::ConversionEngine`].
    pub fn engine(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConversionEngine {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Archive`].
    pub fn archive(message: impl std::fmt::Display) -> Self {
        Error::Archive(message.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
