//! Loader error types
//!
//! Every failure of the loading pipeline is recovered at the loader boundary and
//! surfaced to the host as a single `onErrorRaised` event. The variants here carry
//! enough context to build that event's message.

use std::fmt;

use thiserror::Error;

use crate::fetch::FetchError;

/// Stable error codes reported alongside a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoResource,
    NoResourceType,
    InvalidResourceType,
    InvalidEncoding,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoResource => "NO_RESOURCE",
            ErrorKind::NoResourceType => "NO_RESOURCE_TYPE",
            ErrorKind::InvalidResourceType => "INVALID_RESOURCE_TYPE",
            ErrorKind::InvalidEncoding => "INVALID_ENCODING",
            ErrorKind::Io => "IO",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified loader error type
#[derive(Debug, Error)]
pub enum LoadError {
    /// `render()` was called before a source was set
    #[error("source is not defined")]
    NoResource,

    /// `render()` was called before a resource type was set
    #[error("resourceType is not defined")]
    NoResourceType,

    /// Resource type is not one of `url`, `base64`, `file`
    #[error("resourceType is invalid: {0}")]
    InvalidResourceType(String),

    /// Inline payload is not valid base64
    #[error("data is not in valid Base64 scheme")]
    InvalidEncoding(#[source] base64::DecodeError),

    /// Local file or bundled asset could not be opened
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote transfer failed
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    /// Transient file could not be created in the cache directory
    #[error("cannot create download file: {0}")]
    TempFile(#[source] std::io::Error),

    /// Transient file could not be removed
    #[error("cannot delete downloaded file: {0}")]
    Cleanup(#[source] std::io::Error),

    /// Renderer refused the handoff
    #[error("renderer rejected document: {0}")]
    Handoff(#[source] std::io::Error),
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::NoResource => ErrorKind::NoResource,
            LoadError::NoResourceType => ErrorKind::NoResourceType,
            LoadError::InvalidResourceType(_) => ErrorKind::InvalidResourceType,
            LoadError::InvalidEncoding(_) => ErrorKind::InvalidEncoding,
            LoadError::Open { .. }
            | LoadError::Fetch(_)
            | LoadError::TempFile(_)
            | LoadError::Cleanup(_)
            | LoadError::Handoff(_) => ErrorKind::Io,
        }
    }

    /// Message delivered in the host `onErrorRaised` payload
    pub fn host_message(&self) -> String {
        format!("error: {}", self)
    }
}

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoadError>;
