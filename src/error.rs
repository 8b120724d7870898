//! Error types shared by the capture, decode and export paths
//!
//! Every failure that crosses the public boundary can be flattened into a
//! [`DecodeError`]: a short human-readable message plus an optional
//! machine-readable [`ErrorCode`]. Component-specific enums keep the richer
//! detail and convert with `From`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable classification of a [`DecodeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Permission denied or generic camera acquisition failure
    CameraError,
    /// The platform has no camera or enumeration capability
    NotSupported,
    /// Enumeration returned zero video devices
    NoDevice,
    /// The image byte source could not be read
    FileReadError,
    /// Decode failure distinct from a benign not-found
    DecodeError,
    /// Anything else
    Unknown,
}

impl ErrorCode {
    /// Wire name of the code (`CAMERA_ERROR`, `NO_DEVICE`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CameraError => "CAMERA_ERROR",
            ErrorCode::NotSupported => "NOT_SUPPORTED",
            ErrorCode::NoDevice => "NO_DEVICE",
            ErrorCode::FileReadError => "FILE_READ_ERROR",
            ErrorCode::DecodeError => "DECODE_ERROR",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure, surfaced once per occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct DecodeError {
    /// Short human-readable message
    pub message: String,
    /// Optional machine-readable code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl DecodeError {
    /// Create an error with a code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Create an error without a code
    pub fn uncoded(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Check the error against a code
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == Some(code)
    }
}

/// Failures reported by a camera platform
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The capability (camera access or enumeration) does not exist here
    #[error("camera access is not supported on this platform")]
    Unsupported,

    /// The user or OS refused access to the device
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    /// Device busy, unplugged or otherwise unavailable
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    /// The stream produced its last frame
    #[error("camera stream ended")]
    StreamEnded,
}

impl From<PlatformError> for DecodeError {
    fn from(err: PlatformError) -> Self {
        let code = match err {
            PlatformError::Unsupported => ErrorCode::NotSupported,
            _ => ErrorCode::CameraError,
        };
        DecodeError::new(code, err.to_string())
    }
}

/// Failures returned by [`crate::scanner::Scanner::start`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// `start()` was called while a session is Active
    #[error("a capture session is already running")]
    AlreadyRunning,

    /// Start-up failed; the scanner is back to Idle
    #[error(transparent)]
    Capture(#[from] DecodeError),
}

impl ScanError {
    /// Code of the underlying capture failure, if any
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ScanError::AlreadyRunning => None,
            ScanError::Capture(err) => err.code,
        }
    }
}
