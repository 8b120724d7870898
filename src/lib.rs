//! roast_scan - optical code capture and record resolution
//!
//! Scans QR codes from a live camera or from image files and resolves the
//! decoded text into inventory records; generates code images for records.
//!
//! ```text
//!   camera ─▶ Scanner ─┐
//!                       ├─▶ DecodeResult ─▶ resolve() ─▶ ResolvedRecord
//!   image  ─▶ ImageScanner ┘
//!
//!   record ─▶ CodeGenerator ─▶ ImageHandle (display / download / print)
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Camera platform seams and backends
pub mod camera;
/// Environment-driven settings
pub mod config;
/// Frame and image decoding
pub mod decoder;
/// Camera enumeration and selection
pub mod device;
/// Shared error types
pub mod error;
/// Code image generation and export
pub mod generator;
/// Core data structures (DecodeResult, DeviceDescriptor, records)
pub mod models;
/// Decoded text to record resolution
pub mod resolver;
/// Live capture sessions
pub mod scanner;
/// Image loading and dataset helpers
pub mod tools;
/// Utility functions (grayscale)
pub mod utils;

#[cfg(test)]
#[path = "../tests/common/symbols.rs"]
pub(crate) mod test_support;

pub use config::ScanConfig;
pub use decoder::{DecodeOutcome, FrameDecoder, ImageScanError, ImageScanner, QrFrameDecoder};
pub use error::{DecodeError, ErrorCode, PlatformError, ScanError};
pub use generator::{CodeEncoder, CodeGenerator, GenerateError, HttpCodeEncoder, ImageHandle};
pub use models::{
    DecodeResult, DeviceDescriptor, DeviceKind, FallbackKind, FallbackRecord, ResolvedRecord,
    StructuredRecord,
};
pub use resolver::resolve;
pub use scanner::{ScanEvent, Scanner, SessionState, StopHandle};

/// Decode the first QR code in an encoded image with default settings
pub async fn decode_image(bytes: &[u8]) -> Result<DecodeResult, ImageScanError> {
    ImageScanner::new(ScanConfig::default())
        .decode_image(bytes)
        .await
}

/// Decode a luminance plane with the built-in QR decoder
pub fn decode_luma(luma: &[u8], width: usize, height: usize) -> DecodeOutcome {
    QrFrameDecoder::new().decode_luma(luma, width, height)
}
