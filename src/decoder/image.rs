//! One-shot decoding of encoded image files
//!
//! Unlike the live loop, a one-shot decode has no next frame to try, so a
//! missing code is reported as [`ImageScanError::NoCodeFound`].

use super::{DecodeOutcome, FrameDecoder, QrFrameDecoder};
use crate::config::ScanConfig;
use crate::error::{DecodeError, ErrorCode};
use crate::models::DecodeResult;
use crate::tools::load_luma_from_memory;
use std::path::Path;
use tracing::debug;

/// User-facing message for an image without a code
pub const NO_CODE_FOUND_MESSAGE: &str = "No QR code found in the image";

/// Failures of a one-shot image decode
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageScanError {
    /// The byte source could not be read or is not a supported image
    #[error("failed to read image: {0}")]
    FileRead(String),

    /// Decoding finished without finding a code
    #[error("No QR code found in the image")]
    NoCodeFound,

    /// A code was detected but could not be decoded
    #[error("failed to decode QR code: {0}")]
    Decode(String),
}

impl From<ImageScanError> for DecodeError {
    fn from(err: ImageScanError) -> Self {
        match err {
            ImageScanError::FileRead(_) => DecodeError::new(ErrorCode::FileReadError, err.to_string()),
            ImageScanError::NoCodeFound => DecodeError::uncoded(NO_CODE_FOUND_MESSAGE),
            ImageScanError::Decode(_) => DecodeError::new(ErrorCode::DecodeError, err.to_string()),
        }
    }
}

/// Single-shot decoder for image files; holds no session state
#[derive(Debug, Clone, Default)]
pub struct ImageScanner<D = QrFrameDecoder> {
    decoder: D,
    config: ScanConfig,
}

impl ImageScanner<QrFrameDecoder> {
    /// QR decoder with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        Self::with_decoder(QrFrameDecoder::new(), config)
    }
}

impl<D: FrameDecoder> ImageScanner<D> {
    /// Use a custom frame decoder
    pub fn with_decoder(decoder: D, config: ScanConfig) -> Self {
        Self { decoder, config }
    }

    /// Decode the first code in an encoded image (PNG, JPEG, GIF, BMP, ...)
    pub async fn decode_image(&self, bytes: &[u8]) -> Result<DecodeResult, ImageScanError> {
        self.decode_bytes(bytes)
    }

    /// Read `path` and decode the first code in it
    pub async fn decode_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<DecodeResult, ImageScanError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ImageScanError::FileRead(format!("{}: {e}", path.display())))?;
        self.decode_bytes(&bytes)
    }

    /// Blocking variant of [`Self::decode_image`], for batch jobs on worker threads
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<DecodeResult, ImageScanError> {
        let (luma, width, height) = load_luma_from_memory(bytes, self.config.max_dim)
            .map_err(|e| ImageScanError::FileRead(e.to_string()))?;
        debug!(width, height, "decoding static image");

        match self.decoder.decode_luma(&luma, width, height) {
            DecodeOutcome::Found(result) => Ok(result),
            DecodeOutcome::NotFound => Err(ImageScanError::NoCodeFound),
            DecodeOutcome::Failed(err) => Err(ImageScanError::Decode(err.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{png_bytes, qr_png};

    #[tokio::test]
    async fn decodes_png() {
        let scanner = ImageScanner::new(ScanConfig::default());
        let result = scanner.decode_image(&qr_png("LOT-2024-0093")).await.unwrap();
        assert_eq!(result, DecodeResult::qr("LOT-2024-0093"));
    }

    #[tokio::test]
    async fn image_without_code_is_no_code_found() {
        let scanner = ImageScanner::new(ScanConfig::default());
        let blank = png_bytes(vec![255u8; 64 * 64], 64, 64);
        let err = scanner.decode_image(&blank).await.unwrap_err();
        assert_eq!(err, ImageScanError::NoCodeFound);

        let flat: DecodeError = err.into();
        assert_eq!(flat.message, NO_CODE_FOUND_MESSAGE);
        assert_eq!(flat.code, None);
    }

    #[tokio::test]
    async fn garbage_bytes_are_file_read_errors() {
        let scanner = ImageScanner::new(ScanConfig::default());
        let err = scanner.decode_image(b"definitely not an image").await.unwrap_err();
        assert!(matches!(err, ImageScanError::FileRead(_)));
        assert!(DecodeError::from(err).is(ErrorCode::FileReadError));
    }

    #[tokio::test]
    async fn missing_file_is_a_file_read_error() {
        let scanner = ImageScanner::new(ScanConfig::default());
        let err = scanner
            .decode_file("/nonexistent/roast_scan/label.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ImageScanError::FileRead(msg) if msg.contains("label.png")));
    }

    #[tokio::test]
    async fn decoder_failures_are_generic_decode_errors() {
        struct Broken;
        impl FrameDecoder for Broken {
            fn decode_luma(&self, _: &[u8], _: usize, _: usize) -> DecodeOutcome {
                DecodeOutcome::Failed(DecodeError::new(ErrorCode::DecodeError, "bad ecc"))
            }
        }

        let scanner = ImageScanner::with_decoder(Broken, ScanConfig::default());
        let err = scanner.decode_image(&qr_png("x")).await.unwrap_err();
        assert_eq!(err, ImageScanError::Decode("bad ecc".into()));
    }
}
