//! Optical code decoding
//!
//! - [`FrameDecoder`]: one decode attempt over a luminance plane, classified
//!   into found / not-found / failed
//! - [`QrFrameDecoder`]: the built-in QR implementation (rqrr)
//! - [`image`]: one-shot decoding of encoded image files

pub mod image;
/// QR decoding backed by rqrr
pub mod qr;

pub use image::{ImageScanError, ImageScanner};
pub use qr::QrFrameDecoder;

use crate::error::DecodeError;
use crate::models::DecodeResult;

/// Outcome of a single decode attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A code was found and decoded
    Found(DecodeResult),
    /// Nothing decodable in view; expected steady-state noise in live mode
    NotFound,
    /// Something was detected but could not be decoded, or the input was unusable
    Failed(DecodeError),
}

impl DecodeOutcome {
    /// True for [`DecodeOutcome::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DecodeOutcome::NotFound)
    }
}

/// Decodes optical codes from a luminance plane
pub trait FrameDecoder: Send + Sync {
    /// Try to decode one code from `luma` (row-major, `width * height` bytes)
    fn decode_luma(&self, luma: &[u8], width: usize, height: usize) -> DecodeOutcome;
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for &D {
    fn decode_luma(&self, luma: &[u8], width: usize, height: usize) -> DecodeOutcome {
        (**self).decode_luma(luma, width, height)
    }
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for Box<D> {
    fn decode_luma(&self, luma: &[u8], width: usize, height: usize) -> DecodeOutcome {
        (**self).decode_luma(luma, width, height)
    }
}
