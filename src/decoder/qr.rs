use super::{DecodeOutcome, FrameDecoder};
use crate::error::{DecodeError, ErrorCode};
use crate::models::DecodeResult;
use std::panic::{self, AssertUnwindSafe};

/// QR decoder over rqrr's grid detector
///
/// Every detected grid is tried in order; the first one that decodes wins.
/// No grid at all is a not-found. Grids that all fail to decode are a
/// decode error.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrFrameDecoder;

impl QrFrameDecoder {
    /// Create a decoder
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for QrFrameDecoder {
    fn decode_luma(&self, luma: &[u8], width: usize, height: usize) -> DecodeOutcome {
        if width == 0 || height == 0 {
            return DecodeOutcome::NotFound;
        }
        if luma.len() < width * height {
            return DecodeOutcome::Failed(DecodeError::new(
                ErrorCode::DecodeError,
                format!(
                    "frame buffer holds {} bytes, expected {}",
                    luma.len(),
                    width * height
                ),
            ));
        }

        // rqrr can panic on degenerate grids
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut prepared =
                rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
                    luma[y * width + x]
                });
            let grids = prepared.detect_grids();
            if grids.is_empty() {
                return DecodeOutcome::NotFound;
            }

            let mut first_error = None;
            for grid in &grids {
                match grid.decode() {
                    Ok((_meta, content)) => return DecodeOutcome::Found(DecodeResult::qr(content)),
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }

            tracing::trace!(grids = grids.len(), "QR grids detected but none decoded");
            let reason = first_error.map(|e| format!("{e:?}")).unwrap_or_default();
            DecodeOutcome::Failed(DecodeError::new(
                ErrorCode::DecodeError,
                format!("QR code detected but could not be decoded: {reason}"),
            ))
        }));

        attempt.unwrap_or_else(|_| {
            DecodeOutcome::Failed(DecodeError::new(
                ErrorCode::DecodeError,
                "QR decoder failed on this frame",
            ))
        })
    }
}
