//! Camera platform abstraction
//!
//! The capture session never talks to hardware directly. It goes through
//! three seams:
//!
//! - [`CameraPlatform`]: capability probe, device enumeration, stream acquisition
//! - [`CameraStream`]: a live stream owned exclusively by one session
//! - [`FrameSink`]: the caller's display surface, written to but never owned
//!
//! Backends:
//! - [`replay`]: serves a fixed frame sequence (tests, CLI replays)
//! - `webcam`: native cameras through nokhwa (requires the `webcam` feature)

pub mod replay;
#[cfg(feature = "webcam")]
pub mod webcam;

use crate::error::PlatformError;
use crate::models::DeviceDescriptor;
use crate::utils::grayscale::{to_grayscale, to_grayscale_parallel};
use async_trait::async_trait;
use std::borrow::Cow;

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit luminance
    Luma8,
    /// Packed 8-bit RGB
    Rgb8,
    /// Packed 8-bit RGBA
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Luma8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Frame buffer whose length does not match its dimensions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("frame buffer holds {actual} bytes, expected {expected}")]
pub struct FrameError {
    /// Bytes required by width * height * channels
    pub expected: usize,
    /// Bytes supplied
    pub actual: usize,
}

/// One captured video frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a packed pixel buffer
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(FrameError {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Build a grayscale frame from a decoded image
    pub fn from_image(image: &image::DynamicImage) -> Self {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::Luma8,
            data: luma.into_raw(),
        }
    }

    /// A uniform gray frame, handy as "nothing in view"
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Luma8,
            data: vec![128; width as usize * height as usize],
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Luminance plane; converted in parallel once the frame has at least
    /// `parallel_min_pixels` pixels.
    pub fn to_luma(&self, parallel_min_pixels: usize) -> Cow<'_, [u8]> {
        let (w, h) = (self.width as usize, self.height as usize);
        match self.format {
            PixelFormat::Luma8 => Cow::Borrowed(&self.data),
            format if w * h >= parallel_min_pixels => {
                Cow::Owned(to_grayscale_parallel(&self.data, w, h, format.channels()))
            }
            format => Cow::Owned(to_grayscale(&self.data, w, h, format.channels())),
        }
    }
}

/// What a sink learns about the stream it is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Device the stream was opened on
    pub device_id: String,
    /// Device label at open time
    pub label: String,
    /// Negotiated frame width
    pub width: u32,
    /// Negotiated frame height
    pub height: u32,
}

/// A sink refused to bind to a stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sink rejected stream: {0}")]
pub struct SinkError(pub String);

/// Caller-owned display surface for the live preview
///
/// The session only writes to it. Methods take `&self`; implementations that
/// keep state use interior mutability.
pub trait FrameSink: Send + Sync {
    /// Bind to a freshly acquired stream
    fn attach(&self, stream: &StreamInfo) -> Result<(), SinkError>;

    /// Show one frame
    fn present(&self, frame: &Frame);

    /// The stream is gone
    fn detach(&self);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn attach(&self, _stream: &StreamInfo) -> Result<(), SinkError> {
        Ok(())
    }

    fn present(&self, _frame: &Frame) {}

    fn detach(&self) {}
}

/// A live camera stream
///
/// `stop_tracks` must be idempotent: calling it on an already stopped stream
/// does nothing.
#[async_trait]
pub trait CameraStream: Send {
    /// Stream metadata
    fn info(&self) -> &StreamInfo;

    /// Wait for the next frame
    async fn next_frame(&mut self) -> Result<Frame, PlatformError>;

    /// Release every hardware track held by the stream
    fn stop_tracks(&mut self);

    /// Number of hardware tracks still engaged
    fn live_tracks(&self) -> usize;
}

/// Platform camera capabilities
#[async_trait]
pub trait CameraPlatform: Send + Sync {
    /// Whether camera access exists at all
    fn supports_camera(&self) -> bool {
        true
    }

    /// List media devices. `Err(PlatformError::Unsupported)` when the
    /// platform cannot enumerate.
    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>, PlatformError>;

    /// Acquire a stream on `device`
    async fn open_stream(
        &self,
        device: &DeviceDescriptor,
    ) -> Result<Box<dyn CameraStream>, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_wrong_length() {
        let err = Frame::new(4, 4, PixelFormat::Rgb8, vec![0; 10]).unwrap_err();
        assert_eq!(err.expected, 48);
        assert_eq!(err.actual, 10);
    }

    #[test]
    fn luma_frame_is_borrowed() {
        let frame = Frame::blank(8, 8);
        assert!(matches!(frame.to_luma(0), Cow::Borrowed(_)));
    }

    #[test]
    fn rgb_frame_converts_both_ways() {
        let frame = Frame::new(2, 1, PixelFormat::Rgb8, vec![255, 255, 255, 0, 0, 0]).unwrap();
        let serial = frame.to_luma(usize::MAX);
        let parallel = frame.to_luma(0);
        assert_eq!(serial, parallel);
        assert_eq!(serial.len(), 2);
        assert!(serial[0] >= 254);
        assert_eq!(serial[1], 0);
    }
}
