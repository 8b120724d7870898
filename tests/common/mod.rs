#![allow(dead_code, unused_imports)]

use roast_scan::camera::{Frame, FrameSink, PixelFormat, SinkError, StreamInfo};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

mod symbols;
pub use symbols::{png_bytes, qr_png, render_qr};

pub fn qr_frame(text: &str) -> Frame {
    let (luma, side) = render_qr(text, 4);
    Frame::new(side as u32, side as u32, PixelFormat::Luma8, luma).expect("frame dimensions")
}

/// Same symbol as an RGB frame, as a colour camera would deliver it
pub fn qr_frame_rgb(text: &str) -> Frame {
    let (luma, side) = render_qr(text, 4);
    let rgb = luma.iter().flat_map(|&v| [v, v, v]).collect();
    Frame::new(side as u32, side as u32, PixelFormat::Rgb8, rgb).expect("frame dimensions")
}

pub fn blank_frame() -> Frame {
    Frame::blank(96, 96)
}

/// Sink that records what the session did to it
#[derive(Default)]
pub struct RecordingSink {
    pub attached: Mutex<Vec<StreamInfo>>,
    pub frames: AtomicUsize,
    pub detached: AtomicUsize,
    pub refuse: bool,
}

impl RecordingSink {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn detached(&self) -> usize {
        self.detached.load(Ordering::SeqCst)
    }
}

impl FrameSink for RecordingSink {
    fn attach(&self, stream: &StreamInfo) -> Result<(), SinkError> {
        if self.refuse {
            return Err(SinkError("preview surface unavailable".into()));
        }
        self.attached.lock().unwrap().push(stream.clone());
        Ok(())
    }

    fn present(&self, _frame: &Frame) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }

    fn detach(&self) {
        self.detached.fetch_add(1, Ordering::SeqCst);
    }
}
