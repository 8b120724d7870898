//! Replay camera platform
//!
//! Serves a fixed frame sequence as if it came from a live camera. Every
//! opened stream replays the sequence from the start. Track bookkeeping is
//! shared between clones of the platform, so a caller can hand one clone to
//! a scanner and inspect the counters through another.

use super::{CameraPlatform, CameraStream, Frame, StreamInfo};
use crate::error::PlatformError;
use crate::models::DeviceDescriptor;
use crate::tools::collect_images;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared hardware bookkeeping
#[derive(Debug, Default)]
pub struct TrackCounters {
    live: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl TrackCounters {
    /// Tracks currently engaged
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Streams ever acquired
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Streams ever released
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// Camera platform backed by in-memory frames
#[derive(Debug, Clone)]
pub struct ReplayPlatform {
    devices: Vec<DeviceDescriptor>,
    frames: Arc<[Frame]>,
    camera_supported: bool,
    enumeration_supported: bool,
    open_error: Option<PlatformError>,
    fail_after: Option<usize>,
    looping: bool,
    counters: Arc<TrackCounters>,
}

impl ReplayPlatform {
    /// One device ("Replay Camera") replaying `frames` once
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            devices: vec![DeviceDescriptor::video("replay-0", "Replay Camera")],
            frames: frames.into(),
            camera_supported: true,
            enumeration_supported: true,
            open_error: None,
            fail_after: None,
            looping: false,
            counters: Arc::new(TrackCounters::default()),
        }
    }

    /// Replay every image under `root` in path order
    pub fn from_dir<P: AsRef<Path>>(root: P) -> Result<Self, image::ImageError> {
        let mut paths = collect_images(root.as_ref());
        paths.sort();
        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let image = image::open(&path)?;
            frames.push(Frame::from_image(&image));
        }
        Ok(Self::new(frames))
    }

    /// Replace the enumerated devices
    pub fn with_devices(mut self, devices: Vec<DeviceDescriptor>) -> Self {
        self.devices = devices;
        self
    }

    /// Pretend the platform has no camera access at all
    pub fn without_camera(mut self) -> Self {
        self.camera_supported = false;
        self
    }

    /// Pretend the platform cannot enumerate devices
    pub fn without_enumeration(mut self) -> Self {
        self.enumeration_supported = false;
        self
    }

    /// Make every stream acquisition fail with `err`
    pub fn failing_open(mut self, err: PlatformError) -> Self {
        self.open_error = Some(err);
        self
    }

    /// Make streams fail with `Unavailable` after `frames` frames
    pub fn failing_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Restart the sequence instead of ending the stream
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Shared track bookkeeping
    pub fn counters(&self) -> Arc<TrackCounters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl CameraPlatform for ReplayPlatform {
    fn supports_camera(&self) -> bool {
        self.camera_supported
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>, PlatformError> {
        tokio::task::yield_now().await;
        if !self.enumeration_supported {
            return Err(PlatformError::Unsupported);
        }
        Ok(self.devices.clone())
    }

    async fn open_stream(
        &self,
        device: &DeviceDescriptor,
    ) -> Result<Box<dyn CameraStream>, PlatformError> {
        tokio::task::yield_now().await;
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        if !self.devices.iter().any(|d| d.id == device.id) {
            return Err(PlatformError::Unavailable(format!(
                "no device with id {}",
                device.id
            )));
        }

        let (width, height) = self
            .frames
            .first()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0));
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ReplayStream {
            info: StreamInfo {
                device_id: device.id.clone(),
                label: device.label.clone(),
                width,
                height,
            },
            frames: Arc::clone(&self.frames),
            position: 0,
            served: 0,
            fail_after: self.fail_after,
            looping: self.looping,
            engaged: true,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct ReplayStream {
    info: StreamInfo,
    frames: Arc<[Frame]>,
    position: usize,
    served: usize,
    fail_after: Option<usize>,
    looping: bool,
    engaged: bool,
    counters: Arc<TrackCounters>,
}

#[async_trait]
impl CameraStream for ReplayStream {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    async fn next_frame(&mut self) -> Result<Frame, PlatformError> {
        tokio::task::yield_now().await;
        if !self.engaged {
            return Err(PlatformError::Unavailable("stream stopped".into()));
        }
        if self.fail_after.is_some_and(|n| self.served >= n) {
            return Err(PlatformError::Unavailable("device disconnected".into()));
        }
        if self.position >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Err(PlatformError::StreamEnded);
            }
            self.position = 0;
        }
        let frame = self.frames[self.position].clone();
        self.position += 1;
        self.served += 1;
        Ok(frame)
    }

    fn stop_tracks(&mut self) {
        if !self.engaged {
            return;
        }
        self.engaged = false;
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }

    fn live_tracks(&self) -> usize {
        usize::from(self.engaged)
    }
}

impl Drop for ReplayStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}
