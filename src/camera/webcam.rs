//! Native camera backend (nokhwa)
//!
//! nokhwa cameras are blocking and not `Send` on every OS, so each stream
//! owns a dedicated capture thread. Frames travel to the async side over a
//! bounded channel. `stop_tracks` closes the channel, clears the running flag
//! and joins the thread, which stops the hardware stream before exiting.

use super::{CameraPlatform, CameraStream, Frame, PixelFormat, StreamInfo};
use crate::error::PlatformError;
use crate::models::DeviceDescriptor;
use async_trait::async_trait;
use nokhwa::Camera;
use nokhwa::pixel_format::LumaFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

const FRAME_QUEUE_DEPTH: usize = 2;

/// Cameras reachable through the OS capture API
#[derive(Debug, Clone, Copy, Default)]
pub struct WebcamPlatform;

impl WebcamPlatform {
    /// Use the platform's default capture backend
    pub fn new() -> Self {
        Self
    }
}

fn camera_index(id: &str) -> CameraIndex {
    match id.parse::<u32>() {
        Ok(index) => CameraIndex::Index(index),
        Err(_) => CameraIndex::String(id.to_owned()),
    }
}

#[async_trait]
impl CameraPlatform for WebcamPlatform {
    fn supports_camera(&self) -> bool {
        nokhwa::native_api_backend().is_some()
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>, PlatformError> {
        let cameras = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| PlatformError::Unavailable(e.to_string()))?;
        Ok(cameras
            .iter()
            .map(|info| DeviceDescriptor::video(info.index().to_string(), info.human_name()))
            .collect())
    }

    async fn open_stream(
        &self,
        device: &DeviceDescriptor,
    ) -> Result<Box<dyn CameraStream>, PlatformError> {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = oneshot::channel();
        let running = Arc::new(AtomicBool::new(true));

        let index = camera_index(&device.id);
        let device_id = device.id.clone();
        let label = device.label.clone();
        let running_clone = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("webcam-capture".to_string())
            .spawn(move || {
                capture_loop(index, device_id, label, running_clone, frame_tx, ready_tx)
            })
            .map_err(|e| PlatformError::Unavailable(e.to_string()))?;

        let info = match ready_rx.await {
            Ok(Ok(info)) => info,
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(err);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(PlatformError::Unavailable(
                    "capture thread exited during start-up".into(),
                ));
            }
        };

        info!(device = %info.label, width = info.width, height = info.height, "webcam stream open");
        Ok(Box::new(WebcamStream {
            info,
            frames: frame_rx,
            running,
            handle: Some(handle),
        }))
    }
}

fn capture_loop(
    index: CameraIndex,
    device_id: String,
    label: String,
    running: Arc<AtomicBool>,
    frames: mpsc::Sender<Result<Frame, PlatformError>>,
    ready: oneshot::Sender<Result<StreamInfo, PlatformError>>,
) {
    let format = RequestedFormat::new::<LumaFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let mut camera = match Camera::new(index, format) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(PlatformError::PermissionDenied(e.to_string())));
            return;
        }
    };
    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(PlatformError::Unavailable(e.to_string())));
        return;
    }

    let resolution = camera.resolution();
    let info = StreamInfo {
        device_id,
        label,
        width: resolution.width(),
        height: resolution.height(),
    };
    if ready.send(Ok(info)).is_err() {
        let _ = camera.stop_stream();
        return;
    }

    while running.load(Ordering::SeqCst) {
        let next = camera
            .frame()
            .and_then(|buffer| buffer.decode_image::<LumaFormat>())
            .map_err(|e| PlatformError::Unavailable(e.to_string()))
            .and_then(|image| {
                let (width, height) = image.dimensions();
                Frame::new(width, height, PixelFormat::Luma8, image.into_raw())
                    .map_err(|e| PlatformError::Unavailable(e.to_string()))
            });
        let failed = next.is_err();
        if frames.blocking_send(next).is_err() || failed {
            break;
        }
    }

    if let Err(e) = camera.stop_stream() {
        error!("Failed to stop camera stream: {}", e);
    }
    debug!("webcam capture thread exiting");
}

struct WebcamStream {
    info: StreamInfo,
    frames: mpsc::Receiver<Result<Frame, PlatformError>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

#[async_trait]
impl CameraStream for WebcamStream {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    async fn next_frame(&mut self) -> Result<Frame, PlatformError> {
        match self.frames.recv().await {
            Some(frame) => frame,
            None => Err(PlatformError::StreamEnded),
        }
    }

    fn stop_tracks(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.frames.close();
        self.running.store(false, Ordering::SeqCst);
        if handle.join().is_err() {
            error!("webcam capture thread panicked");
        }
    }

    fn live_tracks(&self) -> usize {
        usize::from(self.handle.is_some())
    }
}

impl Drop for WebcamStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}
