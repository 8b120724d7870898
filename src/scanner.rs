//! Capture session manager
//!
//! A [`Scanner`] owns at most one live capture session: a camera stream bound
//! to a caller-supplied [`FrameSink`] and a continuous decode loop. Decode
//! outcomes come out as [`ScanEvent`]s in frame order, pulled with
//! [`Scanner::next_event`] or pushed to closures by [`Scanner::run`].
//!
//! ```text
//!   Idle ──start()──▶ Starting ──ok──▶ Active ──stop()──▶ Stopped
//!    ▲                   │                │
//!    └─────── error ─────┘                └── stream failure / end ──▶ Stopped
//! ```
//!
//! Stream tracks are released by [`Scanner::stop`], which every exit path
//! funnels through: explicit stop, a [`StopHandle`], stream failure, and
//! dropping the scanner. Releasing twice is harmless. A `start` future
//! dropped before it completes leaves the scanner Idle.

use crate::camera::{CameraPlatform, CameraStream, FrameSink};
use crate::config::ScanConfig;
use crate::decoder::{DecodeOutcome, FrameDecoder, QrFrameDecoder};
use crate::device::{list_video_devices, select_preferred};
use crate::error::{DecodeError, ErrorCode, PlatformError, ScanError};
use crate::models::{DecodeResult, DeviceDescriptor};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Lifecycle of a scanner's capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing acquired yet
    Idle,
    /// Enumerating devices and acquiring a stream
    Starting,
    /// Stream attached, decode loop armed
    Active,
    /// Session ended and hardware released
    Stopped,
}

/// One surfaced decode tick. Not-found ticks are never surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A code was decoded
    Decoded(DecodeResult),
    /// A decode error, or the terminal failure of the stream
    Error(DecodeError),
}

/// Requests a stop from outside the decode loop (another task, a UI button)
///
/// The loop settles any in-flight decode, discards its outcome and stops.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Ask the session to stop
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Whether a stop has been requested
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

struct CaptureSession {
    stream: Option<Box<dyn CameraStream>>,
    sink: Arc<dyn FrameSink>,
    sink_attached: bool,
    device: DeviceDescriptor,
    cancel: CancellationToken,
    ticks: u64,
}

impl CaptureSession {
    /// Stop every track and detach the sink. Returns false if already released.
    fn release(&mut self) -> bool {
        let Some(mut stream) = self.stream.take() else {
            return false;
        };
        stream.stop_tracks();
        if self.sink_attached {
            self.sink.detach();
            self.sink_attached = false;
        }
        debug!(device = %self.device.id, "camera tracks released");
        true
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.release() {
            info!(device = %self.device.id, "capture session released on teardown");
        }
    }
}

/// Holds the scanner in Starting; falls back to Idle unless promoted to
/// Active, including when the `start` future is dropped mid-acquire.
struct StartingGuard<'a> {
    state: &'a mut SessionState,
}

impl<'a> StartingGuard<'a> {
    fn enter(state: &'a mut SessionState) -> Self {
        *state = SessionState::Starting;
        Self { state }
    }
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        if *self.state == SessionState::Starting {
            *self.state = SessionState::Idle;
        }
    }
}

/// Live camera scanner
pub struct Scanner<P, D = QrFrameDecoder> {
    platform: P,
    decoder: D,
    config: ScanConfig,
    state: SessionState,
    session: Option<CaptureSession>,
}

impl<P: CameraPlatform> Scanner<P> {
    /// QR scanner with default configuration
    pub fn new(platform: P) -> Self {
        Self::with_decoder(platform, QrFrameDecoder::new(), ScanConfig::default())
    }
}

impl<P, D> Scanner<P, D> {
    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while a session is Active
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Device the active session is using
    pub fn active_device(&self) -> Option<&DeviceDescriptor> {
        self.session.as_ref().map(|s| &s.device)
    }

    /// Hardware tracks held by the active session
    pub fn live_tracks(&self) -> usize {
        self.session
            .as_ref()
            .and_then(|s| s.stream.as_ref())
            .map_or(0, |stream| stream.live_tracks())
    }

    /// Handle for stopping the active session from elsewhere
    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.session.as_ref().map(|s| StopHandle {
            token: s.cancel.clone(),
        })
    }

    /// End the session and release the camera.
    ///
    /// Idempotent and safe from any state: without a session this does
    /// nothing. After it returns no further events are delivered.
    pub fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.cancel.cancel();
        session.release();
        self.state = SessionState::Stopped;
        info!(device = %session.device.id, ticks = session.ticks, "capture session stopped");
    }
}

impl<P: CameraPlatform, D: FrameDecoder> Scanner<P, D> {
    /// Scanner with a custom decoder and configuration
    pub fn with_decoder(platform: P, decoder: D, config: ScanConfig) -> Self {
        Self {
            platform,
            decoder,
            config,
            state: SessionState::Idle,
            session: None,
        }
    }

    /// Acquire a camera and bind it to `sink`.
    ///
    /// Fails with [`ScanError::AlreadyRunning`] while a session is Active,
    /// without touching the platform. Any start-up failure leaves the scanner
    /// Idle with nothing acquired.
    pub async fn start(&mut self, sink: Arc<dyn FrameSink>) -> Result<(), ScanError> {
        if self.is_active() {
            warn!("start() called while a capture session is running");
            return Err(ScanError::AlreadyRunning);
        }

        let guard = StartingGuard::enter(&mut self.state);
        match Self::acquire(&self.platform, sink).await {
            Ok(session) => {
                info!(device = %session.device.id, label = %session.device.label, "capture session active");
                self.session = Some(session);
                *guard.state = SessionState::Active;
                Ok(())
            }
            Err(err) => {
                warn!(code = ?err.code, "capture start failed: {}", err);
                drop(guard);
                Err(ScanError::Capture(err))
            }
        }
    }

    async fn acquire(platform: &P, sink: Arc<dyn FrameSink>) -> Result<CaptureSession, DecodeError> {
        if !platform.supports_camera() {
            return Err(DecodeError::new(
                ErrorCode::NotSupported,
                "Camera access is not supported on this platform",
            ));
        }

        let devices = list_video_devices(platform).await?;
        let device = select_preferred(&devices).cloned().ok_or_else(|| {
            DecodeError::new(ErrorCode::NoDevice, "No camera found on this device")
        })?;
        debug!(device = %device.id, label = %device.label, "selected camera");

        let stream = platform
            .open_stream(&device)
            .await
            .map_err(|err| match err {
                PlatformError::Unsupported => DecodeError::from(err),
                other => DecodeError::new(
                    ErrorCode::CameraError,
                    format!("Failed to access camera: {other}"),
                ),
            })?;

        let mut session = CaptureSession {
            sink,
            sink_attached: false,
            device,
            cancel: CancellationToken::new(),
            ticks: 0,
            stream: None,
        };
        let attached = session.sink.attach(stream.info());
        session.stream = Some(stream);
        if let Err(err) = attached {
            session.release();
            return Err(DecodeError::new(
                ErrorCode::CameraError,
                format!("Failed to attach camera stream: {err}"),
            ));
        }
        session.sink_attached = true;
        Ok(session)
    }

    /// Wait for the next surfaced decode event.
    ///
    /// Returns `None` once the scanner is not Active: never started, stopped,
    /// stop requested through a [`StopHandle`], or the stream ended. A stream
    /// failure is the one event delivered after the session stops: tracks are
    /// already released when the final `CAMERA_ERROR` event is returned, and
    /// every later call yields `None`.
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        loop {
            let session = self.session.as_mut()?;
            let cancel = session.cancel.clone();
            if cancel.is_cancelled() {
                self.stop();
                return None;
            }

            let interval = self.config.tick_interval;
            let next = {
                let stream = session.stream.as_mut()?;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    frame = async {
                        if !interval.is_zero() {
                            tokio::time::sleep(interval).await;
                        }
                        stream.next_frame().await
                    } => Some(frame),
                }
            };

            let frame = match next {
                Some(Ok(frame)) => frame,
                None => {
                    self.stop();
                    return None;
                }
                Some(Err(PlatformError::StreamEnded)) => {
                    info!("camera stream ended");
                    self.stop();
                    return None;
                }
                Some(Err(err)) => {
                    warn!("camera stream failed: {}", err);
                    let event = ScanEvent::Error(DecodeError::new(
                        ErrorCode::CameraError,
                        format!("Camera stream failed: {err}"),
                    ));
                    self.stop();
                    return Some(event);
                }
            };

            session.sink.present(&frame);
            session.ticks += 1;
            let luma = frame.to_luma(self.config.parallel_gray_min_pixels);
            let outcome = self.decoder.decode_luma(
                &luma,
                frame.width() as usize,
                frame.height() as usize,
            );

            if cancel.is_cancelled() {
                trace!("discarding decode outcome after stop request");
                self.stop();
                return None;
            }

            match outcome {
                DecodeOutcome::Found(result) => {
                    debug!(format = %result.format, "code decoded");
                    return Some(ScanEvent::Decoded(result));
                }
                DecodeOutcome::NotFound => trace!("no code in frame"),
                DecodeOutcome::Failed(err) => {
                    warn!("decode error: {}", err);
                    return Some(ScanEvent::Error(err));
                }
            }
        }
    }

    /// Drive the decode loop, handing events to the closures until one of
    /// them breaks or the session ends. Breaking stops the session.
    pub async fn run<R, E>(&mut self, mut on_result: R, mut on_error: E)
    where
        R: FnMut(DecodeResult) -> ControlFlow<()>,
        E: FnMut(DecodeError) -> ControlFlow<()>,
    {
        while let Some(event) = self.next_event().await {
            let flow = match event {
                ScanEvent::Decoded(result) => on_result(result),
                ScanEvent::Error(err) => on_error(err),
            };
            if flow.is_break() {
                self.stop();
                break;
            }
        }
    }

    /// Start, wait for the first decoded code, stop.
    ///
    /// Transient decode errors are skipped. If the session ends before a
    /// code is seen, the last error (or a generic one) is returned.
    pub async fn scan_once(&mut self, sink: Arc<dyn FrameSink>) -> Result<DecodeResult, ScanError> {
        self.start(sink).await?;

        let mut last_error = None;
        while let Some(event) = self.next_event().await {
            match event {
                ScanEvent::Decoded(result) => {
                    self.stop();
                    return Ok(result);
                }
                ScanEvent::Error(err) => last_error = Some(err),
            }
        }

        self.stop();
        Err(ScanError::Capture(last_error.unwrap_or_else(|| {
            DecodeError::new(
                ErrorCode::CameraError,
                "Camera stream ended before a code was found",
            )
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::replay::ReplayPlatform;
    use crate::camera::{Frame, NullSink, PixelFormat};
    use crate::test_support::render_qr;

    fn qr_frame(text: &str) -> Frame {
        let (luma, side) = render_qr(text, 4);
        Frame::new(side as u32, side as u32, PixelFormat::Luma8, luma).unwrap()
    }

    fn sink() -> Arc<dyn FrameSink> {
        Arc::new(NullSink)
    }

    #[tokio::test]
    async fn not_found_frames_are_swallowed() {
        let platform = ReplayPlatform::new(vec![
            Frame::blank(64, 64),
            Frame::blank(64, 64),
            qr_frame("B-12"),
            Frame::blank(64, 64),
        ]);
        let mut scanner = Scanner::new(platform);
        scanner.start(sink()).await.unwrap();

        assert_eq!(
            scanner.next_event().await,
            Some(ScanEvent::Decoded(DecodeResult::qr("B-12")))
        );
        assert_eq!(scanner.next_event().await, None);
        assert_eq!(scanner.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn session_keeps_scanning_after_a_hit() {
        let platform = ReplayPlatform::new(vec![qr_frame("one"), qr_frame("two")]);
        let mut scanner = Scanner::new(platform);
        scanner.start(sink()).await.unwrap();

        assert_eq!(scanner.next_event().await, Some(ScanEvent::Decoded(DecodeResult::qr("one"))));
        assert!(scanner.is_active());
        assert_eq!(scanner.next_event().await, Some(ScanEvent::Decoded(DecodeResult::qr("two"))));
    }

    #[tokio::test]
    async fn next_event_without_session_is_none() {
        let mut scanner = Scanner::new(ReplayPlatform::new(Vec::new()));
        assert_eq!(scanner.next_event().await, None);
        assert_eq!(scanner.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn stop_from_idle_is_a_no_op() {
        let mut scanner = Scanner::new(ReplayPlatform::new(Vec::new()));
        scanner.stop();
        scanner.stop();
        assert_eq!(scanner.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn run_stops_when_callback_breaks() {
        let platform = ReplayPlatform::new(vec![qr_frame("first")]).looping(true);
        let counters = platform.counters();
        let mut scanner = Scanner::new(platform);
        scanner.start(sink()).await.unwrap();

        let mut seen = Vec::new();
        scanner
            .run(
                |result| {
                    seen.push(result.text);
                    if seen.len() == 3 {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                },
                |_| ControlFlow::Continue(()),
            )
            .await;

        assert_eq!(seen, ["first", "first", "first"]);
        assert!(!scanner.is_active());
        assert_eq!(counters.live(), 0);
    }

    #[tokio::test]
    async fn tick_interval_paces_frames() {
        tokio::time::pause();
        let platform = ReplayPlatform::new(vec![qr_frame("paced")]);
        let config = ScanConfig::default().with_tick_interval(std::time::Duration::from_millis(250));
        let mut scanner = Scanner::with_decoder(platform, QrFrameDecoder::new(), config);
        scanner.start(sink()).await.unwrap();

        let started = tokio::time::Instant::now();
        let event = scanner.next_event().await;
        assert_eq!(event, Some(ScanEvent::Decoded(DecodeResult::qr("paced"))));
        assert!(started.elapsed() >= std::time::Duration::from_millis(250));
    }

    /// Enumeration that never answers, like a permission prompt left open
    struct Hanging;

    #[async_trait::async_trait]
    impl CameraPlatform for Hanging {
        async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>, PlatformError> {
            std::future::pending().await
        }

        async fn open_stream(
            &self,
            _device: &DeviceDescriptor,
        ) -> Result<Box<dyn CameraStream>, PlatformError> {
            Err(PlatformError::Unsupported)
        }
    }

    #[tokio::test]
    async fn abandoned_start_returns_to_idle() {
        tokio::time::pause();
        let mut scanner = Scanner::new(Hanging);

        let attempt = tokio::time::timeout(std::time::Duration::from_millis(10), scanner.start(sink())).await;
        assert!(attempt.is_err());
        assert_eq!(scanner.state(), SessionState::Idle);
        assert!(!scanner.is_active());
        assert!(scanner.stop_handle().is_none());
        assert_eq!(scanner.next_event().await, None);
    }
}
