use std::any::Any;

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CaptureError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since the stream was acquired
    pub timestamp_ms: u64,
}

/// Quality constraints requested when acquiring a microphone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    /// Requested sample rate in Hz
    pub sample_rate: u32,
    /// Requested channel count (1 = mono)
    pub channels: u16,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            sample_rate: 44_100,
            channels: 1,
        }
    }
}

/// What the runtime exposes for capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// An API to reach audio devices at all
    pub device_access: bool,
    /// A way to open an input stream
    pub stream_acquisition: bool,
    /// A recorder that can be built on top of a stream
    pub recording_primitive: bool,
}

impl Capabilities {
    pub fn all(&self) -> bool {
        self.device_access && self.stream_acquisition && self.recording_primitive
    }
}

/// Live connection to an audio input device.
///
/// Frames arrive on an internal channel. Whatever keeps the device open
/// lives in the release guard, so dropping the guard closes the device.
pub struct StreamHandle {
    id: Uuid,
    frames: mpsc::Receiver<AudioFrame>,
    sample_rate: u32,
    channels: u16,
    guard: Option<Box<dyn Any + Send>>,
}

impl StreamHandle {
    pub fn new(
        frames: mpsc::Receiver<AudioFrame>,
        sample_rate: u32,
        channels: u16,
        guard: impl Any + Send,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            frames,
            sample_rate,
            channels,
            guard: Some(Box::new(guard)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_released(&self) -> bool {
        self.guard.is_none()
    }

    /// Next captured frame, or `None` once released or the device went away
    pub async fn next_frame(&mut self) -> Option<AudioFrame> {
        if self.is_released() {
            return None;
        }
        self.frames.recv().await
    }

    /// Frame already queued on the channel, without waiting
    pub fn try_next_frame(&mut self) -> Option<AudioFrame> {
        if self.is_released() {
            return None;
        }
        self.frames.try_recv().ok()
    }

    /// Release the device. Returns `true` only for the call that released it.
    pub fn release(&mut self) -> bool {
        let Some(guard) = self.guard.take() else {
            debug!("Stream {} already released", self.id);
            return false;
        };

        self.frames.close();
        drop(guard);

        info!("Released audio stream {}", self.id);
        true
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Capture platform: capability probe plus permission gate
///
/// Implementations:
/// - `MicrophonePlatform`: default input device through cpal
/// - test fakes that feed synthetic frames
#[async_trait::async_trait]
pub trait CapturePlatform: Send + Sync {
    /// Report which capture primitives exist. Must not touch any device.
    fn capabilities(&self) -> Capabilities;

    /// Whether every primitive needed for capture is present
    fn supported(&self) -> bool {
        self.capabilities().all()
    }

    /// Request exclusive access to an input device.
    ///
    /// Suspends until access is granted or refused.
    async fn acquire(&self, constraints: &CaptureConstraints) -> Result<StreamHandle, CaptureError>;

    /// Get platform name for logging
    fn name(&self) -> &str;
}
