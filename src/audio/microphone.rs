// Microphone platform using cpal for the default input device

use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, Device, FromSample, SampleFormat, SizedSample, SupportedStreamConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::backend::{AudioFrame, Capabilities, CaptureConstraints, CapturePlatform, StreamHandle};
use super::segment::SubRecording;
use crate::error::CaptureError;

/// Keeps the device thread alive. Dropping it stops the cpal stream.
struct DeviceGuard {
    _release: std_mpsc::Sender<()>,
}

/// Default-input-device capture through cpal
pub struct MicrophonePlatform {
    frame_buffer: usize,
    /// Format the capability probe checks the sub-recorder against
    constraints: CaptureConstraints,
}

impl MicrophonePlatform {
    /// `frame_buffer` bounds how many callback buffers may queue up
    /// before frames are dropped
    pub fn new(frame_buffer: usize) -> Self {
        Self {
            frame_buffer: frame_buffer.max(1),
            constraints: CaptureConstraints::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: CaptureConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    fn recording_primitive(&self) -> bool {
        SubRecording::supports_format(self.constraints.sample_rate, self.constraints.channels)
    }
}

impl Default for MicrophonePlatform {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait::async_trait]
impl CapturePlatform for MicrophonePlatform {
    fn capabilities(&self) -> Capabilities {
        let device_access = !cpal::available_hosts().is_empty();
        let stream_acquisition = device_access && cpal::default_host().input_devices().is_ok();
        Capabilities {
            device_access,
            stream_acquisition,
            recording_primitive: self.recording_primitive(),
        }
    }

    async fn acquire(&self, constraints: &CaptureConstraints) -> Result<StreamHandle, CaptureError> {
        let (frame_tx, frame_rx) = mpsc::channel(self.frame_buffer);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let constraints = constraints.clone();

        // cpal streams are not Send, so the stream lives on its own thread
        // until the guard is dropped.
        thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let stream = match open_stream(&constraints, frame_tx) {
                    Ok((stream, sample_rate, channels)) => {
                        if ready_tx.send(Ok((sample_rate, channels))).is_err() {
                            return;
                        }
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Blocks until every sender (the guard) is gone
                let _ = release_rx.recv();
                drop(stream);
                info!("Microphone stream closed");
            })
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to spawn capture thread: {}", e)))?;

        let (sample_rate, channels) = ready_rx
            .await
            .map_err(|_| CaptureError::DeviceUnavailable("capture thread exited".to_string()))??;

        Ok(StreamHandle::new(
            frame_rx,
            sample_rate,
            channels,
            DeviceGuard { _release: release_tx },
        ))
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

fn open_stream(
    constraints: &CaptureConstraints,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<(cpal::Stream, u32, u16), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".to_string()))?;

    info!(
        "Using audio input device: {}",
        device.name().unwrap_or_else(|_| "<unknown>".to_string())
    );

    if constraints.echo_cancellation || constraints.noise_suppression {
        debug!(
            "Requested echo_cancellation={} noise_suppression={}; left to the host's input processing",
            constraints.echo_cancellation, constraints.noise_suppression
        );
    }

    let supported = select_config(&device, constraints)?;
    let device_channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    let channels = if constraints.channels == 1 { 1 } else { device_channels };

    info!(
        "Audio config: {} Hz, {} device channels -> {} channels, {:?}",
        sample_rate,
        device_channels,
        channels,
        supported.sample_format()
    );

    let config = supported.config();
    let stream = match supported.sample_format() {
        SampleFormat::I16 => build_stream::<i16>(&device, &config, device_channels, channels, frame_tx),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, device_channels, channels, frame_tx),
        SampleFormat::F32 => build_stream::<f32>(&device, &config, device_channels, channels, frame_tx),
        other => Err(CaptureError::DeviceUnavailable(format!(
            "unsupported sample format {:?}",
            other
        ))),
    }?;

    stream
        .play()
        .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;

    Ok((stream, sample_rate, channels))
}

/// Prefer a config that offers the requested rate and channel count,
/// falling back to the device default.
fn select_config(
    device: &Device,
    constraints: &CaptureConstraints,
) -> Result<SupportedStreamConfig, CaptureError> {
    let wanted = constraints.sample_rate;

    match device.supported_input_configs() {
        Ok(ranges) => {
            let mut matching: Vec<_> = ranges
                .filter(|r| r.min_sample_rate().0 <= wanted && r.max_sample_rate().0 >= wanted)
                .filter(|r| {
                    matches!(
                        r.sample_format(),
                        SampleFormat::I16 | SampleFormat::U16 | SampleFormat::F32
                    )
                })
                .collect();

            matching.sort_by_key(|r| (r.channels() != constraints.channels, r.channels()));

            if let Some(range) = matching.into_iter().next() {
                return Ok(range.with_sample_rate(cpal::SampleRate(wanted)));
            }
        }
        Err(cpal::SupportedStreamConfigsError::DeviceNotAvailable) => {
            return Err(CaptureError::DeviceUnavailable("device not available".to_string()));
        }
        Err(e) => {
            warn!("Failed to enumerate input configs: {}", e);
        }
    }

    let fallback = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

    warn!(
        "Device does not offer {} Hz, using default {} Hz",
        wanted,
        fallback.sample_rate().0
    );

    Ok(fallback)
}

fn build_stream<T>(
    device: &Device,
    config: &cpal::StreamConfig,
    device_channels: u16,
    channels: u16,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample + Send + 'static,
    i16: FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let started = Instant::now();
    let err_fn = |err: cpal::StreamError| error!("Audio stream error: {}", err);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let pcm: Vec<i16> = data.iter().map(|&s| i16::from_sample_(s)).collect();
                let samples = if channels == 1 && device_channels > 1 {
                    downmix_to_mono(&pcm, device_channels)
                } else {
                    pcm
                };

                let frame = AudioFrame {
                    samples,
                    sample_rate,
                    channels,
                    timestamp_ms: started.elapsed().as_millis() as u64,
                };

                if let Err(mpsc::error::TrySendError::Full(_)) = frame_tx.try_send(frame) {
                    warn!("Frame buffer full, dropping audio frame");
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| match e {
            BuildStreamError::DeviceNotAvailable
            | BuildStreamError::StreamConfigNotSupported
            | BuildStreamError::InvalidArgument => CaptureError::DeviceUnavailable(e.to_string()),
            other => CaptureError::PermissionDenied(other.to_string()),
        })
}

/// Average interleaved channels down to one
fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    let channels = channels as usize;

    samples
        .chunks_exact(channels)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}
