// Shared fakes for the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use room_capture::{
    AudioFrame, AudioSegment, Attachment, Capabilities, CaptureConstraints, CaptureError,
    CapturePlatform, SegmentSink, StreamHandle, SubRecording, UploadError, Uploader,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;

pub const SAMPLE_RATE: u32 = 44_100;

/// 100ms of mono audio at 44.1kHz
pub const SAMPLES_PER_FRAME: usize = 4_410;

pub fn frame(timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![1_000i16; SAMPLES_PER_FRAME],
        sample_rate: SAMPLE_RATE,
        channels: 1,
        timestamp_ms,
    }
}

/// Build a finished segment holding `frames` frames
pub fn segment(frames: usize) -> AudioSegment {
    let mut sub = SubRecording::start(SAMPLE_RATE, 1).unwrap();
    for i in 0..frames {
        sub.write_frame(&frame(i as u64 * 100));
    }
    sub.stop().unwrap().expect("non-empty segment")
}

/// Counts how many times the device behind a stream was released
pub struct ReleaseCounter(pub Arc<AtomicUsize>);

impl Drop for ReleaseCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A stream handle with no device behind it
pub fn fake_stream() -> (StreamHandle, mpsc::Sender<AudioFrame>, Arc<AtomicUsize>) {
    let (tx, rx) = mpsc::channel(64);
    let releases = Arc::new(AtomicUsize::new(0));
    let handle = StreamHandle::new(rx, SAMPLE_RATE, 1, ReleaseCounter(Arc::clone(&releases)));
    (handle, tx, releases)
}

/// Capture platform that feeds a 100ms frame every 100ms
pub struct FakePlatform {
    pub capabilities: Capabilities,
    pub failure: Option<CaptureError>,
    /// Stop feeding (as if unplugged) after this many frames
    pub end_after: Option<usize>,
    acquires: AtomicUsize,
    releases: Arc<AtomicUsize>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities {
                device_access: true,
                stream_acquisition: true,
                recording_primitive: true,
            },
            failure: None,
            end_after: None,
            acquires: AtomicUsize::new(0),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn without_recording_primitive() -> Self {
        let mut platform = Self::new();
        platform.capabilities.recording_primitive = false;
        platform
    }

    pub fn failing(error: CaptureError) -> Self {
        let mut platform = Self::new();
        platform.failure = Some(error);
        platform
    }

    pub fn ending_after(frames: usize) -> Self {
        let mut platform = Self::new();
        platform.end_after = Some(frames);
        platform
    }

    pub fn acquire_count(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CapturePlatform for FakePlatform {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn acquire(&self, constraints: &CaptureConstraints) -> Result<StreamHandle, CaptureError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);

        if let Some(e) = &self.failure {
            return Err(e.clone());
        }

        let (tx, rx) = mpsc::channel(64);
        let end_after = self.end_after;
        let channels = constraints.channels;

        tokio::spawn(async move {
            let mut sent = 0usize;
            loop {
                if end_after.is_some_and(|n| sent >= n) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
                sent += 1;
                if tx.send(frame(sent as u64 * 100)).await.is_err() {
                    break;
                }
            }
        });

        Ok(StreamHandle::new(
            rx,
            constraints.sample_rate,
            channels,
            ReleaseCounter(Arc::clone(&self.releases)),
        ))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Uploader that records every call instead of sending it
#[derive(Default)]
pub struct RecordingUploader {
    pub segments: Mutex<Vec<(String, AudioSegment)>>,
    pub attachments: Mutex<Vec<(String, Attachment)>>,
    pub fail_segments: AtomicBool,
    pub fail_attachments: AtomicBool,
    /// Simulated network time per upload
    pub delay: Option<Duration>,
}

impl RecordingUploader {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.lock().unwrap().len()
    }

    pub fn segment_rooms(&self) -> Vec<String> {
        self.segments
            .lock()
            .unwrap()
            .iter()
            .map(|(room, _)| room.clone())
            .collect()
    }

    pub fn attachment_names(&self) -> Vec<String> {
        self.attachments
            .lock()
            .unwrap()
            .iter()
            .map(|(_, a)| a.file_name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Uploader for RecordingUploader {
    async fn upload_segment(&self, room_id: &str, segment: AudioSegment) -> Result<Value, UploadError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.segments
            .lock()
            .unwrap()
            .push((room_id.to_string(), segment));

        if self.fail_segments.load(Ordering::SeqCst) {
            return Err(UploadError::Status {
                status: 500,
                body: "ingestion down".to_string(),
            });
        }
        Ok(json!({ "ok": true }))
    }

    async fn upload_attachment(
        &self,
        room_id: &str,
        attachment: Attachment,
    ) -> Result<Value, UploadError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.attachments
            .lock()
            .unwrap()
            .push((room_id.to_string(), attachment));

        if self.fail_attachments.load(Ordering::SeqCst) {
            return Err(UploadError::Network("connection reset".to_string()));
        }
        Ok(json!({ "ok": true }))
    }
}

/// Sink that keeps every segment it is handed
#[derive(Default)]
pub struct CollectingSink {
    pub segments: Mutex<Vec<(String, AudioSegment)>>,
}

impl CollectingSink {
    pub fn count(&self) -> usize {
        self.segments.lock().unwrap().len()
    }

    pub fn take(&self) -> Vec<(String, AudioSegment)> {
        std::mem::take(&mut *self.segments.lock().unwrap())
    }
}

impl SegmentSink for CollectingSink {
    fn segment_ready(&self, room_id: &str, segment: AudioSegment) {
        self.segments
            .lock()
            .unwrap()
            .push((room_id.to_string(), segment));
    }
}
