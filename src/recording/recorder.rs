use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audio::{AudioFrame, AudioSegment, StreamHandle, SubRecording};
use crate::error::CaptureError;
use crate::session::SessionReport;

/// Default time between rotations
pub const DEFAULT_ROTATION_PERIOD: Duration = Duration::from_secs(10);

/// Receives each flushed segment. Must not block.
pub trait SegmentSink: Send + Sync {
    fn segment_ready(&self, room_id: &str, segment: AudioSegment);
}

enum RecorderEvent {
    Stop,
    Rotate,
    Frame(AudioFrame),
    StreamEnded,
    Closed,
}

/// Splits one continuous stream into independently decodable segments.
///
/// The recorder owns the stream handle, the active sub-recording and the
/// rotation timer. On every tick the sub-recording is stopped (emitting
/// its segment) and replaced; the stream itself stays open until `close`.
pub struct SegmentedRecorder {
    session_id: Uuid,
    room_id: String,
    stream: StreamHandle,
    active: Option<SubRecording>,
    rotation: Option<Interval>,
    sink: Arc<dyn SegmentSink>,
    started_at: DateTime<Utc>,
    rotations: usize,
    segments_emitted: usize,
    empty_flushes: usize,
    sub_recordings_created: usize,
}

impl SegmentedRecorder {
    /// Start the first sub-recording on `stream` and arm the rotation timer
    pub fn open(
        room_id: impl Into<String>,
        stream: StreamHandle,
        rotation_period: Duration,
        sink: Arc<dyn SegmentSink>,
    ) -> Result<Self, CaptureError> {
        let room_id = room_id.into();
        let first = SubRecording::start(stream.sample_rate(), stream.channels())?;

        // tokio rejects a zero period
        let period = rotation_period.max(Duration::from_millis(1));
        let first_tick = Instant::now().checked_add(period).ok_or_else(|| {
            CaptureError::Encoding(format!(
                "rotation period {}s is out of range",
                period.as_secs()
            ))
        })?;
        let mut rotation = time::interval_at(first_tick, period);
        rotation.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let session_id = Uuid::new_v4();
        info!(
            "Session {} recording room {} ({}Hz, {}ch, rotating every {:.1}s)",
            session_id,
            room_id,
            stream.sample_rate(),
            stream.channels(),
            period.as_secs_f64()
        );

        Ok(Self {
            session_id,
            room_id,
            stream,
            active: Some(first),
            rotation: Some(rotation),
            sink,
            started_at: Utc::now(),
            rotations: 0,
            segments_emitted: 0,
            empty_flushes: 0,
            sub_recordings_created: 1,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.rotation.is_some()
    }

    pub fn stream_released(&self) -> bool {
        self.stream.is_released()
    }

    pub fn rotations(&self) -> usize {
        self.rotations
    }

    pub fn segments_emitted(&self) -> usize {
        self.segments_emitted
    }

    pub fn sub_recordings_created(&self) -> usize {
        self.sub_recordings_created
    }

    pub fn write_frame(&mut self, frame: &AudioFrame) {
        if let Some(active) = &mut self.active {
            active.write_frame(frame);
        }
    }

    /// Replace the active sub-recording. No-op once closed.
    pub fn rotate(&mut self) {
        let Some(current) = self.active.take() else {
            debug!("Rotation after close ignored ({})", self.session_id);
            return;
        };

        self.flush(current);
        self.rotations += 1;

        match SubRecording::start(self.stream.sample_rate(), self.stream.channels()) {
            Ok(next) => {
                self.active = Some(next);
                self.sub_recordings_created += 1;
            }
            Err(e) => {
                error!("Failed to start next sub-recording, closing session: {}", e);
                self.close();
            }
        }
    }

    /// Flush the active sub-recording, disarm the timer, release the stream.
    ///
    /// Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(current) = self.active.take() {
            self.flush(current);
        }
        self.rotation = None;

        if self.stream.release() {
            info!(
                "Session {} closed for room {} ({} rotations, {} segments)",
                self.session_id, self.room_id, self.rotations, self.segments_emitted
            );
        }
    }

    /// Drive the recorder until `stop` fires or the stream ends
    pub async fn run(mut self, mut stop: oneshot::Receiver<()>) -> SessionReport {
        loop {
            match self.next_event(&mut stop).await {
                RecorderEvent::Frame(frame) => self.write_frame(&frame),
                RecorderEvent::Rotate => self.rotate(),
                RecorderEvent::Stop => {
                    let drained = self.drain_pending();
                    debug!(
                        "Stop requested for session {} ({} queued frames kept)",
                        self.session_id, drained
                    );
                    break;
                }
                RecorderEvent::StreamEnded => {
                    warn!("Audio stream ended, closing session {}", self.session_id);
                    break;
                }
                RecorderEvent::Closed => break,
            }
        }

        self.close();
        self.report()
    }

    /// Move frames captured before the stop into the active sub-recording
    fn drain_pending(&mut self) -> usize {
        let mut drained = 0;
        while let Some(frame) = self.stream.try_next_frame() {
            self.write_frame(&frame);
            drained += 1;
        }
        drained
    }

    async fn next_event(&mut self, stop: &mut oneshot::Receiver<()>) -> RecorderEvent {
        let Some(rotation) = self.rotation.as_mut() else {
            return RecorderEvent::Closed;
        };

        tokio::select! {
            biased;
            _ = stop => RecorderEvent::Stop,
            _ = rotation.tick() => RecorderEvent::Rotate,
            frame = self.stream.next_frame() => match frame {
                Some(frame) => RecorderEvent::Frame(frame),
                None => RecorderEvent::StreamEnded,
            },
        }
    }

    pub fn report(&self) -> SessionReport {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionReport {
            session_id: self.session_id,
            room_id: self.room_id.clone(),
            is_recording: self.is_open(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            rotations: self.rotations,
            segments_emitted: self.segments_emitted,
            empty_flushes: self.empty_flushes,
        }
    }

    fn flush(&mut self, sub_recording: SubRecording) {
        match sub_recording.stop() {
            Ok(Some(segment)) => {
                self.segments_emitted += 1;
                debug!(
                    "Segment ready for room {}: {:.1}s, {} bytes",
                    self.room_id,
                    segment.duration_ms() as f64 / 1000.0,
                    segment.payload.len()
                );
                self.sink.segment_ready(&self.room_id, segment);
            }
            Ok(None) => self.empty_flushes += 1,
            Err(e) => error!("Failed to flush sub-recording: {}", e),
        }
    }
}
