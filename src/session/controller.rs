use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::stats::SessionReport;
use crate::audio::CapturePlatform;
use crate::error::{CaptureError, UploadError};
use crate::notice::{Notice, NoticeSender};
use crate::recording::SegmentedRecorder;
use crate::upload::{Attachment, UploadDispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Idle,
    Recording,
}

/// A running session: the recorder lives inside `task`
struct ActiveSession {
    session_id: Uuid,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<SessionReport>,
}

/// Idle/Recording state machine driven by the user-facing controls
pub struct RecordingController {
    config: SessionConfig,
    platform: Arc<dyn CapturePlatform>,
    dispatcher: UploadDispatcher,
    notices: NoticeSender,
    active: Option<ActiveSession>,
}

impl RecordingController {
    pub fn new(
        config: SessionConfig,
        platform: Arc<dyn CapturePlatform>,
        dispatcher: UploadDispatcher,
        notices: NoticeSender,
    ) -> Self {
        info!(
            "Recording controller for room {} using {}",
            config.room_id,
            platform.name()
        );

        Self {
            config,
            platform,
            dispatcher,
            notices,
            active: None,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.config.room_id
    }

    pub fn dispatcher(&self) -> &UploadDispatcher {
        &self.dispatcher
    }

    /// Idle once the session task has ended, even without `stop`
    pub fn state(&self) -> RecordingState {
        match &self.active {
            Some(active) if !active.task.is_finished() => RecordingState::Recording,
            _ => RecordingState::Idle,
        }
    }

    /// Idle -> Recording
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.state() == RecordingState::Recording {
            warn!("Recording already started for room {}", self.config.room_id);
            return Ok(());
        }

        // A session whose stream ended on its own still needs reaping
        if let Some(finished) = self.active.take() {
            if let Ok(report) = finished.task.await {
                debug!(
                    "Reaped ended session {} ({} segments)",
                    report.session_id, report.segments_emitted
                );
            }
        }

        if !self.platform.supported() {
            warn!(
                "Audio capture unsupported on {}: {:?}",
                self.platform.name(),
                self.platform.capabilities()
            );
            self.notify(Notice::CaptureUnsupported);
            return Err(CaptureError::CapabilityUnsupported);
        }

        info!("Requesting microphone for room {}", self.config.room_id);

        let stream = match self.platform.acquire(&self.config.constraints).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e)),
        };

        let recorder = match SegmentedRecorder::open(
            self.config.room_id.clone(),
            stream,
            self.config.rotation_period,
            Arc::new(self.dispatcher.clone()),
        ) {
            Ok(recorder) => recorder,
            Err(e) => return Err(self.fail(e)),
        };

        let session_id = recorder.session_id();
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(recorder.run(stop_rx));

        self.active = Some(ActiveSession {
            session_id,
            stop_tx,
            task,
        });

        info!("Recording started for room {}", self.config.room_id);

        Ok(())
    }

    /// Recording -> Idle. Never fails; `None` when nothing was recording.
    pub async fn stop(&mut self) -> Option<SessionReport> {
        let Some(active) = self.active.take() else {
            debug!("Recording not active for room {}", self.config.room_id);
            return None;
        };

        info!("Stopping session {}", active.session_id);

        // The task may already be gone if its stream ended
        let _ = active.stop_tx.send(());

        match active.task.await {
            Ok(report) => {
                info!(
                    "Recording stopped for room {}: {:.1}s, {} segments",
                    report.room_id, report.duration_secs, report.segments_emitted
                );
                Some(report)
            }
            Err(e) => {
                error!("Session task for {} failed: {}", active.session_id, e);
                None
            }
        }
    }

    /// Upload a user-selected file to this room. Allowed in both states.
    pub fn send_attachment(
        &self,
        attachment: Attachment,
    ) -> Result<JoinHandle<Result<Value, UploadError>>, UploadError> {
        self.dispatcher.send_attachment(attachment, &self.config.room_id)
    }

    fn fail(&self, e: CaptureError) -> CaptureError {
        error!("Failed to start recording for room {}: {}", self.config.room_id, e);
        self.notify(Notice::CaptureFailed {
            reason: e.to_string(),
        });
        e
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!("No notice listener");
        }
    }
}
