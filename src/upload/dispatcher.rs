use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::attachment::{Attachment, DEFAULT_SUGGESTED_EXTENSIONS};
use crate::api::Uploader;
use crate::audio::AudioSegment;
use crate::error::UploadError;
use crate::notice::{Notice, NoticeSender};
use crate::recording::SegmentSink;

/// Fire-and-forget uploads of segments and attachments.
///
/// Every upload runs as its own task. Nothing is retried, reordered or
/// cancelled when the session stops.
#[derive(Clone)]
pub struct UploadDispatcher {
    uploader: Arc<dyn Uploader>,
    notices: NoticeSender,
    suggested_extensions: Arc<Vec<String>>,
    attachment_busy: Arc<AtomicBool>,
    in_flight: Arc<watch::Sender<usize>>,
}

impl UploadDispatcher {
    pub fn new(uploader: Arc<dyn Uploader>, notices: NoticeSender) -> Self {
        let (in_flight, _) = watch::channel(0);

        Self {
            uploader,
            notices,
            suggested_extensions: Arc::new(
                DEFAULT_SUGGESTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            ),
            attachment_busy: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(in_flight),
        }
    }

    pub fn with_suggested_extensions(mut self, extensions: Vec<String>) -> Self {
        self.suggested_extensions = Arc::new(extensions);
        self
    }

    pub fn suggested_extensions(&self) -> &[String] {
        &self.suggested_extensions
    }

    /// Upload one segment in the background
    pub fn send_segment(&self, segment: AudioSegment, room_id: &str) -> JoinHandle<()> {
        let uploader = Arc::clone(&self.uploader);
        let notices = self.notices.clone();
        let room_id = room_id.to_string();
        let guard = InFlight::enter(&self.in_flight);

        let bytes = segment.payload.len();
        let duration_ms = segment.duration_ms();

        tokio::spawn(async move {
            let _guard = guard;

            match uploader.upload_segment(&room_id, segment).await {
                Ok(_) => {
                    info!(
                        "Segment uploaded to room {} ({:.1}s, {} bytes)",
                        room_id,
                        duration_ms as f64 / 1000.0,
                        bytes
                    );
                }
                Err(e) => {
                    error!("Failed to upload segment to room {}: {}", room_id, e);
                    let _ = notices.send(Notice::SegmentUploadFailed {
                        room_id,
                        reason: e.to_string(),
                    });
                }
            }
        })
    }

    /// Upload an attachment in the background.
    ///
    /// Only one attachment may be in flight. The busy flag is cleared
    /// when the upload finishes, whatever the outcome.
    pub fn send_attachment(
        &self,
        attachment: Attachment,
        room_id: &str,
    ) -> Result<JoinHandle<Result<Value, UploadError>>, UploadError> {
        if self
            .attachment_busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(UploadError::AttachmentInProgress);
        }
        let busy = BusyFlag(Arc::clone(&self.attachment_busy));

        if !attachment.matches_suggestion(self.suggested_extensions.as_slice()) {
            debug!(
                "Attachment {} is outside the suggested types {:?}, sending anyway",
                attachment.file_name, self.suggested_extensions
            );
        }

        let uploader = Arc::clone(&self.uploader);
        let notices = self.notices.clone();
        let room_id = room_id.to_string();
        let guard = InFlight::enter(&self.in_flight);

        info!(
            "Uploading attachment {} to room {}",
            attachment.file_name, room_id
        );

        Ok(tokio::spawn(async move {
            let _guard = guard;
            let _busy = busy;
            let file_name = attachment.file_name.clone();

            let result = uploader.upload_attachment(&room_id, attachment).await;
            match &result {
                Ok(_) => {
                    info!("Attachment {} uploaded to room {}", file_name, room_id);
                    let _ = notices.send(Notice::AttachmentUploaded { room_id, file_name });
                }
                Err(e) => {
                    error!("Failed to upload attachment {} to room {}: {}", file_name, room_id, e);
                    let _ = notices.send(Notice::AttachmentUploadFailed {
                        room_id,
                        file_name,
                        reason: e.to_string(),
                    });
                }
            }
            result
        }))
    }

    /// Whether an attachment upload is running
    pub fn is_uploading(&self) -> bool {
        self.attachment_busy.load(Ordering::SeqCst)
    }

    /// Uploads currently running
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait until every dispatched upload has finished
    pub async fn drain(&self) {
        let mut rx = self.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl SegmentSink for UploadDispatcher {
    fn segment_ready(&self, room_id: &str, segment: AudioSegment) {
        self.send_segment(segment, room_id);
    }
}

/// Counts one running upload for as long as it lives
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn enter(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Clears the attachment indicator on drop
struct BusyFlag(Arc<AtomicBool>);

impl Drop for BusyFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
