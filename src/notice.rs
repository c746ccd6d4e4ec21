use serde::Serialize;
use tokio::sync::mpsc;

/// User-facing events from the capture pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Recording is not possible in this environment
    CaptureUnsupported,
    /// Microphone could not be acquired
    CaptureFailed { reason: String },
    /// A segment never reached the server. Capture keeps going.
    SegmentUploadFailed { room_id: String, reason: String },
    AttachmentUploadFailed {
        room_id: String,
        file_name: String,
        reason: String,
    },
    AttachmentUploaded { room_id: String, file_name: String },
}

impl Notice {
    /// Text shown to the user
    pub fn message(&self) -> String {
        match self {
            Notice::CaptureUnsupported => {
                "Audio recording is not supported in this environment.".to_string()
            }
            Notice::CaptureFailed { reason } => format!("Could not start recording: {}", reason),
            Notice::SegmentUploadFailed { reason, .. } => {
                format!("An audio segment failed to upload: {}", reason)
            }
            Notice::AttachmentUploadFailed { file_name, .. } => {
                format!("Failed to upload {}. Please try again.", file_name)
            }
            Notice::AttachmentUploaded { file_name, .. } => format!("Uploaded {}", file_name),
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Notice::AttachmentUploaded { .. })
    }
}

pub type NoticeSender = mpsc::UnboundedSender<Notice>;
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

pub fn notice_channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}
