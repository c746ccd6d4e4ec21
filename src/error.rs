use thiserror::Error;

/// Failures on the capture side: probing, acquiring and encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Audio capture is not supported in this environment")]
    CapabilityUnsupported,

    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("No usable audio input device: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to encode audio segment: {0}")]
    Encoding(String),
}

/// Failures talking to the room API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Request failed: {0}")]
    Network(String),

    #[error("Server responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response body: {0}")]
    InvalidResponse(String),

    #[error("An attachment upload is already in progress")]
    AttachmentInProgress,

    #[error("Failed to read attachment: {0}")]
    Io(String),

    #[error("Invalid room: {0}")]
    InvalidRoom(String),
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        UploadError::Network(e.to_string())
    }
}
