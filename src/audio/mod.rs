pub mod backend;
pub mod microphone;
pub mod segment;

pub use backend::{AudioFrame, Capabilities, CaptureConstraints, CapturePlatform, StreamHandle};
pub use microphone::MicrophonePlatform;
pub use segment::{AudioSegment, SubRecording, SEGMENT_FILE_NAME, SEGMENT_MEDIA_TYPE};
