pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod notice;
pub mod recording;
pub mod session;
pub mod upload;

pub use api::{ApiClient, CreateRoomRequest, RoomDescriptor, Uploader};
pub use audio::{
    AudioFrame, AudioSegment, Capabilities, CaptureConstraints, CapturePlatform, MicrophonePlatform,
    StreamHandle, SubRecording,
};
pub use config::Config;
pub use error::{CaptureError, UploadError};
pub use http::{create_router, AppState};
pub use notice::{notice_channel, Notice, NoticeReceiver, NoticeSender};
pub use recording::{SegmentSink, SegmentedRecorder};
pub use session::{RecordingController, RecordingState, SessionConfig, SessionReport};
pub use upload::{Attachment, UploadDispatcher};
