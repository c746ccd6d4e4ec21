//! Local HTTP control API
//!
//! The routes stand in for the recording page's buttons:
//! - POST /record/start - Start recording (Idle -> Recording)
//! - POST /record/stop - Stop recording (Recording -> Idle)
//! - GET /record/status - State, room name and upload indicators
//! - POST /attachments - Upload a local file to the room
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{AttachmentRequest, ErrorResponse, StatusResponse};
pub use routes::create_router;
pub use state::AppState;
