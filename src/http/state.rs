use crate::session::RecordingController;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The room's recording state machine
    pub controller: Arc<Mutex<RecordingController>>,

    /// Display name resolved from the room list, if any
    pub room_name: Option<String>,
}

impl AppState {
    pub fn new(controller: RecordingController, room_name: Option<String>) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            room_name,
        }
    }
}
