use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of one recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Local id used to correlate log lines
    pub session_id: Uuid,

    /// Room the segments were sent to
    pub room_id: String,

    /// Whether a sub-recording is still active
    pub is_recording: bool,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Timer-driven rotations before the session closed
    pub rotations: usize,

    /// Non-empty segments handed to the dispatcher (rotations + final flush)
    pub segments_emitted: usize,

    /// Sub-recordings that stopped with no audio
    pub empty_flushes: usize,
}
