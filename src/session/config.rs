use std::time::Duration;

use crate::audio::CaptureConstraints;
use crate::recording::DEFAULT_ROTATION_PERIOD;

/// Configuration for a recording session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Room the session uploads into, used verbatim in upload paths
    pub room_id: String,

    /// Length of each segment before the sub-recording rotates
    /// Default: 10 seconds
    pub rotation_period: Duration,

    /// Microphone constraints passed to the permission gate
    pub constraints: CaptureConstraints,
}

impl SessionConfig {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            rotation_period: DEFAULT_ROTATION_PERIOD,
            constraints: CaptureConstraints::default(),
        }
    }

    pub fn with_rotation_period(mut self, rotation_period: Duration) -> Self {
        self.rotation_period = rotation_period;
        self
    }
}
