//! Recording session control
//!
//! This module provides the `RecordingController` state machine that:
//! - Probes capture support before touching any device
//! - Acquires the microphone and opens a `SegmentedRecorder`
//! - Runs the recorder on its own task until stopped
//! - Routes attachments to the upload dispatcher

mod config;
mod controller;
mod stats;

pub use config::SessionConfig;
pub use controller::{RecordingController, RecordingState};
pub use stats::SessionReport;
