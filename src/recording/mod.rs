pub mod recorder;

pub use recorder::{SegmentSink, SegmentedRecorder, DEFAULT_ROTATION_PERIOD};
