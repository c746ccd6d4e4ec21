use std::io::Cursor;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::backend::AudioFrame;
use crate::error::CaptureError;

/// Media type of every emitted segment
pub const SEGMENT_MEDIA_TYPE: &str = "audio/wav";

/// File name segments are uploaded under
pub const SEGMENT_FILE_NAME: &str = "audio.wav";

/// One bounded, self-contained audio payload
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Complete WAV container (header + 16-bit PCM)
    pub payload: Vec<u8>,
    /// When the sub-recording that produced this segment started
    pub started_at: DateTime<Utc>,
    /// When the segment was flushed
    pub emitted_at: DateTime<Utc>,
    /// Sample rate
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Number of samples in this segment (all channels)
    pub sample_count: usize,
}

impl AudioSegment {
    pub fn media_type(&self) -> &'static str {
        SEGMENT_MEDIA_TYPE
    }

    pub fn file_name(&self) -> &'static str {
        SEGMENT_FILE_NAME
    }

    /// Audio duration derived from the sample count
    pub fn duration_ms(&self) -> u64 {
        let per_second = self.sample_rate as u64 * self.channels as u64;
        if per_second == 0 {
            return 0;
        }
        self.sample_count as u64 * 1000 / per_second
    }
}

/// A single sub-recording instance.
///
/// Buffers PCM while active. `stop` writes the buffer out as a finished
/// WAV container, so every segment carries its own header.
#[derive(Debug)]
pub struct SubRecording {
    sample_rate: u32,
    channels: u16,
    started_at: DateTime<Utc>,
    samples: Vec<i16>,
}

impl SubRecording {
    /// Whether a sub-recording can be built for this format
    pub fn supports_format(sample_rate: u32, channels: u16) -> bool {
        sample_rate > 0 && channels > 0
    }

    pub fn start(sample_rate: u32, channels: u16) -> Result<Self, CaptureError> {
        if !Self::supports_format(sample_rate, channels) {
            return Err(CaptureError::Encoding(format!(
                "unsupported format: {}Hz, {} channels",
                sample_rate, channels
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
            started_at: Utc::now(),
            samples: Vec::new(),
        })
    }

    pub fn write_frame(&mut self, frame: &AudioFrame) {
        self.samples.extend_from_slice(&frame.samples);
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Stop and flush. Yields `None` when nothing was captured.
    pub fn stop(self) -> Result<Option<AudioSegment>, CaptureError> {
        if self.samples.is_empty() {
            debug!("Sub-recording stopped with no samples, nothing to emit");
            return Ok(None);
        }

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.samples.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;

            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| CaptureError::Encoding(e.to_string()))?;
            }

            writer
                .finalize()
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        }

        Ok(Some(AudioSegment {
            payload: cursor.into_inner(),
            started_at: self.started_at,
            emitted_at: Utc::now(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            sample_count: self.samples.len(),
        }))
    }
}
