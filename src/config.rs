use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::audio::CaptureConstraints;
use crate::session::SessionConfig;
use crate::upload::DEFAULT_SUGGESTED_EXTENSIONS;

/// Longest allowed segment, one hour
pub const MAX_ROTATION_PERIOD_SECS: u64 = 3600;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub audio: AudioConfig,
    pub attachments: AttachmentsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "room-capture".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 4100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3333".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub rotation_period_secs: u64,
    /// Callback buffers queued between the device and the recorder
    pub frame_buffer: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let constraints = CaptureConstraints::default();
        Self {
            sample_rate: constraints.sample_rate,
            channels: constraints.channels,
            echo_cancellation: constraints.echo_cancellation,
            noise_suppression: constraints.noise_suppression,
            rotation_period_secs: 10,
            frame_buffer: 256,
        }
    }
}

impl AudioConfig {
    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            echo_cancellation: self.echo_cancellation,
            noise_suppression: self.noise_suppression,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    pub fn rotation_period(&self) -> Duration {
        Duration::from_secs(self.rotation_period_secs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AttachmentsConfig {
    /// Suggested to the user, never enforced
    pub suggested_extensions: Vec<String>,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            suggested_extensions: DEFAULT_SUGGESTED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load `path` (any format the config crate knows, extension optional),
    /// then apply `ROOM_CAPTURE__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ROOM_CAPTURE").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        let cfg: Self = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio.rotation_period_secs == 0 {
            anyhow::bail!("audio.rotation_period_secs must be at least 1");
        }
        if self.audio.rotation_period_secs > MAX_ROTATION_PERIOD_SECS {
            anyhow::bail!(
                "audio.rotation_period_secs must be at most {}, got {}",
                MAX_ROTATION_PERIOD_SECS,
                self.audio.rotation_period_secs
            );
        }
        if self.audio.sample_rate == 0 || self.audio.channels == 0 {
            anyhow::bail!(
                "audio format must be non-zero, got {}Hz {}ch",
                self.audio.sample_rate,
                self.audio.channels
            );
        }
        Ok(())
    }

    /// Session settings for `room_id` derived from the audio section
    pub fn session(&self, room_id: impl Into<String>) -> SessionConfig {
        SessionConfig {
            room_id: room_id.into(),
            rotation_period: self.audio.rotation_period(),
            constraints: self.audio.constraints(),
        }
    }
}
