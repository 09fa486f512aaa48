//! # Configuration
//!
//! Settings consumed by the retry controller and the channel, loadable from a
//! JSON file. Every field has a default, so `{}` is a valid configuration.
//!
//! ```json
//! {
//!   "device": "/dev/ttyUSB0",
//!   "read_timeout_ms": 500,
//!   "retries": 7,
//!   "cache_ttl_secs": 10,
//!   "scaling": "centi"
//! }
//! ```

use crate::cache::FrameCache;
use crate::constants::{
    TRACER_DEFAULT_ATTEMPT_TIMEOUT, TRACER_DEFAULT_BACKOFF, TRACER_DEFAULT_BAUDRATE,
    TRACER_DEFAULT_CACHE_TTL, TRACER_DEFAULT_READ_TIMEOUT, TRACER_DEFAULT_RETRIES,
};
use crate::error::TracerError;
use crate::tracer::scaling::ScalingPreset;
use crate::tracer::serial::SerialConfig;
use crate::tracer_device_manager::QueryOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    pub device: String,
    pub baudrate: u32,
    pub read_timeout_ms: u64,
    /// Upper bound on receiving one reply
    pub attempt_timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    pub cache_ttl_secs: u64,
    /// Defaults to the OS temp directory
    pub cache_dir: Option<PathBuf>,
    /// Always query the device, ignoring any cached frame
    pub force: bool,
    pub scaling: ScalingPreset,
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            device: "/dev/ttyUSB0".to_string(),
            baudrate: TRACER_DEFAULT_BAUDRATE,
            read_timeout_ms: TRACER_DEFAULT_READ_TIMEOUT.as_millis() as u64,
            attempt_timeout_ms: TRACER_DEFAULT_ATTEMPT_TIMEOUT.as_millis() as u64,
            retries: TRACER_DEFAULT_RETRIES,
            backoff_ms: TRACER_DEFAULT_BACKOFF.as_millis() as u64,
            cache_ttl_secs: TRACER_DEFAULT_CACHE_TTL.as_secs(),
            cache_dir: None,
            force: false,
            scaling: ScalingPreset::default(),
        }
    }
}

impl TracerConfig {
    /// Loads and validates a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TracerError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| TracerError::Config(format!("{}: {e}", path.display())))?;
        let config: TracerConfig = serde_json::from_str(&json)
            .map_err(|e| TracerError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TracerError> {
        if self.device.is_empty() {
            return Err(TracerError::Config("device must not be empty".into()));
        }
        if self.retries == 0 {
            return Err(TracerError::Config("retries must be at least 1".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(TracerError::Config("read_timeout_ms must be positive".into()));
        }
        if self.attempt_timeout_ms == 0 {
            return Err(TracerError::Config("attempt_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            baudrate: self.baudrate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            retries: self.retries,
            backoff: Duration::from_millis(self.backoff_ms),
            force: self.force,
        }
    }

    pub fn frame_cache(&self) -> FrameCache {
        let dir = self.cache_dir.clone().unwrap_or_else(std::env::temp_dir);
        FrameCache::new(dir, Duration::from_secs(self.cache_ttl_secs))
    }
}
