//! # tracer-rs - A Rust Crate for Tracer Solar Charge Controllers
//!
//! The tracer-rs crate talks to Tracer-series solar charge controllers over
//! their proprietary serial telegram protocol. It encodes requests, recovers
//! reply frames from a noisy byte stream, validates and decodes them, and keeps
//! the last good status reply in a short-lived on-disk cache shared between
//! processes.
//!
//! ## Features
//!
//! - Status queries and load switching over a serial port (9600 8N1)
//! - Frame synchronization that tolerates line noise and chunked reads
//! - Checksum verification of every reply, including cached ones
//! - Bounded retries with backoff, and a freshness-limited frame cache
//! - Conversion of raw readings to engineering units
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tracer_rs::{query, Reply, Request};
//!
//! # async fn run() -> Result<(), tracer_rs::TracerError> {
//! let outcome = query("/dev/ttyUSB0", Request::Status).await?;
//! if let Reply::Status(status) = outcome.reply {
//!     println!("battery: {}", status.battery_voltage);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod tracer;
pub mod tracer_device_manager;
pub mod util;

pub use crate::config::TracerConfig;
pub use crate::error::{ErrorClass, TracerError};
pub use crate::logging::{init_logger, log_info, log_warn};

pub use cache::{device_id, FrameCache};
pub use tracer::{
    decode_reply, pack_request, Measurements, Reply, Request, Scaling, ScalingPreset,
    StatusReply, TracerDeviceHandle,
};
pub use tracer_device_manager::{QueryOptions, QueryOutcome, ReplySource, TracerDeviceManager};

/// Execute one request against a controller with the default configuration.
///
/// # Arguments
/// * `device` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
/// * `request` - Request to send
///
/// # Returns
/// * `Ok(QueryOutcome)` - Decoded reply, from the cache or the device
/// * `Err(TracerError)` - The channel could not be opened or all attempts failed
pub async fn query(device: &str, request: Request) -> Result<QueryOutcome, TracerError> {
    let config = TracerConfig {
        device: device.to_string(),
        ..TracerConfig::default()
    };
    TracerDeviceManager::from_config(&config)
        .execute(device, request)
        .await
}

/// Open a serial connection to a controller.
///
/// # Arguments
/// * `device` - Serial port path
///
/// # Returns
/// * `Ok(TracerDeviceHandle)` - Handle for a manual request/reply cycle
/// * `Err(TracerError)` - The port could not be opened
pub fn connect(device: &str) -> Result<TracerDeviceHandle, TracerError> {
    TracerDeviceHandle::connect(device, &tracer::SerialConfig::default())
}
