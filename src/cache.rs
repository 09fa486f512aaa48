//! # Frame Cache
//!
//! Keeps the last validated reply per device on disk so that repeated status
//! queries within a short window, possibly from separate processes, do not
//! poll the controller again.
//!
//! One file per device, `<dir>/tracer-<device id>.frame`, holding the sync
//! marker followed by the raw frame. Writers create a uniquely named temporary
//! file in the same directory and rename it over the canonical path, so a
//! reader sees either the previous complete frame or the new one. Nobody
//! locks; concurrent writers race and the last rename wins.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tracer_rs::cache::{device_id, FrameCache};
//!
//! let cache = FrameCache::new(std::env::temp_dir(), Duration::from_secs(10));
//! let id = device_id("/dev/ttyUSB0");
//! if let Ok(Some(record)) = cache.read(&id, false) {
//!     // replay through the synchronizer and decoder
//! }
//! ```

use crate::constants::{TRACER_DEFAULT_CACHE_TTL, TRACER_SYNC_MARKER};
use crate::error::TracerError;
use log::debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Derives the cache identity from a channel's logical name.
///
/// `/dev/ttyUSB0` becomes `ttyUSB0`; characters outside `[A-Za-z0-9._-]`
/// become `_`.
pub fn device_id(device: &str) -> String {
    let name = Path::new(device)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(device);

    let id: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if id.is_empty() {
        "default".to_string()
    } else {
        id
    }
}

/// Per-device on-disk cache of the last good frame.
#[derive(Debug, Clone)]
pub struct FrameCache {
    dir: PathBuf,
    ttl: Duration,
}

impl Default for FrameCache {
    fn default() -> Self {
        FrameCache::new(std::env::temp_dir(), TRACER_DEFAULT_CACHE_TTL)
    }
}

impl FrameCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        FrameCache {
            dir: dir.into(),
            ttl,
        }
    }

    /// Canonical path of a device's cache file.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("tracer-{id}.frame"))
    }

    /// Returns the cached record, or `None` on a miss.
    pub fn read(&self, id: &str, allow_stale: bool) -> Result<Option<Vec<u8>>, TracerError> {
        self.read_as_of(id, allow_stale, SystemTime::now())
    }

    /// [`FrameCache::read`] with an explicit clock.
    pub fn read_as_of(
        &self,
        id: &str,
        allow_stale: bool,
        now: SystemTime,
    ) -> Result<Option<Vec<u8>>, TracerError> {
        let path = self.path_for(id);

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(cache_error(&path, e)),
        };

        if !allow_stale {
            let modified = metadata.modified().map_err(|e| cache_error(&path, e))?;
            // A timestamp in the future counts as age zero.
            let age = now.duration_since(modified).unwrap_or_default();
            if age >= self.ttl {
                debug!("cache entry {} is stale ({:?} old)", path.display(), age);
                return Ok(None);
            }
        }

        match fs::read(&path) {
            Ok(record) => Ok(Some(record)),
            // Invalidated between stat and open.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(cache_error(&path, e)),
        }
    }

    /// Stores a validated frame (address..terminator) for a device.
    pub fn write(&self, id: &str, frame: &[u8]) -> Result<(), TracerError> {
        let path = self.path_for(id);

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".tracer-{id}."))
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| cache_error(&self.dir, e))?;

        if let Err(e) = write_record(tmp.as_file_mut(), frame) {
            return Err(cache_error(tmp.path(), e));
        }

        // On failure the temporary file is removed when `PersistError` drops.
        tmp.persist(&path).map_err(|e| cache_error(&path, e.error))?;
        debug!("cached {} bytes in {}", frame.len(), path.display());
        Ok(())
    }

    /// Removes a device's entry. Succeeds if it is already gone.
    pub fn invalidate(&self, id: &str) -> Result<(), TracerError> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("invalidated {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(cache_error(&path, e)),
        }
    }
}

fn write_record(file: &mut fs::File, frame: &[u8]) -> std::io::Result<()> {
    file.write_all(&TRACER_SYNC_MARKER)?;
    file.write_all(frame)?;
    file.sync_all()
}

fn cache_error(path: &Path, e: std::io::Error) -> TracerError {
    TracerError::CacheIo(format!("{}: {e}", path.display()))
}
