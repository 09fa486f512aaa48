//! # Tracer Device Manager
//!
//! The retry controller tying the frame cache, the channel and the protocol
//! engine together. One call to [`TracerDeviceManager::execute`] produces one
//! decoded reply or one terminal error:
//!
//! 1. Status requests try the cache first (unless forced). A cached frame is
//!    raw bytes and goes through the synchronizer and validator again; if it
//!    fails, the entry is dropped and a live cycle follows.
//! 2. The live cycle opens the channel once, then repeats
//!    reset → send → receive → decode up to `retries` times with `backoff`
//!    between attempts. Channel I/O failures end the cycle immediately.
//! 3. A status reply replaces the cache entry; a load-switch acknowledgement
//!    invalidates it. Cache failures never fail the call; they are returned as
//!    `cache_warning`.

use crate::cache::{device_id, FrameCache};
use crate::config::TracerConfig;
use crate::constants::{TRACER_DEFAULT_BACKOFF, TRACER_DEFAULT_RETRIES};
use crate::error::{ErrorClass, TracerError};
use crate::tracer::frame::Request;
use crate::tracer::reply::{decode_reply, Reply};
use crate::tracer::serial::{Connector, SerialConnector, SerialPort, TracerDeviceHandle};
use crate::tracer::sync;
use bytes::Bytes;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::Duration;

/// Retry and cache policy for one query.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Live attempts before giving up
    pub retries: u32,
    /// Pause between live attempts
    pub backoff: Duration,
    /// Skip the cache lookup for status requests
    pub force: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            retries: TRACER_DEFAULT_RETRIES,
            backoff: TRACER_DEFAULT_BACKOFF,
            force: false,
        }
    }
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Cache,
    Live,
}

/// Result of a successful query.
#[derive(Debug)]
pub struct QueryOutcome {
    pub reply: Reply,
    pub source: ReplySource,
    /// Live attempts used; zero for a cache hit
    pub attempts: u32,
    /// Non-fatal cache failure observed during the query
    pub cache_warning: Option<TracerError>,
}

/// Executes requests against controllers reachable through a [`Connector`].
pub struct TracerDeviceManager<C: Connector = SerialConnector> {
    connector: C,
    cache: FrameCache,
    options: QueryOptions,
}

impl TracerDeviceManager<SerialConnector> {
    /// Builds a manager for real serial ports from a configuration.
    pub fn from_config(config: &TracerConfig) -> Self {
        TracerDeviceManager::new(
            SerialConnector::new(config.serial_config()),
            config.frame_cache(),
            config.query_options(),
        )
    }
}

impl<C: Connector> TracerDeviceManager<C> {
    pub fn new(connector: C, cache: FrameCache, options: QueryOptions) -> Self {
        TracerDeviceManager {
            connector,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    /// Executes one request for `device`.
    pub async fn execute(
        &self,
        device: &str,
        request: Request,
    ) -> Result<QueryOutcome, TracerError> {
        let id = device_id(device);
        let mut cache_warning = None;

        if !request.is_switch() && !self.options.force {
            match self.read_cached(&id) {
                Ok(Some(reply)) => {
                    return Ok(QueryOutcome {
                        reply,
                        source: ReplySource::Cache,
                        attempts: 0,
                        cache_warning: None,
                    })
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("cache lookup for {device} failed: {e}");
                    cache_warning = Some(e);
                }
            }
        }

        let mut handle = self.connector.open(device).await?;
        let (reply, frame, attempts) = self.live_cycle(&mut handle, request).await?;

        let update = match reply {
            Reply::Status(_) => self.cache.write(&id, &frame),
            Reply::SwitchAck { .. } => self.cache.invalidate(&id),
        };
        if let Err(e) = update {
            warn!("cache update for {device} failed: {e}");
            cache_warning = Some(e);
        }

        Ok(QueryOutcome {
            reply,
            source: ReplySource::Live,
            attempts,
            cache_warning,
        })
    }

    /// Looks up and re-validates a cached status frame.
    fn read_cached(&self, id: &str) -> Result<Option<Reply>, TracerError> {
        let Some(record) = self.cache.read(id, false)? else {
            debug!("cache miss for {id}");
            return Ok(None);
        };

        match sync::scan(&record).and_then(|frame| decode_reply(&frame)) {
            Ok(reply @ Reply::Status(_)) => {
                debug!("cache hit for {id}");
                Ok(Some(reply))
            }
            Ok(other) => {
                warn!("cache entry for {id} holds {other:?}, dropping it");
                self.cache.invalidate(id)?;
                Ok(None)
            }
            Err(e) => {
                warn!("cache entry for {id} failed re-validation: {e}");
                self.cache.invalidate(id)?;
                Ok(None)
            }
        }
    }

    async fn live_cycle<P: SerialPort>(
        &self,
        handle: &mut TracerDeviceHandle<P>,
        request: Request,
    ) -> Result<(Reply, Bytes, u32), TracerError> {
        let retries = self.options.retries.max(1);
        let mut last_error = TracerError::Timeout;

        for attempt in 1..=retries {
            if attempt > 1 {
                tokio::time::sleep(self.options.backoff).await;
            }

            handle.reset()?;
            match Self::attempt(handle, request).await {
                Ok((reply, frame)) => {
                    info!("{request} answered on attempt {attempt}");
                    return Ok((reply, frame, attempt));
                }
                Err(e) if e.class() == ErrorClass::Resource => return Err(e),
                Err(e) => {
                    warn!("{request} attempt {attempt}/{retries} failed: {e}");
                    last_error = e;
                }
            }
        }

        Err(TracerError::RetriesExhausted {
            attempts: retries,
            last: Box::new(last_error),
        })
    }

    async fn attempt<P: SerialPort>(
        handle: &mut TracerDeviceHandle<P>,
        request: Request,
    ) -> Result<(Reply, Bytes), TracerError> {
        let (reply, frame) = handle.request_response(request).await?;

        match (request, reply) {
            (Request::Status, Reply::Status(_)) => Ok((reply, frame)),
            (Request::PowerOn | Request::PowerOff, Reply::SwitchAck { load_on }) => {
                if load_on != (request == Request::PowerOn) {
                    warn!("{request} acknowledged with load_on={load_on}");
                }
                Ok((reply, frame))
            }
            _ => Err(TracerError::UnexpectedReply(format!(
                "{request} answered with {reply:?}"
            ))),
        }
    }
}
