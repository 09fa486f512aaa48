//! # Tracer Stream Synchronizer
//!
//! Recovers one candidate frame from a byte stream with arbitrary chunking.
//! The only delimiter is the two-byte sync marker `EB 90`, which the
//! controller may repeat and which can also appear inside payload data, so
//! the marker is only searched for while no frame is being accumulated.
//!
//! ```text
//!            EB                90               3 header bytes
//! SeekMarker1 --> SeekMarker2 ---> Synced ------------------------> Accumulate
//!      ^              |  EB: stay     | EB before header: repeated      |
//!      +--------------+ other         | marker, back to SeekMarker2     | len + 6 bytes
//!                                                                       v
//!      read timeout or attempt deadline from any state -> Timeout    Complete
//! ```
//!
//! The synchronizer only frames. A declared length larger than any valid reply
//! still produces a candidate (truncated to [`TRACER_FRAME_CAPACITY`]) and is left
//! for the reply validator to reject.
//!
//! The same machine serves both sources: [`read_frame`] feeds it from an
//! interactive channel in whatever chunks the channel yields, while [`scan`]
//! runs it over a complete pre-recorded buffer (cache replay) in one pass.

use crate::constants::{
    TRACER_FRAME_CAPACITY, TRACER_FRAME_OVERHEAD, TRACER_HEADER_LEN, TRACER_SYNC_MARKER,
};
use crate::error::TracerError;
use bytes::{BufMut, Bytes, BytesMut};
use log::debug;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;

/// States of the frame synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Looking for the first marker byte
    SeekMarker1,
    /// First marker byte seen; confirming the second
    SeekMarker2,
    /// Marker confirmed; reading the address/function/length header
    Synced,
    /// Header known; reading payload, checksum and terminator
    Accumulate,
    /// A candidate frame is ready
    Complete,
    /// The channel went quiet before a frame completed
    Timeout,
}

/// Byte-driven frame synchronizer. Owns the candidate buffer while accumulating.
#[derive(Debug)]
pub struct FrameSynchronizer {
    state: SyncState,
    frame: BytesMut,
    expected_len: usize,
    discarded: usize,
}

impl Default for FrameSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSynchronizer {
    pub fn new() -> Self {
        FrameSynchronizer {
            state: SyncState::SeekMarker1,
            frame: BytesMut::with_capacity(TRACER_FRAME_CAPACITY),
            expected_len: 0,
            discarded: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Bytes skipped while hunting for the marker since the last [`reset`](Self::reset).
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Advances the machine by one byte.
    pub fn push(&mut self, byte: u8) -> SyncState {
        self.state = match self.state {
            SyncState::SeekMarker1 => {
                if byte == TRACER_SYNC_MARKER[0] {
                    SyncState::SeekMarker2
                } else {
                    self.discarded += 1;
                    SyncState::SeekMarker1
                }
            }
            SyncState::SeekMarker2 => {
                if byte == TRACER_SYNC_MARKER[1] {
                    SyncState::Synced
                } else if byte == TRACER_SYNC_MARKER[0] {
                    // The failed byte may itself open a marker.
                    self.discarded += 1;
                    SyncState::SeekMarker2
                } else {
                    self.discarded += 2;
                    SyncState::SeekMarker1
                }
            }
            SyncState::Synced => {
                if self.frame.is_empty() && byte == TRACER_SYNC_MARKER[0] {
                    SyncState::SeekMarker2
                } else {
                    self.frame.put_u8(byte);
                    if self.frame.len() == TRACER_HEADER_LEN {
                        let declared = self.frame[2] as usize;
                        self.expected_len =
                            (declared + TRACER_FRAME_OVERHEAD).min(TRACER_FRAME_CAPACITY);
                        SyncState::Accumulate
                    } else {
                        SyncState::Synced
                    }
                }
            }
            SyncState::Accumulate => {
                self.frame.put_u8(byte);
                if self.frame.len() >= self.expected_len {
                    SyncState::Complete
                } else {
                    SyncState::Accumulate
                }
            }
            terminal @ (SyncState::Complete | SyncState::Timeout) => terminal,
        };
        self.state
    }

    /// Feeds a chunk. Returns the candidate once complete; bytes after the
    /// frame end are not consumed.
    ///
    /// How the stream is split into chunks never changes the outcome.
    pub fn feed(&mut self, data: &[u8]) -> Option<Bytes> {
        for &byte in data {
            if self.push(byte) == SyncState::Complete {
                return self.take_frame();
            }
        }
        None
    }

    /// Takes the completed candidate (address..terminator) and rearms the machine.
    pub fn take_frame(&mut self) -> Option<Bytes> {
        if self.state != SyncState::Complete {
            return None;
        }
        let frame = self.frame.split().freeze();
        self.expected_len = 0;
        self.state = SyncState::SeekMarker1;
        Some(frame)
    }

    /// Marks the attempt as timed out and abandons the partial buffer.
    pub fn expire(&mut self) {
        self.frame.clear();
        self.state = SyncState::Timeout;
    }

    pub fn reset(&mut self) {
        self.frame.clear();
        self.expected_len = 0;
        self.discarded = 0;
        self.state = SyncState::SeekMarker1;
    }
}

/// Runs the synchronizer over a complete pre-recorded buffer.
pub fn scan(record: &[u8]) -> Result<Bytes, TracerError> {
    let mut sync = FrameSynchronizer::new();
    match sync.feed(record) {
        Some(frame) => Ok(frame),
        None => Err(TracerError::FramingError(format!(
            "record of {} bytes ends in state {:?}",
            record.len(),
            sync.state()
        ))),
    }
}

/// Reads from `reader` until one candidate frame is complete.
///
/// Each read waits at most `read_timeout`, and the whole attempt at most
/// `attempt_timeout`. Either limit ends the attempt with
/// [`TracerError::Timeout`], so a line that never goes quiet but never carries
/// a marker still terminates. End of stream before completion is a framing
/// error.
pub async fn read_frame<R>(
    reader: &mut R,
    read_timeout: Duration,
    attempt_timeout: Duration,
) -> Result<Bytes, TracerError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let deadline = Instant::now() + attempt_timeout;
    let mut sync = FrameSynchronizer::new();
    let mut chunk = [0u8; TRACER_FRAME_CAPACITY];

    loop {
        let read_deadline = (Instant::now() + read_timeout).min(deadline);
        let n = match tokio::time::timeout_at(read_deadline, reader.read(&mut chunk)).await {
            Err(_) => {
                debug!("read timed out in state {:?}", sync.state());
                sync.expire();
                return Err(TracerError::Timeout);
            }
            Ok(Err(e)) => return Err(TracerError::SerialPortError(e.to_string())),
            Ok(Ok(n)) => n,
        };

        if n == 0 {
            return Err(TracerError::FramingError(format!(
                "stream ended in state {:?}",
                sync.state()
            )));
        }

        if let Some(frame) = sync.feed(&chunk[..n]) {
            if sync.discarded() > 0 {
                debug!("skipped {} noise bytes before frame", sync.discarded());
            }
            return Ok(frame);
        }

        if Instant::now() >= deadline {
            debug!(
                "attempt deadline passed after {} noise bytes in state {:?}",
                sync.discarded(),
                sync.state()
            );
            sync.expire();
            return Err(TracerError::Timeout);
        }
    }
}
