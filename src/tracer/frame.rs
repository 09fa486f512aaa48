//! # Tracer Request Encoder
//!
//! Builds outgoing request telegrams. A request on the wire is:
//!
//! ```text
//! AA 55 AA 55 AA 55 | EB 90 EB 90 EB 90 | addr func len | payload | crc_hi crc_lo | 7F
//!   wake-up preamble       sync marker        header
//! ```
//!
//! The check value covers header and payload and is written high byte first,
//! so the frame from the address byte to the low checksum byte reduces to zero.
//!
//! ```rust
//! use tracer_rs::tracer::frame::{pack_request, Request};
//!
//! let bytes = pack_request(Request::Status);
//! assert_eq!(bytes.len(), 19);
//! assert_eq!(&bytes[12..], &[0x01, 0xA0, 0x01, 0x03, 0xBD, 0xBB, 0x7F]);
//! ```

use crate::constants::{
    TRACER_ADDRESS_REQUEST, TRACER_FRAME_OVERHEAD, TRACER_FUNCTION_LOAD_SWITCH,
    TRACER_FUNCTION_STATUS, TRACER_PREAMBLE, TRACER_REQUEST_PAYLOAD_LEN,
    TRACER_STATUS_QUERY_CODE, TRACER_SYNC_MARKER, TRACER_SYNC_REPEAT, TRACER_TERMINATOR,
};
use crate::error::TracerError;
use crate::tracer::crc;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The requests the controller understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Request {
    /// Real-time status query
    Status,
    /// Switch the load output on
    PowerOn,
    /// Switch the load output off
    PowerOff,
}

impl Request {
    pub fn function(self) -> u8 {
        match self {
            Request::Status => TRACER_FUNCTION_STATUS,
            Request::PowerOn | Request::PowerOff => TRACER_FUNCTION_LOAD_SWITCH,
        }
    }

    pub fn payload(self) -> u8 {
        match self {
            Request::Status => TRACER_STATUS_QUERY_CODE,
            Request::PowerOn => 1,
            Request::PowerOff => 0,
        }
    }

    /// Load-switch requests change device state and must not be served from cache.
    pub fn is_switch(self) -> bool {
        matches!(self, Request::PowerOn | Request::PowerOff)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Status => write!(f, "status"),
            Request::PowerOn => write!(f, "load-on"),
            Request::PowerOff => write!(f, "load-off"),
        }
    }
}

impl FromStr for Request {
    type Err = TracerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "status" => Ok(Request::Status),
            "on" | "poweron" | "load-on" => Ok(Request::PowerOn),
            "off" | "poweroff" | "load-off" => Ok(Request::PowerOff),
            other => Err(TracerError::Config(format!("unknown request kind '{other}'"))),
        }
    }
}

/// Packs a request into its complete wire representation.
pub fn pack_request(request: Request) -> Vec<u8> {
    let frame_len = TRACER_REQUEST_PAYLOAD_LEN as usize + TRACER_FRAME_OVERHEAD;
    let mut buf = BytesMut::with_capacity(
        TRACER_PREAMBLE.len() + TRACER_SYNC_MARKER.len() * TRACER_SYNC_REPEAT + frame_len,
    );

    buf.put_slice(&TRACER_PREAMBLE);
    for _ in 0..TRACER_SYNC_REPEAT {
        buf.put_slice(&TRACER_SYNC_MARKER);
    }

    let body = [
        TRACER_ADDRESS_REQUEST,
        request.function(),
        TRACER_REQUEST_PAYLOAD_LEN,
        request.payload(),
    ];
    buf.put_slice(&body);
    buf.put_slice(&crc::seal(&body));
    buf.put_u8(TRACER_TERMINATOR);

    buf.to_vec()
}
