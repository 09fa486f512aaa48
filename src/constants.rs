//! Tracer Protocol Constants
//!
//! Wire constants for the Tracer/MT-5 telegram protocol as observed on the
//! controller's RS-485/TTL link.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Framing
// ----------------------------------------------------------------------------

/// Wake-up preamble sent ahead of every request
pub const TRACER_PREAMBLE: [u8; 6] = [0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x55];

/// Two-byte sync marker preceding the frame header
pub const TRACER_SYNC_MARKER: [u8; 2] = [0xEB, 0x90];

/// Number of times the sync marker is repeated in a request
pub const TRACER_SYNC_REPEAT: usize = 3;

/// Frame terminator
pub const TRACER_TERMINATOR: u8 = 0x7F;

/// Address, function and length bytes
pub const TRACER_HEADER_LEN: usize = 3;

/// Header + checksum + terminator; a frame is `payload_len + TRACER_FRAME_OVERHEAD` bytes
pub const TRACER_FRAME_OVERHEAD: usize = 6;

/// Largest candidate frame (address..terminator) the synchronizer accumulates
pub const TRACER_FRAME_CAPACITY: usize = 64;

// ----------------------------------------------------------------------------
// Addresses and function codes
// ----------------------------------------------------------------------------

/// Address used by the host for requests
pub const TRACER_ADDRESS_REQUEST: u8 = 0x01;

/// Address the controller uses for replies
pub const TRACER_ADDRESS_REPLY: u8 = 0x00;

/// Real-time status query / reply
pub const TRACER_FUNCTION_STATUS: u8 = 0xA0;

/// Load power switch request / acknowledgement
pub const TRACER_FUNCTION_LOAD_SWITCH: u8 = 0xAA;

/// Payload byte of a status query
pub const TRACER_STATUS_QUERY_CODE: u8 = 0x03;

// Payload lengths
pub const TRACER_REQUEST_PAYLOAD_LEN: u8 = 1;
pub const TRACER_STATUS_PAYLOAD_LEN: u8 = 24;
pub const TRACER_SWITCH_PAYLOAD_LEN: u8 = 1;

/// Raw temperature byte is offset by this many degrees
pub const TRACER_TEMPERATURE_OFFSET: i16 = 30;

/// Returned by the checksum engine for inputs shorter than two bytes
pub const TRACER_CHECKSUM_INVALID_INPUT: u16 = 0xDEAD;

// ----------------------------------------------------------------------------
// Link and retry defaults
// ----------------------------------------------------------------------------

pub const TRACER_DEFAULT_BAUDRATE: u32 = 9600;
pub const TRACER_DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);
/// Upper bound on one receive attempt, however busy the line is
pub const TRACER_DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(3);
pub const TRACER_DEFAULT_RETRIES: u32 = 7;
pub const TRACER_DEFAULT_BACKOFF: Duration = Duration::from_millis(200);
pub const TRACER_DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);
