//! # Tracer Reply Decoder
//!
//! Validates a candidate frame delivered by the synchronizer and decodes it
//! into a typed reply. Checks run in a fixed order and each failure is
//! reported as its own error:
//!
//! 1. address is the reply address (`0x00`)
//! 2. the byte at the declared terminator position is `0x7F`
//! 3. the declared length is the one the function code requires
//! 4. the checksum over address..checksum reduces to zero
//!
//! Fields are decoded one by one at fixed offsets with explicit little-endian
//! reconstruction using `nom`.
//!
//! Status reply payload layout (24 bytes):
//!
//! | offset | field                | type   |
//! |--------|----------------------|--------|
//! | 0      | battery voltage      | u16 LE |
//! | 2      | panel voltage        | u16 LE |
//! | 4      | reserved             | u16 LE |
//! | 6      | load current         | u16 LE |
//! | 8      | battery min voltage  | u16 LE |
//! | 10     | battery max voltage  | u16 LE |
//! | 12     | load on              | u8     |
//! | 13     | overload             | u8     |
//! | 14     | fuse tripped         | u8     |
//! | 15     | reserved             | u8     |
//! | 16     | battery overload     | u8     |
//! | 17     | over-discharge       | u8     |
//! | 18     | battery full         | u8     |
//! | 19     | charging             | u8     |
//! | 20     | temperature + 30     | u8     |
//! | 21     | PV current           | u16 LE |
//! | 23     | reserved             | u8     |

use crate::constants::{
    TRACER_ADDRESS_REPLY, TRACER_FRAME_OVERHEAD, TRACER_FUNCTION_LOAD_SWITCH,
    TRACER_FUNCTION_STATUS, TRACER_HEADER_LEN, TRACER_STATUS_PAYLOAD_LEN,
    TRACER_SWITCH_PAYLOAD_LEN, TRACER_TEMPERATURE_OFFSET, TRACER_TERMINATOR,
};
use crate::error::TracerError;
use crate::tracer::crc;
use nom::number::complete::{le_u16, u8 as byte};
use nom::IResult;
use serde::Serialize;

/// Decoded real-time status. Voltages and currents are raw device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusReply {
    pub battery_voltage: u16,
    pub panel_voltage: u16,
    pub reserved_word: u16,
    pub load_current: u16,
    pub battery_min_voltage: u16,
    pub battery_max_voltage: u16,
    pub load_on: bool,
    pub overload: bool,
    pub fuse_tripped: bool,
    pub reserved1: u8,
    pub battery_overload: bool,
    pub over_discharge: bool,
    pub battery_full: bool,
    pub charging: bool,
    /// Degrees Celsius
    pub temperature: i16,
    pub pv_current: u16,
    pub reserved2: u8,
}

/// A validated reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Status(StatusReply),
    /// Load-switch acknowledgement carrying the resulting load state
    SwitchAck { load_on: bool },
}

/// Payload length each known function code requires.
fn expected_payload_len(function: u8) -> Result<u8, TracerError> {
    match function {
        TRACER_FUNCTION_STATUS => Ok(TRACER_STATUS_PAYLOAD_LEN),
        TRACER_FUNCTION_LOAD_SWITCH => Ok(TRACER_SWITCH_PAYLOAD_LEN),
        other => Err(TracerError::UnknownFunction(other)),
    }
}

/// Runs the structural and checksum checks without decoding the payload.
pub fn validate_frame(frame: &[u8]) -> Result<(), TracerError> {
    if frame.len() < TRACER_HEADER_LEN {
        return Err(TracerError::FramingError(format!(
            "candidate of {} bytes has no header",
            frame.len()
        )));
    }

    let (address, function, length) = (frame[0], frame[1], frame[2]);

    if address != TRACER_ADDRESS_REPLY {
        return Err(TracerError::InvalidAddress(address));
    }

    let end = length as usize + TRACER_FRAME_OVERHEAD;
    match frame.get(end - 1) {
        Some(&TRACER_TERMINATOR) => {}
        Some(&other) => return Err(TracerError::InvalidTerminator(other)),
        None => return Err(TracerError::InvalidLength { function, length }),
    }

    if expected_payload_len(function)? != length {
        return Err(TracerError::InvalidLength { function, length });
    }

    let residue = crc::checksum(&frame[..end - 1]);
    if residue != 0 {
        return Err(TracerError::InvalidChecksum(residue));
    }

    Ok(())
}

/// Validates and decodes a candidate frame (address..terminator).
pub fn decode_reply(frame: &[u8]) -> Result<Reply, TracerError> {
    validate_frame(frame)?;

    let length = frame[2] as usize;
    let payload = &frame[TRACER_HEADER_LEN..TRACER_HEADER_LEN + length];

    match frame[1] {
        TRACER_FUNCTION_STATUS => {
            let (_, status) = parse_status_payload(payload)
                .map_err(|e| TracerError::FramingError(format!("status payload: {e:?}")))?;
            Ok(Reply::Status(status))
        }
        TRACER_FUNCTION_LOAD_SWITCH => Ok(Reply::SwitchAck {
            load_on: payload[0] != 0,
        }),
        other => Err(TracerError::UnknownFunction(other)),
    }
}

fn flag(input: &[u8]) -> IResult<&[u8], bool> {
    let (input, value) = byte(input)?;
    Ok((input, value != 0))
}

/// Parses the 24-byte status payload.
pub fn parse_status_payload(input: &[u8]) -> IResult<&[u8], StatusReply> {
    let (input, battery_voltage) = le_u16(input)?;
    let (input, panel_voltage) = le_u16(input)?;
    let (input, reserved_word) = le_u16(input)?;
    let (input, load_current) = le_u16(input)?;
    let (input, battery_min_voltage) = le_u16(input)?;
    let (input, battery_max_voltage) = le_u16(input)?;
    let (input, load_on) = flag(input)?;
    let (input, overload) = flag(input)?;
    let (input, fuse_tripped) = flag(input)?;
    let (input, reserved1) = byte(input)?;
    let (input, battery_overload) = flag(input)?;
    let (input, over_discharge) = flag(input)?;
    let (input, battery_full) = flag(input)?;
    let (input, charging) = flag(input)?;
    let (input, temperature_raw) = byte(input)?;
    let (input, pv_current) = le_u16(input)?;
    let (input, reserved2) = byte(input)?;

    Ok((
        input,
        StatusReply {
            battery_voltage,
            panel_voltage,
            reserved_word,
            load_current,
            battery_min_voltage,
            battery_max_voltage,
            load_on,
            overload,
            fuse_tripped,
            reserved1,
            battery_overload,
            over_discharge,
            battery_full,
            charging,
            temperature: i16::from(temperature_raw) - TRACER_TEMPERATURE_OFFSET,
            pv_current,
            reserved2,
        },
    ))
}
