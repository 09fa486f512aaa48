//! # Tracer Error Handling
//!
//! This module defines the TracerError enum, which represents the different error
//! types that can occur in the tracer-rs crate, and the ErrorClass used by the
//! retry controller to decide whether a failed cycle is worth repeating.

use thiserror::Error;

/// Represents the different error types that can occur in the Tracer crate.
#[derive(Debug, Error)]
pub enum TracerError {
    /// The channel could not be opened at all.
    #[error("Cannot open channel {device}: {reason}")]
    ChannelOpen { device: String, reason: String },

    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// No readiness event within the per-read timeout.
    #[error("Timed out waiting for reply")]
    Timeout,

    /// No well-framed candidate could be recovered from the stream.
    #[error("Framing error: {0}")]
    FramingError(String),

    /// The checksum over address..checksum did not reduce to zero.
    #[error("Invalid checksum: residue 0x{0:04X}")]
    InvalidChecksum(u16),

    /// The reply was not sent from the reply address.
    #[error("Invalid reply address: 0x{0:02X}")]
    InvalidAddress(u8),

    /// The byte at the terminator position is not 0x7F.
    #[error("Invalid terminator: 0x{0:02X}")]
    InvalidTerminator(u8),

    /// The declared payload length is not valid for the function code.
    #[error("Invalid length {length} for function 0x{function:02X}")]
    InvalidLength { function: u8, length: u8 },

    /// The reply carries a function code this crate does not decode.
    #[error("Unknown function: 0x{0:02X}")]
    UnknownFunction(u8),

    /// A well-formed reply of the wrong kind for the request.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    /// The frame cache could not be read or written.
    #[error("Cache I/O error: {0}")]
    CacheIo(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every live attempt failed.
    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<TracerError> },
}

/// How a failure is treated by the retry controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Communication-layer failure; retrying may help.
    Transient,
    /// A malformed message; the same bytes will never validate.
    Structural,
    /// Channel or filesystem failure.
    Resource,
}

impl TracerError {
    /// Classifies the error for retry decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            TracerError::Timeout
            | TracerError::FramingError(_)
            | TracerError::InvalidChecksum(_) => ErrorClass::Transient,
            TracerError::InvalidAddress(_)
            | TracerError::InvalidTerminator(_)
            | TracerError::InvalidLength { .. }
            | TracerError::UnknownFunction(_)
            | TracerError::UnexpectedReply(_) => ErrorClass::Structural,
            TracerError::ChannelOpen { .. }
            | TracerError::SerialPortError(_)
            | TracerError::CacheIo(_)
            | TracerError::Config(_) => ErrorClass::Resource,
            TracerError::RetriesExhausted { last, .. } => last.class(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    pub fn is_structural(&self) -> bool {
        self.class() == ErrorClass::Structural
    }
}

impl From<std::io::Error> for TracerError {
    fn from(e: std::io::Error) -> Self {
        TracerError::SerialPortError(e.to_string())
    }
}
