//! Unit tests for the `TracerError` enum, its `Display` implementation and its
//! retry classification.

use tracer_rs::error::{ErrorClass, TracerError};

/// Tests that the `SerialPortError` variant is correctly formatted.
#[test]
fn test_serial_port_error() {
    let err = TracerError::SerialPortError("Test error".to_string());
    assert_eq!(err.to_string(), "Serial port error: Test error");
}

/// Tests that the `ChannelOpen` variant names the device.
#[test]
fn test_channel_open_error() {
    let err = TracerError::ChannelOpen {
        device: "/dev/ttyUSB0".into(),
        reason: "Permission denied".into(),
    };
    assert_eq!(
        err.to_string(),
        "Cannot open channel /dev/ttyUSB0: Permission denied"
    );
}

/// Tests that the checksum residue is shown in hex.
#[test]
fn test_invalid_checksum_error() {
    let err = TracerError::InvalidChecksum(0xd969);
    assert_eq!(err.to_string(), "Invalid checksum: residue 0xD969");
}

/// Tests that the `InvalidLength` variant shows both fields.
#[test]
fn test_invalid_length_error() {
    let err = TracerError::InvalidLength {
        function: 0xA0,
        length: 3,
    };
    assert_eq!(err.to_string(), "Invalid length 3 for function 0xA0");
}

/// Tests that `UnknownFunction` is correctly formatted.
#[test]
fn test_unknown_function_error() {
    let err = TracerError::UnknownFunction(0x0b);
    assert_eq!(err.to_string(), "Unknown function: 0x0B");
}

/// Tests that the exhausted error carries the last cause.
#[test]
fn test_retries_exhausted_error() {
    let err = TracerError::RetriesExhausted {
        attempts: 7,
        last: Box::new(TracerError::Timeout),
    };
    assert_eq!(
        err.to_string(),
        "Giving up after 7 attempts: Timed out waiting for reply"
    );
    assert!(err.is_transient());
}

/// Tests the retry classification of each variant family.
#[test]
fn test_error_classes() {
    assert_eq!(TracerError::Timeout.class(), ErrorClass::Transient);
    assert_eq!(
        TracerError::FramingError("noise".into()).class(),
        ErrorClass::Transient
    );
    assert_eq!(TracerError::InvalidChecksum(1).class(), ErrorClass::Transient);
    assert_eq!(TracerError::InvalidAddress(1).class(), ErrorClass::Structural);
    assert_eq!(TracerError::InvalidTerminator(0).class(), ErrorClass::Structural);
    assert!(TracerError::UnexpectedReply("ack".into()).is_structural());
    assert_eq!(
        TracerError::CacheIo("read-only".into()).class(),
        ErrorClass::Resource
    );
    assert_eq!(
        TracerError::Config("retries".into()).class(),
        ErrorClass::Resource
    );
}

/// Tests conversion from `std::io::Error`.
#[test]
fn test_from_io_error() {
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged");
    let err: TracerError = io.into();
    assert!(matches!(err, TracerError::SerialPortError(ref s) if s == "unplugged"));
    assert_eq!(err.class(), ErrorClass::Resource);
}
