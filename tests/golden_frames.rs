//! Decoding of captured controller traffic, byte for byte.

use tracer_rs::error::TracerError;
use tracer_rs::tracer::sync::{scan, FrameSynchronizer, SyncState};
use tracer_rs::util::hex::hex_to_bytes;
use tracer_rs::{decode_reply, pack_request, Reply, Request};

/// Status reply captured from a controller, including its marker and terminator.
const STATUS_REPLY_HEX: &str =
    "eb90 00a018 dc04500d00000000590498050000002900000001 3a760100 d969 7f";

/// Load-switch acknowledgement with the load on.
const SWITCH_ACK_HEX: &str = "eb90 00aa01 01 4d9a 7f";

fn status_reply() -> tracer_rs::StatusReply {
    let frame = scan(&hex_to_bytes(STATUS_REPLY_HEX)).unwrap();
    match decode_reply(&frame).unwrap() {
        Reply::Status(status) => status,
        other => panic!("expected a status reply, got {other:?}"),
    }
}

/// Tests every field of the captured status reply.
#[test]
fn test_captured_status_reply() {
    let status = status_reply();

    assert_eq!(status.battery_voltage, 1244);
    assert_eq!(status.panel_voltage, 3408);
    assert_eq!(status.reserved_word, 0);
    assert_eq!(status.load_current, 0);
    assert_eq!(status.battery_min_voltage, 1113);
    assert_eq!(status.battery_max_voltage, 1432);
    assert!(!status.load_on);
    assert!(!status.overload);
    assert!(!status.fuse_tripped);
    assert_eq!(status.reserved1, 0x29);
    assert!(!status.battery_overload);
    assert!(!status.over_discharge);
    assert!(!status.battery_full);
    assert!(status.charging);
    assert_eq!(status.temperature, 28);
    assert_eq!(status.pv_current, 374);
    assert_eq!(status.reserved2, 0);
}

/// Tests the captured reply converted to volts and amps.
#[test]
fn test_captured_status_measurements() {
    let m = status_reply().measurements(&tracer_rs::Scaling::CENTI);

    assert!((m.battery_voltage - 12.44).abs() < 1e-9);
    assert!((m.panel_voltage - 34.08).abs() < 1e-9);
    assert!((m.pv_current - 3.74).abs() < 1e-9);
    assert!((m.panel_power - 34.08 * 3.74).abs() < 1e-9);
    let level = m.battery_level_percent.unwrap();
    assert!((level - 41.0658).abs() < 1e-3);
    assert!((m.battery_flow_power - 46.5256).abs() < 1e-6);
}

/// Tests the load-switch acknowledgement.
#[test]
fn test_switch_ack() {
    let frame = scan(&hex_to_bytes(SWITCH_ACK_HEX)).unwrap();
    assert_eq!(decode_reply(&frame).unwrap(), Reply::SwitchAck { load_on: true });
}

/// Tests the exact bytes of every request telegram.
#[test]
fn test_request_telegrams() {
    let header = hex_to_bytes("aa55aa55aa55 eb90eb90eb90");

    for (request, tail) in [
        (Request::Status, "01a00103bdbb7f"),
        (Request::PowerOn, "01aa01011d9b7f"),
        (Request::PowerOff, "01aa01000dda7f"),
    ] {
        let packed = pack_request(request);
        assert_eq!(packed.len(), 19);
        assert_eq!(&packed[..12], header.as_slice());
        assert_eq!(&packed[12..], hex_to_bytes(tail).as_slice(), "{request}");
    }
}

/// Tests recovery when noise and a truncated marker precede the real one.
#[test]
fn test_noise_and_partial_marker_before_reply() {
    let mut stream = hex_to_bytes("00 ff 13 eb 42 eb eb eb");
    stream.extend(hex_to_bytes(STATUS_REPLY_HEX));

    let frame = scan(&stream).unwrap();
    assert_eq!(frame.len(), 30);
    assert!(matches!(decode_reply(&frame).unwrap(), Reply::Status(_)));
}

/// Tests that a repeated marker is absorbed rather than read as the address.
#[test]
fn test_repeated_marker() {
    let mut stream = hex_to_bytes("eb90 eb90");
    stream.extend(hex_to_bytes(SWITCH_ACK_HEX));

    let frame = scan(&stream).unwrap();
    assert_eq!(frame[0], 0x00);
    assert!(decode_reply(&frame).is_ok());
}

/// Tests a reply split across many small reads.
#[test]
fn test_chunked_delivery() {
    let bytes = hex_to_bytes(STATUS_REPLY_HEX);
    let mut sync = FrameSynchronizer::new();

    let mut frame = None;
    for chunk in bytes.chunks(3) {
        if let Some(done) = sync.feed(chunk) {
            frame = Some(done);
            break;
        }
    }

    assert_eq!(sync.state(), SyncState::SeekMarker1);
    assert!(decode_reply(&frame.unwrap()).is_ok());
}

/// Tests that an oversized declared length is capped by the synchronizer and
/// then rejected by the validator.
#[test]
fn test_oversized_length() {
    let mut stream = hex_to_bytes("eb90 00a0 3c");
    stream.extend(std::iter::repeat(0x11).take(80));

    let frame = scan(&stream).unwrap();
    assert_eq!(frame.len(), 64);
    assert!(matches!(
        decode_reply(&frame),
        Err(TracerError::InvalidLength { function: 0xA0, length: 0x3C })
    ));
}

/// Tests that a single flipped payload bit fails the checksum.
#[test]
fn test_corrupted_payload() {
    let mut bytes = hex_to_bytes(STATUS_REPLY_HEX);
    bytes[10] ^= 0x04;

    let frame = scan(&bytes).unwrap();
    assert!(matches!(decode_reply(&frame), Err(TracerError::InvalidChecksum(r)) if r != 0));
}

/// Tests structural rejection of address, terminator and function code.
#[test]
fn test_structural_rejections() {
    let mut wrong_address = hex_to_bytes(SWITCH_ACK_HEX);
    wrong_address[2] = 0x01;
    let frame = scan(&wrong_address).unwrap();
    assert!(matches!(decode_reply(&frame), Err(TracerError::InvalidAddress(0x01))));

    let mut wrong_terminator = hex_to_bytes(SWITCH_ACK_HEX);
    wrong_terminator[8] = 0x7E;
    let frame = scan(&wrong_terminator).unwrap();
    assert!(matches!(decode_reply(&frame), Err(TracerError::InvalidTerminator(0x7E))));

    let mut unknown_function = hex_to_bytes(SWITCH_ACK_HEX);
    unknown_function[3] = 0xB0;
    let frame = scan(&unknown_function).unwrap();
    assert!(matches!(decode_reply(&frame), Err(TracerError::UnknownFunction(0xB0))));
}
