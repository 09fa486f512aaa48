//! The tracer module contains the protocol engine for the charge controller's
//! serial telegrams: checksum, request encoding, stream synchronization, reply
//! validation and decoding, and the serial channel itself.

pub mod crc;
pub mod frame;
pub mod reply;
pub mod scaling;
pub mod serial;
pub mod serial_mock;
pub mod sync;

pub use frame::{pack_request, Request};
pub use reply::{decode_reply, validate_frame, Reply, StatusReply};
pub use scaling::{Measurements, Scaling, ScalingPreset};
pub use serial::{Connector, SerialConfig, SerialConnector, SerialPort, TracerDeviceHandle};
pub use sync::{read_frame, scan, FrameSynchronizer, SyncState};
