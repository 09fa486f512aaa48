//! End-to-end request cycles through `TracerDeviceManager` with a mock serial
//! port and a temporary cache directory.

use std::time::Duration;
use tempfile::TempDir;
use tracer_rs::error::TracerError;
use tracer_rs::tracer::serial_mock::{MockConnector, MockSerialPort, ScriptedReply};
use tracer_rs::util::hex::hex_to_bytes;
use tracer_rs::{
    device_id, FrameCache, QueryOptions, Reply, ReplySource, Request, TracerDeviceManager,
};

const DEVICE: &str = "/dev/ttyUSB0";
const STATUS_REPLY_HEX: &str =
    "eb90 00a018dc04500d00000000590498050000002900000001 3a760100 d969 7f";
const SWITCH_ON_ACK_HEX: &str = "eb90 00aa01 01 4d9a 7f";
const REQUEST_LEN: usize = 19;

fn status_reply() -> ScriptedReply {
    ScriptedReply::Bytes(hex_to_bytes(STATUS_REPLY_HEX))
}

fn corrupted_status_reply() -> ScriptedReply {
    let mut bytes = hex_to_bytes(STATUS_REPLY_HEX);
    bytes[6] ^= 0x80;
    ScriptedReply::Bytes(bytes)
}

struct Harness {
    port: MockSerialPort,
    connector: MockConnector,
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let port = MockSerialPort::new();
        let connector = MockConnector::new(port.clone(), Duration::from_millis(10));
        Harness {
            port,
            connector,
            dir: TempDir::new().unwrap(),
        }
    }

    fn manager(&self, ttl: Duration, options: QueryOptions) -> TracerDeviceManager<MockConnector> {
        TracerDeviceManager::new(
            self.connector.clone(),
            FrameCache::new(self.dir.path(), ttl),
            options,
        )
    }

    fn default_manager(&self) -> TracerDeviceManager<MockConnector> {
        self.manager(Duration::from_secs(10), options(3))
    }

    fn cache_file_exists(&self) -> bool {
        FrameCache::new(self.dir.path(), Duration::ZERO)
            .path_for(&device_id(DEVICE))
            .exists()
    }
}

fn options(retries: u32) -> QueryOptions {
    QueryOptions {
        retries,
        backoff: Duration::from_millis(1),
        force: false,
    }
}

/// A fresh cached frame answers a second status query without touching the device.
#[tokio::test]
async fn test_second_status_served_from_cache() {
    let h = Harness::new();
    h.port.script_reply(status_reply());
    let manager = h.default_manager();

    let first = manager.execute(DEVICE, Request::Status).await.unwrap();
    assert_eq!(first.source, ReplySource::Live);
    assert_eq!(first.attempts, 1);
    assert!(first.cache_warning.is_none());
    assert!(h.cache_file_exists());

    let second = manager.execute(DEVICE, Request::Status).await.unwrap();
    assert_eq!(second.source, ReplySource::Cache);
    assert_eq!(second.attempts, 0);
    assert_eq!(second.reply, first.reply);

    assert_eq!(h.port.get_tx_data().len(), REQUEST_LEN);
    assert_eq!(h.connector.open_count(), 1);
}

/// A cache entry older than the freshness window is ignored.
#[tokio::test]
async fn test_stale_cache_queries_device() {
    let h = Harness::new();
    h.port.script_reply(status_reply());
    h.port.script_reply(status_reply());
    let manager = h.manager(Duration::ZERO, options(3));

    manager.execute(DEVICE, Request::Status).await.unwrap();
    let second = manager.execute(DEVICE, Request::Status).await.unwrap();

    assert_eq!(second.source, ReplySource::Live);
    assert_eq!(h.port.get_tx_data().len(), 2 * REQUEST_LEN);
}

/// Switching the load drops the cached status.
#[tokio::test]
async fn test_load_switch_invalidates_cache() {
    let h = Harness::new();
    h.port.script_reply(status_reply());
    h.port.script_reply(ScriptedReply::Bytes(hex_to_bytes(SWITCH_ON_ACK_HEX)));
    h.port.script_reply(status_reply());
    let manager = h.default_manager();

    manager.execute(DEVICE, Request::Status).await.unwrap();
    assert!(h.cache_file_exists());

    let ack = manager.execute(DEVICE, Request::PowerOn).await.unwrap();
    assert_eq!(ack.reply, Reply::SwitchAck { load_on: true });
    assert!(!h.cache_file_exists());

    let status = manager.execute(DEVICE, Request::Status).await.unwrap();
    assert_eq!(status.source, ReplySource::Live);
    assert_eq!(h.port.get_tx_data().len(), 3 * REQUEST_LEN);
}

/// A corrupted reply is retried and the next good one accepted.
#[tokio::test]
async fn test_retry_after_corrupted_reply() {
    let h = Harness::new();
    h.port.script_reply(corrupted_status_reply());
    h.port.script_reply(status_reply());

    let outcome = h
        .default_manager()
        .execute(DEVICE, Request::Status)
        .await
        .unwrap();

    assert_eq!(outcome.attempts, 2);
    assert!(matches!(outcome.reply, Reply::Status(s) if s.battery_voltage == 1244));
}

/// A silent device exhausts the attempt budget.
#[tokio::test]
async fn test_retries_exhausted_on_silence() {
    let h = Harness::new();

    let result = h.default_manager().execute(DEVICE, Request::Status).await;

    match result {
        Err(TracerError::RetriesExhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, TracerError::Timeout));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(h.port.get_tx_data().len(), 3 * REQUEST_LEN);
    assert_eq!(h.port.discard_count(), 3);
    assert!(!h.cache_file_exists());
}

/// A channel that cannot be opened fails at once.
#[tokio::test]
async fn test_open_failure_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let connector = MockConnector::unavailable();
    let manager = TracerDeviceManager::new(
        connector.clone(),
        FrameCache::new(dir.path(), Duration::from_secs(10)),
        options(5),
    );

    let result = manager.execute(DEVICE, Request::PowerOff).await;

    assert!(matches!(result, Err(TracerError::ChannelOpen { .. })));
    assert_eq!(connector.open_count(), 1);
}

/// Forcing skips a fresh cache entry.
#[tokio::test]
async fn test_force_bypasses_cache() {
    let h = Harness::new();
    h.port.script_reply(status_reply());
    h.port.script_reply(status_reply());

    h.default_manager()
        .execute(DEVICE, Request::Status)
        .await
        .unwrap();

    let forced = QueryOptions {
        force: true,
        ..options(3)
    };
    let outcome = h
        .manager(Duration::from_secs(10), forced)
        .execute(DEVICE, Request::Status)
        .await
        .unwrap();

    assert_eq!(outcome.source, ReplySource::Live);
    assert_eq!(h.port.get_tx_data().len(), 2 * REQUEST_LEN);
}

/// A cache entry that no longer validates is dropped and the device queried.
#[tokio::test]
async fn test_corrupted_cache_entry_is_replaced() {
    let h = Harness::new();
    h.port.script_reply(status_reply());
    let manager = h.default_manager();

    let path = manager.cache().path_for(&device_id(DEVICE));
    std::fs::write(&path, [0xEB, 0x90, 0x00, 0xAA, 0x01, 0x01, 0x00, 0x00, 0x7F]).unwrap();

    let outcome = manager.execute(DEVICE, Request::Status).await.unwrap();

    assert_eq!(outcome.source, ReplySource::Live);
    let record = std::fs::read(&path).unwrap();
    assert_eq!(record, hex_to_bytes(STATUS_REPLY_HEX));
}

/// A cache that cannot be written only produces a warning.
#[tokio::test]
async fn test_cache_write_failure_is_a_warning() {
    let h = Harness::new();
    h.port.script_reply(status_reply());
    let manager = TracerDeviceManager::new(
        h.connector.clone(),
        FrameCache::new(h.dir.path().join("missing"), Duration::from_secs(10)),
        options(3),
    );

    let outcome = manager.execute(DEVICE, Request::Status).await.unwrap();

    assert!(matches!(outcome.reply, Reply::Status(_)));
    assert!(matches!(outcome.cache_warning, Some(TracerError::CacheIo(_))));
}
