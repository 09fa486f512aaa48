//! Mock serial port implementation for testing
//!
//! This module provides a mock serial port that can be used to test the
//! Tracer request/reply cycle without a controller attached. Replies can be
//! queued directly or scripted per written request, which is how retry
//! scenarios (silence, corruption, then a good reply) are expressed.

use crate::error::TracerError;
use crate::tracer::serial::{Connector, SerialPort, TracerDeviceHandle};
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// What the mock device does in response to one request.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Answer with these bytes
    Bytes(Vec<u8>),
    /// Stay quiet
    Silence,
}

/// Mock serial port that simulates bidirectional communication
#[derive(Clone, Default)]
pub struct MockSerialPort {
    /// Data written to the port (outgoing)
    pub tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Data to be read from the port (incoming)
    pub rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    /// Replies released into `rx_buffer`, one per write
    pub script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    /// Simulated errors
    pub next_error: Arc<Mutex<Option<io::Error>>>,
    /// Number of `discard_buffers` calls
    pub discards: Arc<AtomicUsize>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue data to be read from the port
    pub fn queue_rx_data(&self, data: &[u8]) {
        let mut rx = self.rx_buffer.lock().unwrap();
        rx.extend(data);
    }

    /// Script the device's answer to the next request
    pub fn script_reply(&self, reply: ScriptedReply) {
        self.script.lock().unwrap().push_back(reply);
    }

    /// Get data that was written to the port
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.tx_buffer.lock().unwrap().clone()
    }

    /// Number of times the line was reset
    pub fn discard_count(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }

    /// Set an error to be returned on the next operation
    pub fn set_next_error(&self, error: io::Error) {
        *self.next_error.lock().unwrap() = Some(error);
    }
}

// An empty receive buffer behaves like a quiet line: the read stays pending
// until the caller's timeout fires.
impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut rx = self.rx_buffer.lock().unwrap();
        let available = rx.len().min(buf.remaining());
        if available == 0 {
            return Poll::Pending;
        }

        let data: Vec<u8> = rx.drain(..available).collect();
        buf.put_slice(&data);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        self.tx_buffer.lock().unwrap().extend_from_slice(buf);

        if let Some(ScriptedReply::Bytes(reply)) = self.script.lock().unwrap().pop_front() {
            self.queue_rx_data(&reply);
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait::async_trait]
impl SerialPort for MockSerialPort {
    async fn flush(&mut self) -> Result<(), io::Error> {
        Ok(())
    }

    fn discard_buffers(&mut self) -> Result<(), io::Error> {
        self.rx_buffer.lock().unwrap().clear();
        self.discards.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out clones of one mock port.
#[derive(Clone)]
pub struct MockConnector {
    pub port: MockSerialPort,
    pub read_timeout: Duration,
    pub fail_open: bool,
    pub opens: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new(port: MockSerialPort, read_timeout: Duration) -> Self {
        MockConnector {
            port,
            read_timeout,
            fail_open: false,
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A connector whose device cannot be opened.
    pub fn unavailable() -> Self {
        MockConnector {
            fail_open: true,
            ..Self::new(MockSerialPort::new(), Duration::from_millis(10))
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    type Port = MockSerialPort;

    async fn open(&self, device: &str) -> Result<TracerDeviceHandle<Self::Port>, TracerError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(TracerError::ChannelOpen {
                device: device.to_string(),
                reason: "No such file or directory".into(),
            });
        }
        Ok(TracerDeviceHandle::new(self.port.clone(), self.read_timeout))
    }
}
