//! # Tracer Serial Communication
//!
//! Channel plumbing for one request/reply cycle: a [`SerialPort`] trait over
//! anything that reads and writes bytes asynchronously, the
//! [`TracerDeviceHandle`] that owns a port for the cycle, and the
//! [`Connector`] used by the retry controller to open a channel by name.

use crate::constants::{
    TRACER_DEFAULT_ATTEMPT_TIMEOUT, TRACER_DEFAULT_BAUDRATE, TRACER_DEFAULT_READ_TIMEOUT,
};
use crate::error::TracerError;
use crate::logging::log_frame_hex;
use crate::tracer::frame::{pack_request, Request};
use crate::tracer::reply::{decode_reply, Reply};
use crate::tracer::sync::read_frame;
use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;

/// Byte-stream channel to a controller.
#[async_trait::async_trait]
pub trait SerialPort: AsyncRead + AsyncWrite + Unpin + Send {
    async fn flush(&mut self) -> Result<(), std::io::Error>;

    /// Drops anything pending in either direction.
    fn discard_buffers(&mut self) -> Result<(), std::io::Error>;
}

#[async_trait::async_trait]
impl SerialPort for tokio_serial::SerialStream {
    async fn flush(&mut self) -> Result<(), std::io::Error> {
        AsyncWriteExt::flush(self).await
    }

    fn discard_buffers(&mut self) -> Result<(), std::io::Error> {
        tokio_serial::SerialPort::clear(self, tokio_serial::ClearBuffer::All)
            .map_err(std::io::Error::from)
    }
}

/// Configuration for serial connection.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baudrate: u32,
    /// Longest wait for any single read
    pub read_timeout: Duration,
    /// Longest wait for a complete reply
    pub attempt_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: TRACER_DEFAULT_BAUDRATE,
            read_timeout: TRACER_DEFAULT_READ_TIMEOUT,
            attempt_timeout: TRACER_DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

/// Handle owning one channel for the duration of a request/reply cycle.
pub struct TracerDeviceHandle<P: SerialPort = tokio_serial::SerialStream> {
    port: P,
    read_timeout: Duration,
    attempt_timeout: Duration,
}

impl TracerDeviceHandle<tokio_serial::SerialStream> {
    /// Opens the serial port at 8N1 with the configured baud rate.
    pub fn connect(port_name: &str, config: &SerialConfig) -> Result<Self, TracerError> {
        let port = tokio_serial::new(port_name, config.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TracerError::ChannelOpen {
                device: port_name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(TracerDeviceHandle::new(port, config.read_timeout)
            .with_attempt_timeout(config.attempt_timeout))
    }
}

impl<P: SerialPort> TracerDeviceHandle<P> {
    pub fn new(port: P, read_timeout: Duration) -> Self {
        TracerDeviceHandle {
            port,
            read_timeout,
            attempt_timeout: TRACER_DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Encodes and transmits a request.
    pub async fn send_request(&mut self, request: Request) -> Result<(), TracerError> {
        let data = pack_request(request);
        log_frame_hex("tx", &data);
        self.port.write_all(&data).await?;
        SerialPort::flush(&mut self.port).await?;
        Ok(())
    }

    /// Receives one candidate frame (address..terminator).
    pub async fn recv_frame(&mut self) -> Result<Bytes, TracerError> {
        let frame = read_frame(&mut self.port, self.read_timeout, self.attempt_timeout).await?;
        log_frame_hex("rx", &frame);
        Ok(frame)
    }

    /// Receives and decodes one reply. The raw candidate is returned alongside
    /// so a caller can cache it.
    pub async fn recv_reply(&mut self) -> Result<(Reply, Bytes), TracerError> {
        let frame = self.recv_frame().await?;
        let reply = decode_reply(&frame)?;
        Ok((reply, frame))
    }

    /// Sends a request and waits for its reply.
    pub async fn request_response(
        &mut self,
        request: Request,
    ) -> Result<(Reply, Bytes), TracerError> {
        self.send_request(request).await?;
        self.recv_reply().await
    }

    /// Clears the line between attempts.
    pub fn reset(&mut self) -> Result<(), TracerError> {
        self.port.discard_buffers()?;
        Ok(())
    }
}

/// Opens channels by device name.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    type Port: SerialPort;

    async fn open(&self, device: &str) -> Result<TracerDeviceHandle<Self::Port>, TracerError>;
}

/// Connector for real serial ports.
#[derive(Debug, Clone, Default)]
pub struct SerialConnector {
    pub config: SerialConfig,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        SerialConnector { config }
    }
}

#[async_trait::async_trait]
impl Connector for SerialConnector {
    type Port = tokio_serial::SerialStream;

    async fn open(&self, device: &str) -> Result<TracerDeviceHandle<Self::Port>, TracerError> {
        TracerDeviceHandle::connect(device, &self.config)
    }
}
