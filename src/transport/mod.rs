// MIT License - Copyright (c) 2026 ad2-bridge authors

pub mod serial;
pub mod tcp;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

pub use serial::SerialTransport;
pub use tcp::TcpTransport;

/// The read and write halves of an open connection, boxed so the
/// connection manager is independent of the concrete transport.
pub struct LineStreams {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
}

/// Capability interface over the byte-stream transports (TCP socket,
/// serial port). The connection manager depends only on this trait;
/// opening classifies its own failures (configuration vs communication
/// vs port-in-use) through the returned error.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Open a fresh connection, returning its line streams.
    async fn open(&self) -> Result<LineStreams>;

    /// Human-readable endpoint description for log messages.
    fn label(&self) -> String;
}
