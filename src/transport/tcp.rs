// MIT License - Copyright (c) 2026 ad2-bridge authors

use tokio::net::{lookup_host, TcpStream};
use tracing::debug;

use crate::error::{AdError, Result};
use crate::transport::{LineStreams, Transport};

/// TCP transport for an AlarmDecoder exposed through ser2sock (or an
/// AD2PI network appliance).
pub struct TcpTransport {
    host: String,
    port: u16,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn open(&self) -> Result<LineStreams> {
        // Resolve explicitly so a bad host name surfaces as a
        // configuration error rather than a retryable I/O failure.
        let mut addrs = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| AdError::Configuration {
                reason: format!("cannot resolve {}: {}", self.host, e),
            })?;
        let addr = addrs.next().ok_or_else(|| AdError::Configuration {
            reason: format!("no addresses for {}", self.host),
        })?;

        let stream = TcpStream::connect(addr).await?;
        debug!("connected to {}:{}", self.host, self.port);

        let (reader, writer) = stream.into_split();
        Ok(LineStreams {
            reader: Box::new(reader),
            writer: Box::new(writer),
        })
    }

    fn label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unresolvable_host_is_configuration_error() {
        let transport = TcpTransport::new("no-such-host.invalid", 10000);
        match transport.open().await {
            Err(AdError::Configuration { .. }) => {}
            Err(e) => panic!("expected configuration error, got {e:?}"),
            Ok(_) => panic!("expected configuration error, got success"),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_io_error() {
        // Port 1 on localhost resolves fine but nothing listens there.
        let transport = TcpTransport::new("127.0.0.1", 1);
        match transport.open().await {
            Err(AdError::Io(_)) => {}
            Err(e) => panic!("expected I/O error, got {e:?}"),
            Ok(_) => panic!("expected I/O error, got success"),
        }
    }

    #[test]
    fn label_format() {
        assert_eq!(TcpTransport::new("ad2", 10000).label(), "ad2:10000");
    }
}
