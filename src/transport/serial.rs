// MIT License - Copyright (c) 2026 ad2-bridge authors

use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};
use tracing::{debug, trace};

use crate::config::KnownPorts;
use crate::error::{AdError, Result};
use crate::transport::{LineStreams, Transport};

/// Serial transport for a directly attached AD2USB/AD2PI.
///
/// The device name is checked against the system's enumerated ports
/// merged with the caller-supplied [`KnownPorts`] set, so symlinked
/// devices that enumeration cannot see stay usable without any
/// process-global registration.
pub struct SerialTransport {
    device: String,
    baud_rate: u32,
    known_ports: KnownPorts,
}

impl SerialTransport {
    pub fn new(device: impl Into<String>, baud_rate: u32, known_ports: KnownPorts) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            known_ports,
        }
    }

    /// Whether `device` is visible to this transport. Enumeration
    /// failures are ignored so a restricted environment can still open
    /// a known port.
    fn device_known(&self) -> Option<bool> {
        if self.known_ports.contains(&self.device) {
            return Some(true);
        }
        match tokio_serial::available_ports() {
            Ok(ports) => {
                trace!(
                    "enumerated serial ports: {:?}",
                    ports.iter().map(|p| &p.port_name).collect::<Vec<_>>()
                );
                Some(ports.iter().any(|p| p.port_name == self.device))
            }
            Err(_) => None,
        }
    }
}

#[async_trait::async_trait]
impl Transport for SerialTransport {
    async fn open(&self) -> Result<LineStreams> {
        if self.device_known() == Some(false) {
            return Err(AdError::Configuration {
                reason: format!("unknown serial device: {}", self.device),
            });
        }

        let stream = tokio_serial::new(&self.device, self.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::Hardware)
            .open_native_async()
            .map_err(|e| classify_open_error(&self.device, e))?;
        debug!("opened serial port {} at {} baud", self.device, self.baud_rate);

        let (reader, writer) = tokio::io::split(stream);
        Ok(LineStreams {
            reader: Box::new(reader),
            writer: Box::new(writer),
        })
    }

    fn label(&self) -> String {
        self.device.clone()
    }
}

/// Map a serial open failure onto the error taxonomy. `NoDevice` covers
/// a port held by another process, which stays offline without an
/// automatic retry; a missing device node or bad parameters are
/// configuration errors; everything else is transient I/O.
fn classify_open_error(device: &str, e: tokio_serial::Error) -> AdError {
    match e.kind() {
        tokio_serial::ErrorKind::NoDevice => AdError::PortInUse {
            device: device.to_string(),
        },
        tokio_serial::ErrorKind::InvalidInput => AdError::Configuration {
            reason: format!("invalid serial device: {}", device),
        },
        tokio_serial::ErrorKind::Io(std::io::ErrorKind::NotFound) => AdError::Configuration {
            reason: format!("no such serial device: {}", device),
        },
        tokio_serial::ErrorKind::Io(kind) => {
            AdError::Io(std::io::Error::new(kind, e.description))
        }
        tokio_serial::ErrorKind::Unknown => {
            AdError::Io(std::io::Error::other(e.description))
        }
    }
}
