// MIT License - Copyright (c) 2026 ad2-bridge authors

use std::time::Duration;

use crate::constants::{DEFAULT_BAUD_RATE, DEFAULT_TCP_PORT};

/// Which transport the bridge should use to reach the AlarmDecoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// TCP connection to a ser2sock (or AD2PI network appliance) endpoint.
    Tcp { host: String, port: u16 },
    /// Local serial device (AD2USB or directly attached AD2PI).
    Serial { device: String, baud_rate: u32 },
}

/// Explicit set of serial device paths known to the deployment, merged
/// with the system-enumerated ports when validating a serial device name.
/// Symlinked devices (e.g. udev aliases) that enumeration cannot see are
/// listed here by the caller instead of being registered through any
/// process-global state.
#[derive(Debug, Clone, Default)]
pub struct KnownPorts {
    extra: Vec<String>,
}

impl KnownPorts {
    pub fn new(extra: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            extra: extra.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `device` is in the caller-supplied set.
    pub fn contains(&self, device: &str) -> bool {
        self.extra.iter().any(|p| p == device)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extra.iter().map(String::as_str)
    }
}

/// Configuration for a bridge connection.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Transport endpoint.
    pub transport: TransportKind,
    /// Extra serial ports visible to the serial transport opener.
    pub known_ports: KnownPorts,
    /// Delay before retrying after a transient connection failure.
    pub reconnect_delay: Duration,
    /// Interval of the periodic connection health check.
    pub check_interval: Duration,
    /// Address mask of the keypad this bridge sends commands as.
    /// With exactly one bit set, commands are sent addressed from that
    /// keypad; otherwise they are sent as the AlarmDecoder's own address.
    pub keypad_address_mask: u32,
    /// Whether keypad command sending is enabled at all.
    pub send_commands: bool,
    /// Whether to request the device version (`V`) after each connect.
    pub request_version: bool,
    /// Capacity of the broadcast event channel.
    pub event_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Tcp {
                host: "localhost".to_string(),
                port: DEFAULT_TCP_PORT,
            },
            known_ports: KnownPorts::default(),
            reconnect_delay: Duration::from_secs(60),
            check_interval: Duration::from_secs(60),
            keypad_address_mask: 0,
            send_commands: false,
            request_version: true,
            event_capacity: 256,
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn tcp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.transport = TransportKind::Tcp {
            host: host.into(),
            port,
        };
        self
    }

    pub fn serial(mut self, device: impl Into<String>) -> Self {
        self.config.transport = TransportKind::Serial {
            device: device.into(),
            baud_rate: DEFAULT_BAUD_RATE,
        };
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        if let TransportKind::Serial {
            baud_rate: ref mut b,
            ..
        } = self.config.transport
        {
            *b = baud_rate;
        }
        self
    }

    pub fn known_ports(mut self, ports: KnownPorts) -> Self {
        self.config.known_ports = ports;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.config.check_interval = interval;
        self
    }

    pub fn keypad_address_mask(mut self, mask: u32) -> Self {
        self.config.keypad_address_mask = mask;
        self
    }

    pub fn send_commands(mut self, enabled: bool) -> Self {
        self.config.send_commands = enabled;
        self
    }

    pub fn request_version(mut self, enabled: bool) -> Self {
        self.config.request_version = enabled;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}
