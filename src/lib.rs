// MIT License - Copyright (c) 2026 ad2-bridge authors

//! # ad2-bridge
//!
//! Direct TCP and serial communication with NuTech AlarmDecoder devices
//! (AD2USB, AD2PI) attached to Ademco/Honeywell Vista security panels.
//!
//! The AlarmDecoder translates the panel's keypad bus into
//! newline-terminated ASCII lines. This library decodes those lines into
//! typed messages, manages the connect/read/reconnect lifecycle of the
//! byte stream, tracks per-device state derived from the message flow,
//! and encodes outbound keypad commands. No external dependencies beyond
//! tokio, tokio-serial, async-trait, thiserror, tracing, and bitflags.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ad2_bridge::{AdBridge, AdEvent, BridgeConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::builder()
//!         .tcp("192.168.1.10", 10000)
//!         .build();
//!
//!     let bridge = AdBridge::new(config);
//!     let mut events = bridge.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     bridge.connect().await?;
//!     tokio::signal::ctrl_c().await?;
//!     bridge.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod connection;
pub mod constants;
pub mod devices;
pub mod error;
pub mod event;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use bridge::AdBridge;
pub use config::{BridgeConfig, BridgeConfigBuilder, KnownPorts, TransportKind};
pub use connection::{ConnectionManager, ConnectionState, OfflineReason};
pub use devices::{Keypad, RfZone, Zone, ZoneState};
pub use error::{AdError, Result};
pub use event::{AdEvent, EventReceiver};
pub use protocol::command::AdCommand;
pub use protocol::message::{AdMessage, KeypadFlags, KeypadMessage, RfFlags};
pub use protocol::MessageKind;
