// MIT License - Copyright (c) 2026 ad2-bridge authors

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{BridgeConfig, TransportKind};
use crate::connection::{ConnectionManager, ConnectionState};
use crate::devices::{Keypad, RfZone, Zone, ZoneState};
use crate::error::Result;
use crate::event::{event_channel, AdEvent, EventReceiver, EventSender};
use crate::protocol::command::{expand_special_keys, validate_keypad_command, AdCommand};
use crate::protocol::message::AdMessage;
use crate::transport::{SerialTransport, TcpTransport, Transport};

/// The main public API for talking to an AlarmDecoder.
///
/// # Example
///
/// ```no_run
/// use ad2_bridge::{AdBridge, AdEvent, BridgeConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = BridgeConfig::builder()
///         .tcp("192.168.1.10", 10000)
///         .build();
///
///     let bridge = AdBridge::new(config);
///     bridge.add_zone(7, 1).await;
///
///     let mut events = bridge.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             if let AdEvent::Message(msg) = event {
///                 println!("{}", msg.raw());
///             }
///         }
///     });
///
///     bridge.connect().await?;
///     tokio::signal::ctrl_c().await?;
///     bridge.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct AdBridge {
    config: BridgeConfig,
    manager: Arc<ConnectionManager>,
    event_tx: EventSender,
    zones: Arc<RwLock<Vec<Zone>>>,
    rf_zones: Arc<RwLock<Vec<RfZone>>>,
    keypads: Arc<RwLock<Vec<Keypad>>>,
    dispatch_task: Option<JoinHandle<()>>,
}

impl AdBridge {
    /// Build a bridge from its configuration. No connection is made
    /// until [`connect`](Self::connect) is called.
    pub fn new(config: BridgeConfig) -> Self {
        let (event_tx, event_rx) = event_channel(config.event_capacity);
        let transport = build_transport(&config);
        let manager = ConnectionManager::new(
            transport,
            config.reconnect_delay,
            config.check_interval,
            event_tx.clone(),
        );

        let zones = Arc::new(RwLock::new(Vec::new()));
        let rf_zones = Arc::new(RwLock::new(Vec::new()));
        let keypads = Arc::new(RwLock::new(Vec::new()));

        let dispatch_task = spawn_dispatch(
            event_rx,
            Arc::clone(&zones),
            Arc::clone(&rf_zones),
            Arc::clone(&keypads),
        );

        Self {
            config,
            manager,
            event_tx,
            zones,
            rf_zones,
            keypads,
            dispatch_task: Some(dispatch_task),
        }
    }

    /// Subscribe to decoded messages and connection-state transitions.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    /// Open the connection. Transient failures schedule an automatic
    /// reconnect, so an `Err` here does not necessarily mean the bridge
    /// stays down.
    pub async fn connect(&self) -> Result<()> {
        self.manager.connect().await?;
        if self.config.request_version {
            if let Err(e) = self.manager.send(&AdCommand::version()).await {
                debug!("version request failed: {}", e);
            }
        }
        Ok(())
    }

    /// Tear down the connection and cancel any pending reconnect.
    pub async fn disconnect(&self) {
        self.manager.disconnect().await;
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.manager.state().await
    }

    pub async fn is_online(&self) -> bool {
        self.manager.is_online().await
    }

    /// Whether the panel has reported READY since the last (re)connect.
    pub fn panel_ready(&self) -> bool {
        self.manager.panel_ready()
    }

    /// Track a wired zone identified by (address, channel).
    pub async fn add_zone(&self, address: u32, channel: u32) {
        self.zones.write().await.push(Zone::new(address, channel));
    }

    /// Track a wireless zone identified by its transmitter serial.
    pub async fn add_rf_zone(&self, serial: u32) {
        self.rf_zones.write().await.push(RfZone::new(serial));
    }

    /// Track a keypad identified by an address mask (0 = all).
    pub async fn add_keypad(&self, address_mask: u32) {
        self.keypads.write().await.push(Keypad::new(address_mask));
    }

    /// Contact state of a tracked wired zone.
    pub async fn zone_state(&self, address: u32, channel: u32) -> Option<ZoneState> {
        self.zones
            .read()
            .await
            .iter()
            .find(|z| z.responsible_for(address, channel))
            .and_then(Zone::state)
    }

    /// Snapshot of all tracked wired zones.
    pub async fn zones(&self) -> Vec<Zone> {
        self.zones.read().await.clone()
    }

    /// Snapshot of a tracked wireless zone.
    pub async fn rf_zone(&self, serial: u32) -> Option<RfZone> {
        self.rf_zones
            .read()
            .await
            .iter()
            .find(|z| z.serial == serial)
            .cloned()
    }

    /// Snapshot of all tracked keypads.
    pub async fn keypads(&self) -> Vec<Keypad> {
        self.keypads.read().await.clone()
    }

    /// Send a keypad command (digits, `*`, `#`, `<`, `>`, and `A`-`H`
    /// for special keys 1-8). The command is validated, special keys
    /// are expanded, and it goes out addressed when the configured
    /// address mask names exactly one keypad. Ignored (with a log
    /// message) when command sending is disabled in the config.
    pub async fn send_keypad_command(&self, command: &str) -> Result<()> {
        if !self.config.send_commands {
            info!("keypad command sending is disabled; ignoring command");
            return Ok(());
        }
        validate_keypad_command(command)?;
        let body = expand_special_keys(command);

        let mask = self.config.keypad_address_mask;
        let cmd = if mask.count_ones() == 1 {
            AdCommand::addressed(mask, &body)
        } else {
            AdCommand::new(body)
        };
        self.manager.send(&cmd).await
    }

    /// Send a pre-built command as-is.
    pub async fn send_command(&self, command: &AdCommand) -> Result<()> {
        self.manager.send(command).await
    }
}

impl Drop for AdBridge {
    fn drop(&mut self) {
        if let Some(handle) = self.dispatch_task.take() {
            handle.abort();
        }
    }
}

fn build_transport(config: &BridgeConfig) -> Arc<dyn Transport> {
    match &config.transport {
        TransportKind::Tcp { host, port } => Arc::new(TcpTransport::new(host.clone(), *port)),
        TransportKind::Serial { device, baud_rate } => Arc::new(SerialTransport::new(
            device.clone(),
            *baud_rate,
            config.known_ports.clone(),
        )),
    }
}

/// Background task keeping the device registry in sync with the event
/// stream. Runs for the life of the bridge, across reconnects.
fn spawn_dispatch(
    mut event_rx: EventReceiver,
    zones: Arc<RwLock<Vec<Zone>>>,
    rf_zones: Arc<RwLock<Vec<RfZone>>>,
    keypads: Arc<RwLock<Vec<Keypad>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(AdEvent::Message(msg)) => {
                    apply_message(&msg, &zones, &rf_zones, &keypads).await;
                }
                Ok(AdEvent::PanelReady) => {
                    for zone in zones.write().await.iter_mut() {
                        zone.notify_panel_ready();
                    }
                }
                Ok(AdEvent::ConnectionStatus(ConnectionState::Online)) => {
                    // Fresh connection epoch: derived state is stale.
                    for zone in zones.write().await.iter_mut() {
                        zone.reset();
                    }
                    for zone in rf_zones.write().await.iter_mut() {
                        zone.reset();
                    }
                }
                Ok(AdEvent::ConnectionStatus(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("device dispatch lagged, skipped {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn apply_message(
    msg: &AdMessage,
    zones: &Arc<RwLock<Vec<Zone>>>,
    rf_zones: &Arc<RwLock<Vec<RfZone>>>,
    keypads: &Arc<RwLock<Vec<Keypad>>>,
) {
    match msg {
        AdMessage::Keypad(kpm) => {
            for keypad in keypads.write().await.iter_mut() {
                if keypad.responsible_for(kpm.address_mask) {
                    keypad.update(kpm);
                }
            }
        }
        AdMessage::ZoneExpander(m) => {
            update_zone(zones, m.address, m.channel, m.open).await;
        }
        AdMessage::Relay(m) => {
            update_zone(zones, m.address, m.channel, m.open).await;
        }
        AdMessage::Rf(m) => {
            for zone in rf_zones.write().await.iter_mut() {
                if zone.serial == m.serial {
                    zone.update(m.flags);
                }
            }
        }
        // LRR events and version reports carry no per-device state.
        AdMessage::Lrr(_) | AdMessage::Version(_) => {}
    }
}

async fn update_zone(zones: &Arc<RwLock<Vec<Zone>>>, address: u32, channel: u32, open: bool) {
    for zone in zones.write().await.iter_mut() {
        if zone.responsible_for(address, channel) {
            zone.update(open);
        }
    }
}
