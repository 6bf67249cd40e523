// MIT License - Copyright (c) 2026 ad2-bridge authors

use crate::connection::ConnectionState;
use crate::protocol::message::AdMessage;

/// All events emitted by a bridge connection.
///
/// Consumers subscribe via `bridge.subscribe()` and receive a
/// `tokio::sync::broadcast::Receiver<AdEvent>`. Events are published from
/// a single reader task, so message order matches wire arrival order.
#[derive(Debug, Clone)]
pub enum AdEvent {
    /// A decoded protocol message arrived.
    Message(AdMessage),
    /// The connection state machine transitioned.
    ConnectionStatus(ConnectionState),
    /// First keypad READY signal observed since (re)connect. Emitted once
    /// per connection epoch; zone trackers seed their "closed" default on
    /// this event.
    PanelReady,
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<AdEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<AdEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
