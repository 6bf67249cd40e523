// MIT License - Copyright (c) 2026 ad2-bridge authors

//! Connection lifecycle management.
//!
//! One [`ConnectionManager`] owns one transport connection: it opens the
//! stream, runs the background reader loop, schedules the fixed-delay
//! reconnect after transient failures, and watches traffic liveness with
//! a periodic check. `connect`, `disconnect` and the check teardown are
//! serialized behind a single mutex so a retry firing and an explicit
//! reconnect can never open two transports at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::constants::COMMAND_TERMINATOR;
use crate::error::{AdError, Result};
use crate::event::{AdEvent, EventSender};
use crate::protocol::command::AdCommand;
use crate::protocol::message::{decode, AdMessage};
use crate::transport::Transport;

/// Why a connection is offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineReason {
    /// Permanent until reconfiguration; no retry is scheduled.
    ConfigurationError(String),
    /// Transport-level failure. Retried unless the port is held by
    /// another process.
    CommunicationError(String),
}

/// Observable state of a managed connection. Only the connection
/// manager transitions this; subscribers see every transition as an
/// [`AdEvent::ConnectionStatus`] event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Online,
    Offline(OfflineReason),
    RetryScheduled,
}

/// Mutable connection innards. Guarded by one mutex; holding the guard
/// is what serializes connect/disconnect/check-teardown.
struct Inner {
    writer: Option<Box<dyn AsyncWrite + Send + Unpin>>,
    reader_task: Option<JoinHandle<()>>,
    check_task: Option<JoinHandle<()>>,
    retry_task: Option<JoinHandle<()>>,
    check_reconnect_task: Option<JoinHandle<()>>,
    /// Bumped on every successful open. Stale reader-exit callbacks and
    /// check reconnects compare epochs and back off.
    epoch: u64,
}

/// Owns one transport connection and its lifecycle.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    reconnect_delay: Duration,
    check_interval: Duration,
    event_tx: EventSender,
    inner: Mutex<Inner>,
    state: RwLock<ConnectionState>,
    /// True once the first keypad READY signal of this connection epoch
    /// has been seen. Reset on every successful (re)connect.
    panel_ready: AtomicBool,
    /// Arrival instant of the most recent line, for the liveness check.
    last_line: RwLock<Option<Instant>>,
    /// Handle to ourselves for the background tasks. Tasks hold weak
    /// references, so dropping the manager lets them wind down instead
    /// of keeping it alive.
    weak: Weak<ConnectionManager>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        reconnect_delay: Duration,
        check_interval: Duration,
        event_tx: EventSender,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            transport,
            reconnect_delay,
            check_interval,
            event_tx,
            inner: Mutex::new(Inner {
                writer: None,
                reader_task: None,
                check_task: None,
                retry_task: None,
                check_reconnect_task: None,
                epoch: 0,
            }),
            state: RwLock::new(ConnectionState::Uninitialized),
            panel_ready: AtomicBool::new(false),
            last_line: RwLock::new(None),
            weak: weak.clone(),
        })
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    pub async fn is_online(&self) -> bool {
        *self.state.read().await == ConnectionState::Online
    }

    /// Whether the panel has reported READY since the last (re)connect.
    pub fn panel_ready(&self) -> bool {
        self.panel_ready.load(Ordering::SeqCst)
    }

    /// Whether a reconnect attempt is currently scheduled.
    pub async fn retry_pending(&self) -> bool {
        self.inner.lock().await.retry_task.is_some()
    }

    /// Open (or re-open) the connection. Any existing connection and
    /// pending retry are torn down first. On success the reader loop and
    /// the periodic liveness check are started. Configuration errors and
    /// a port held elsewhere leave the connection offline without a
    /// retry; transient I/O failures schedule one reconnect after the
    /// configured delay.
    pub async fn connect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.connect_locked(&mut inner).await
    }

    /// Tear down the connection, cancelling the pending retry and
    /// liveness-check tasks. Idempotent.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        self.disconnect_locked(&mut inner).await;
        self.set_state(ConnectionState::Uninitialized).await;
        info!("disconnected from {}", self.transport.label());
    }

    /// One liveness probe: when online but no line has arrived for a
    /// full check interval, the connection is considered dead and a
    /// reconnect is scheduled. Runs periodically once connected; may
    /// also be invoked directly.
    pub async fn connection_check(&self) {
        let epoch = {
            let inner = self.inner.lock().await;
            if inner.reader_task.is_none() {
                return;
            }
            inner.epoch
        };
        if self.line_seen_within(self.check_interval).await {
            debug!("connection check passed for {}", self.transport.label());
            return;
        }
        warn!(
            "no traffic from {} for {:?}, reconnecting",
            self.transport.label(),
            self.check_interval
        );
        self.schedule_check_reconnect(epoch).await;
    }

    /// Write a command to the device. Fails with `Disconnected` when no
    /// connection is open.
    pub async fn send(&self, command: &AdCommand) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let writer = inner.writer.as_mut().ok_or(AdError::Disconnected)?;
        writer.write_all(command.as_str().as_bytes()).await?;
        writer.write_all(COMMAND_TERMINATOR.as_bytes()).await?;
        writer.flush().await?;
        debug!("sent command: {}", command);
        Ok(())
    }

    async fn connect_locked(&self, inner: &mut Inner) -> Result<()> {
        self.disconnect_locked(inner).await;
        self.set_state(ConnectionState::Connecting).await;
        info!("connecting to {}", self.transport.label());

        match self.transport.open().await {
            Ok(streams) => {
                inner.epoch += 1;
                let epoch = inner.epoch;
                inner.writer = Some(streams.writer);
                self.panel_ready.store(false, Ordering::SeqCst);
                *self.last_line.write().await = Some(Instant::now());
                inner.reader_task = Some(self.spawn_reader(streams.reader, epoch));
                inner.check_task = Some(self.spawn_check_loop());
                self.set_state(ConnectionState::Online).await;
                info!("connected to {}", self.transport.label());
                Ok(())
            }
            Err(e) => {
                warn!("connection to {} failed: {}", self.transport.label(), e);
                let reason = match &e {
                    AdError::Configuration { reason } => {
                        OfflineReason::ConfigurationError(reason.clone())
                    }
                    other => OfflineReason::CommunicationError(other.to_string()),
                };
                // The observable state always changes before any retry
                // is scheduled.
                self.set_state(ConnectionState::Offline(reason)).await;
                if e.is_retryable() {
                    self.schedule_retry_locked(inner);
                    self.set_state(ConnectionState::RetryScheduled).await;
                }
                Err(e)
            }
        }
    }

    async fn disconnect_locked(&self, inner: &mut Inner) {
        // Pending retry and check-reconnect timers are cancelled here.
        // A firing task removes its own handle from the slot before
        // re-entering connect, so this never aborts the very invocation
        // that called us.
        if let Some(h) = inner.retry_task.take() {
            h.abort();
        }
        if let Some(h) = inner.check_reconnect_task.take() {
            h.abort();
        }
        if let Some(h) = inner.check_task.take() {
            h.abort();
        }
        // The reader blocks on I/O; interrupt it immediately.
        if let Some(h) = inner.reader_task.take() {
            h.abort();
        }
        if let Some(mut writer) = inner.writer.take() {
            let _ = writer.shutdown().await;
        }
    }

    fn schedule_retry_locked(&self, inner: &mut Inner) {
        if let Some(h) = inner.retry_task.take() {
            h.abort();
        }
        let weak = self.weak.clone();
        let delay = self.reconnect_delay;
        debug!("scheduling reconnect in {:?}", delay);
        inner.retry_task = Some(tokio::spawn(async move {
            sleep(delay).await;
            let Some(this) = weak.upgrade() else { return };
            let mut inner = this.inner.lock().await;
            // Remove our own handle first: the teardown inside connect
            // must only ever cancel a pending timer, not this running
            // invocation.
            inner.retry_task = None;
            let _ = this.connect_locked(&mut inner).await;
        }));
    }

    async fn schedule_check_reconnect(&self, epoch: u64) {
        let weak = self.weak.clone();
        let task = tokio::spawn(async move {
            let Some(this) = weak.upgrade() else { return };
            let mut inner = this.inner.lock().await;
            if inner.epoch != epoch {
                return; // someone else already reconnected
            }
            inner.check_reconnect_task = None;
            let _ = this.connect_locked(&mut inner).await;
        });
        self.inner.lock().await.check_reconnect_task = Some(task);
    }

    fn spawn_check_loop(&self) -> JoinHandle<()> {
        let weak = self.weak.clone();
        let interval = self.check_interval;
        tokio::spawn(async move {
            loop {
                sleep(interval).await;
                let Some(this) = weak.upgrade() else { return };
                this.connection_check().await;
            }
        })
    }

    fn spawn_reader(
        &self,
        reader: Box<dyn AsyncRead + Send + Unpin>,
        epoch: u64,
    ) -> JoinHandle<()> {
        let weak = self.weak.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            let cause = loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(this) = weak.upgrade() else { return };
                        *this.last_line.write().await = Some(Instant::now());
                        if line.is_empty() {
                            continue;
                        }
                        this.process_line(&line);
                    }
                    Ok(None) => break AdError::Disconnected,
                    Err(e) => break AdError::Io(e),
                }
            };
            warn!("reader loop ended: {}", cause);
            if let Some(this) = weak.upgrade() {
                this.handle_reader_exit(epoch, cause).await;
            }
        })
    }

    /// Classify and decode one line, then publish it. Decode failures
    /// stay local: the line is logged and dropped, the loop continues.
    fn process_line(&self, line: &str) {
        match decode(line) {
            Ok(msg) => {
                if let AdMessage::Keypad(ref kpm) = msg {
                    if kpm.is_ready() && !self.panel_ready.swap(true, Ordering::SeqCst) {
                        debug!("panel reports ready");
                        let _ = self.event_tx.send(AdEvent::PanelReady);
                    }
                }
                let _ = self.event_tx.send(AdEvent::Message(msg));
            }
            Err(e) => {
                debug!("dropping undecodable line: {}", e);
            }
        }
    }

    /// Runs on the reader task when its stream ends. Tears the
    /// connection down and schedules a reconnect, unless a newer
    /// connection epoch already took over.
    async fn handle_reader_exit(&self, epoch: u64, cause: AdError) {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            return;
        }
        // Drop our own handle; we are the teardown, not its target.
        inner.reader_task = None;
        self.disconnect_locked(&mut inner).await;
        self.set_state(ConnectionState::Offline(OfflineReason::CommunicationError(
            cause.to_string(),
        )))
        .await;
        self.schedule_retry_locked(&mut inner);
        self.set_state(ConnectionState::RetryScheduled).await;
    }

    async fn line_seen_within(&self, window: Duration) -> bool {
        self.last_line
            .read()
            .await
            .is_some_and(|t| t.elapsed() <= window)
    }

    async fn set_state(&self, state: ConnectionState) {
        *self.state.write().await = state.clone();
        let _ = self.event_tx.send(AdEvent::ConnectionStatus(state));
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        for handle in [
            inner.retry_task.take(),
            inner.check_reconnect_task.take(),
            inner.check_task.take(),
            inner.reader_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;

    use tokio::io::{duplex, AsyncReadExt, DuplexStream};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::event::{event_channel, EventReceiver};
    use crate::transport::LineStreams;

    const READY_KPM: &str =
        "[1000000100000000----],000,[f70600ff1008001c28020000000000],\"****DISARMED****  Ready to Arm  \"";
    const NOT_READY_KPM: &str =
        "[0000000100000000----],002,[f70600ff1008001c28020000000000],\"FAULT 02 GARAGE                 \"";

    #[derive(Clone, Copy)]
    enum Outcome {
        Open,
        ConfigError,
        IoError,
    }

    /// Transport whose successive `open` calls follow a script. Each
    /// successful open hands the far end of the stream to the test.
    struct ScriptedTransport {
        outcomes: std::sync::Mutex<VecDeque<Outcome>>,
        attempts: AtomicU32,
        peer_tx: mpsc::UnboundedSender<DuplexStream>,
    }

    impl ScriptedTransport {
        fn new(script: &[Outcome]) -> (Arc<Self>, mpsc::UnboundedReceiver<DuplexStream>) {
            let (peer_tx, peer_rx) = mpsc::unbounded_channel();
            (
                Arc::new(Self {
                    outcomes: std::sync::Mutex::new(script.iter().copied().collect()),
                    attempts: AtomicU32::new(0),
                    peer_tx,
                }),
                peer_rx,
            )
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn open(&self) -> Result<LineStreams> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Outcome::Open);
            match outcome {
                Outcome::Open => {
                    let (local, peer) = duplex(4096);
                    let _ = self.peer_tx.send(peer);
                    let (reader, writer) = tokio::io::split(local);
                    Ok(LineStreams {
                        reader: Box::new(reader),
                        writer: Box::new(writer),
                    })
                }
                Outcome::ConfigError => Err(AdError::Configuration {
                    reason: "unknown host".to_string(),
                }),
                Outcome::IoError => Err(AdError::Io(std::io::Error::other("connection refused"))),
            }
        }

        fn label(&self) -> String {
            "scripted".to_string()
        }
    }

    fn new_manager(
        transport: Arc<ScriptedTransport>,
        delay: Duration,
    ) -> (Arc<ConnectionManager>, EventReceiver) {
        let (event_tx, event_rx) = event_channel(64);
        let manager = ConnectionManager::new(transport, delay, Duration::from_secs(60), event_tx);
        (manager, event_rx)
    }

    async fn next_message(rx: &mut EventReceiver) -> AdMessage {
        loop {
            match timeout(Duration::from_secs(2), rx.recv()).await {
                Ok(Ok(AdEvent::Message(msg))) => return msg,
                Ok(Ok(_)) => continue,
                other => panic!("no message event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn connect_success_goes_online() {
        let (transport, mut peers) = ScriptedTransport::new(&[Outcome::Open]);
        let (manager, mut rx) = new_manager(transport.clone(), Duration::from_secs(60));

        manager.connect().await.unwrap();
        assert_eq!(manager.state().await, ConnectionState::Online);
        assert!(!manager.panel_ready());
        assert_eq!(transport.attempts(), 1);

        // Reader loop delivers decoded messages in arrival order.
        let mut peer = peers.recv().await.unwrap();
        peer.write_all(b"!EXP:01,01,01\r\n!EXP:02,01,00\r\n!REL:03,02,01\r\n")
            .await
            .unwrap();

        let msgs = [
            next_message(&mut rx).await,
            next_message(&mut rx).await,
            next_message(&mut rx).await,
        ];
        assert!(matches!(&msgs[0], AdMessage::ZoneExpander(m) if m.address == 1 && m.open));
        assert!(matches!(&msgs[1], AdMessage::ZoneExpander(m) if m.address == 2 && !m.open));
        assert!(matches!(&msgs[2], AdMessage::Relay(m) if m.address == 3));
    }

    #[tokio::test]
    async fn commands_reach_the_wire_with_terminator() {
        let (transport, mut peers) = ScriptedTransport::new(&[Outcome::Open]);
        let (manager, _rx) = new_manager(transport, Duration::from_secs(60));

        manager.connect().await.unwrap();
        let mut peer = peers.recv().await.unwrap();

        manager
            .send(&AdCommand::addressed(1 << 2, "12341"))
            .await
            .unwrap();
        let mut buf = vec![0u8; 64];
        let n = peer.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"K0212341\r\n");
    }

    #[tokio::test]
    async fn configuration_error_offline_without_retry() {
        let (transport, _peers) = ScriptedTransport::new(&[Outcome::ConfigError]);
        let (manager, _rx) = new_manager(transport.clone(), Duration::from_millis(20));

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, AdError::Configuration { .. }));
        assert!(matches!(
            manager.state().await,
            ConnectionState::Offline(OfflineReason::ConfigurationError(_))
        ));
        assert!(!manager.retry_pending().await);

        // and no second attempt ever fires
        sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn io_error_schedules_one_retry() {
        let (transport, _peers) = ScriptedTransport::new(&[Outcome::IoError, Outcome::Open]);
        let (manager, _rx) = new_manager(transport.clone(), Duration::from_millis(50));

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, AdError::Io(_)));
        assert_eq!(manager.state().await, ConnectionState::RetryScheduled);
        assert!(manager.retry_pending().await);

        // the scheduled retry succeeds
        for _ in 0..100 {
            if manager.is_online().await {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert!(manager.is_online().await);
        assert_eq!(transport.attempts(), 2);
        assert!(!manager.retry_pending().await);
    }

    #[tokio::test]
    async fn explicit_connect_cancels_pending_retry() {
        let (transport, _peers) = ScriptedTransport::new(&[Outcome::IoError, Outcome::Open]);
        let (manager, _rx) = new_manager(transport.clone(), Duration::from_secs(300));

        assert!(manager.connect().await.is_err());
        assert!(manager.retry_pending().await);

        manager.connect().await.unwrap();
        assert!(manager.is_online().await);
        assert!(!manager.retry_pending().await);

        // exactly the two explicit attempts, no duplicate from the timer
        sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let (transport, _peers) = ScriptedTransport::new(&[Outcome::Open]);
        let (manager, _rx) = new_manager(transport, Duration::from_secs(60));

        manager.connect().await.unwrap();
        manager.disconnect().await;
        assert_eq!(manager.state().await, ConnectionState::Uninitialized);
        assert!(matches!(
            manager.send(&AdCommand::version()).await,
            Err(AdError::Disconnected)
        ));

        manager.disconnect().await;
        assert!(matches!(
            manager.send(&AdCommand::version()).await,
            Err(AdError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn reader_eof_tears_down_and_retries() {
        let (transport, mut peers) = ScriptedTransport::new(&[Outcome::Open, Outcome::Open]);
        let (manager, _rx) = new_manager(transport.clone(), Duration::from_millis(50));

        manager.connect().await.unwrap();
        let peer = peers.recv().await.unwrap();
        drop(peer); // EOF on the reader side

        for _ in 0..100 {
            if transport.attempts() == 2 && manager.is_online().await {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(transport.attempts(), 2);
        assert!(manager.is_online().await);
    }

    #[tokio::test]
    async fn panel_ready_latches_once_per_connection() {
        let (transport, mut peers) = ScriptedTransport::new(&[Outcome::Open]);
        let (manager, mut rx) = new_manager(transport, Duration::from_secs(60));

        manager.connect().await.unwrap();
        assert!(!manager.panel_ready());
        let mut peer = peers.recv().await.unwrap();

        // a keypad update without READY must not latch the flag
        peer.write_all(format!("{NOT_READY_KPM}\r\n").as_bytes())
            .await
            .unwrap();
        let _ = next_message(&mut rx).await;
        assert!(!manager.panel_ready());

        peer.write_all(format!("{READY_KPM}\r\n{READY_KPM}\r\n").as_bytes())
            .await
            .unwrap();

        let mut ready_events = 0;
        let mut messages = 0;
        while messages < 2 {
            match timeout(Duration::from_secs(2), rx.recv()).await {
                Ok(Ok(AdEvent::PanelReady)) => ready_events += 1,
                Ok(Ok(AdEvent::Message(_))) => messages += 1,
                Ok(Ok(_)) => {}
                other => panic!("event stream ended: {other:?}"),
            }
        }
        assert_eq!(ready_events, 1);
        assert!(manager.panel_ready());
    }

    #[tokio::test]
    async fn undecodable_lines_are_dropped() {
        let (transport, mut peers) = ScriptedTransport::new(&[Outcome::Open]);
        let (manager, mut rx) = new_manager(transport, Duration::from_secs(60));

        manager.connect().await.unwrap();
        let mut peer = peers.recv().await.unwrap();
        peer.write_all(b"!Sending.done\r\nnot a message\r\n!EXP:05,01,01\r\n")
            .await
            .unwrap();

        let msg = next_message(&mut rx).await;
        assert!(matches!(msg, AdMessage::ZoneExpander(m) if m.address == 5));
        assert!(manager.is_online().await);
    }
}
