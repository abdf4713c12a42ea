//! Monitor websocket client, reconnect worker, and observation handle.
//!
//! The client spawns a background worker that owns the only websocket handle
//! and the only reconnect timer. All inbound dispatch funnels through
//! [`MonitorState`], which the handle shares for snapshot reads. Outbound
//! commands travel over an in-memory queue and are best-effort: anything
//! issued while disconnected is dropped, never queued for the next session.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::proto::{ClientCommand, ConnectionStatus, MessageStats, MonitorEvent, ServerEnvelope};
use crate::state::MonitorState;

/// Fixed delay between a disconnect and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);
/// Path of the monitor stream endpoint on the service host.
pub const MONITOR_PATH: &str = "/ws/monitor";
/// Default endpoint used when no host or override is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/ws/monitor";

type MonitorSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Entry point for creating monitor stream connections.
#[derive(Clone, Debug)]
pub struct MonitorClient {
    endpoint: String,
    reconnect_delay: Duration,
}

impl MonitorClient {
    /// Creates a client against the default local endpoint.
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    /// Creates a client for a service host, deriving the endpoint address.
    ///
    /// The scheme mirrors the caller's security context: `wss` when `secure`
    /// is set, `ws` otherwise.
    pub fn for_host(host: impl AsRef<str>, secure: bool) -> Self {
        let scheme = if secure { "wss" } else { "ws" };
        Self {
            endpoint: format!("{scheme}://{}{MONITOR_PATH}", host.as_ref()),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    /// Sets an explicit endpoint address, taking precedence over the host
    /// derivation.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.endpoint = endpoint.trim().to_string();
        self
    }

    /// Overrides the fixed reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Returns the resolved endpoint address.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Starts the background worker and returns the observation handle.
    ///
    /// The worker connects immediately and keeps reconnecting after the
    /// fixed delay for as long as the handle is alive; individual connect
    /// failures are absorbed, so the only error here is a structurally
    /// invalid endpoint address. Must be called within a tokio runtime.
    pub fn connect(&self) -> Result<MonitorHandle, MonitorClientError> {
        self.endpoint.as_str().into_client_request()?;

        let state = Arc::new(RwLock::new(MonitorState::new()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();

        let url = self.endpoint.clone();
        let delay = self.reconnect_delay;
        let worker_state = Arc::clone(&state);
        tokio::spawn(async move {
            monitor_worker(url, worker_state, command_rx, status_tx, delay).await;
        });

        Ok(MonitorHandle {
            state,
            commands: command_tx,
            status: Some(status_rx),
        })
    }
}

impl Default for MonitorClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection lifecycle updates produced by the worker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MonitorConnectionStatus {
    Connected,
    Disconnected,
}

/// Observation surface over a live monitor client.
///
/// Dropping the handle tears the client down: the pending reconnect timer is
/// cancelled, the live socket (if any) is closed, and the worker exits.
#[derive(Debug)]
pub struct MonitorHandle {
    state: Arc<RwLock<MonitorState>>,
    commands: mpsc::UnboundedSender<ClientCommand>,
    status: Option<mpsc::UnboundedReceiver<MonitorConnectionStatus>>,
}

impl MonitorHandle {
    /// Returns the buffered event history, ordered oldest to newest.
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.state
            .read()
            .map(|state| state.events())
            .unwrap_or_default()
    }

    /// Returns the latest server connection snapshot, if any.
    pub fn connection_status(&self) -> Option<ConnectionStatus> {
        self.state
            .read()
            .map(|state| state.connection_status())
            .unwrap_or_default()
    }

    /// Returns the latest server message aggregates, if any.
    pub fn stats(&self) -> Option<MessageStats> {
        self.state
            .read()
            .map(|state| state.stats())
            .unwrap_or_default()
    }

    /// Returns true while a live session is established.
    pub fn is_connected(&self) -> bool {
        self.state
            .read()
            .map(|state| state.is_connected())
            .unwrap_or(false)
    }

    /// Takes the connection status update lane.
    ///
    /// Returns `None` after the first call; lifecycle updates are buffered
    /// from the moment the client was started.
    pub fn status_updates(&mut self) -> Option<mpsc::UnboundedReceiver<MonitorConnectionStatus>> {
        self.status.take()
    }

    /// Requests a server-side history clear and empties local history
    /// immediately, without waiting for the server acknowledgment.
    ///
    /// No-op while disconnected.
    pub fn clear_history(&self) {
        if !self.is_connected() {
            debug!("clear_history ignored: monitor stream not connected");
            return;
        }
        if self.commands.send(ClientCommand::ClearHistory).is_ok() {
            if let Ok(mut state) = self.state.write() {
                state.clear_events();
            }
        }
    }

    /// Requests a server-side stats reset.
    ///
    /// Local stats are left untouched; the server's next `stats` envelope is
    /// authoritative for the reset. No-op while disconnected.
    pub fn reset_stats(&self) {
        if !self.is_connected() {
            debug!("reset_stats ignored: monitor stream not connected");
            return;
        }
        let _ = self.commands.send(ClientCommand::ResetStats);
    }

    /// Tears the client down.
    ///
    /// Equivalent to dropping the handle; provided for explicit call sites.
    pub fn close(self) {}
}

/// Errors produced by monitor client setup.
#[derive(Debug, Error)]
pub enum MonitorClientError {
    /// Websocket transport error, including invalid endpoint addresses.
    #[error("websocket error: {0}")]
    WebSocket(#[from] WsError),
}

enum SessionOutcome {
    GracefulShutdown,
    Reconnect,
}

async fn monitor_worker(
    url: String,
    state: Arc<RwLock<MonitorState>>,
    mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    status_tx: mpsc::UnboundedSender<MonitorConnectionStatus>,
    reconnect_delay: Duration,
) {
    loop {
        if let Ok(mut guard) = state.write() {
            guard.begin_connect();
        }

        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                if let Ok(mut guard) = state.write() {
                    guard.mark_connected();
                }
                let _ = status_tx.send(MonitorConnectionStatus::Connected);
                info!("monitor stream connected: {url}");

                let outcome = run_session(socket, &state, &mut command_rx).await;

                if let Ok(mut guard) = state.write() {
                    guard.mark_disconnected();
                }
                let _ = status_tx.send(MonitorConnectionStatus::Disconnected);

                if matches!(outcome, SessionOutcome::GracefulShutdown) {
                    break;
                }
                info!(
                    "monitor stream disconnected, reconnecting in {}ms",
                    reconnect_delay.as_millis()
                );
            }
            Err(err) => {
                if let Ok(mut guard) = state.write() {
                    guard.mark_disconnected();
                }
                warn!(
                    "monitor stream connect failed: {err}, retrying in {}ms",
                    reconnect_delay.as_millis()
                );
            }
        }

        if command_rx.is_closed() {
            break;
        }

        if !discard_commands_during_delay(reconnect_delay, &mut command_rx).await {
            break;
        }
    }
}

/// Runs one connected session until close, error, or teardown.
async fn run_session(
    mut socket: MonitorSocket,
    state: &Arc<RwLock<MonitorState>>,
    command_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
) -> SessionOutcome {
    loop {
        tokio::select! {
            maybe_command = command_rx.recv() => {
                match maybe_command {
                    Some(command) => {
                        let text = match command.to_text() {
                            Ok(text) => text,
                            Err(err) => {
                                warn!("failed to encode monitor command: {err}");
                                continue;
                            }
                        };
                        // Commands are best-effort: a failed write drops the
                        // command and triggers the normal disconnect path.
                        if socket.send(Message::text(text)).await.is_err() {
                            return SessionOutcome::Reconnect;
                        }
                    }
                    None => {
                        let _ = socket.close(None).await;
                        return SessionOutcome::GracefulShutdown;
                    }
                }
            }
            maybe_inbound = socket.next() => {
                match maybe_inbound {
                    Some(Ok(Message::Text(text))) => {
                        match ServerEnvelope::from_text(&text) {
                            Ok(envelope) => {
                                if let Ok(mut guard) = state.write() {
                                    guard.apply_envelope(envelope);
                                }
                            }
                            // Malformed frames are non-fatal: discard the
                            // single frame and keep the session open.
                            Err(err) => warn!("discarding malformed monitor frame: {err}"),
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            return SessionOutcome::Reconnect;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => return SessionOutcome::Reconnect,
                    Some(Ok(_)) => warn!("ignoring non-text monitor frame"),
                    Some(Err(err)) => {
                        warn!("monitor stream error: {err}");
                        return SessionOutcome::Reconnect;
                    }
                    None => return SessionOutcome::Reconnect,
                }
            }
        }
    }
}

/// Waits out the reconnect delay, dropping commands issued while
/// disconnected.
///
/// Returns false when the command channel closes, which cancels the pending
/// reconnect.
async fn discard_commands_during_delay(
    delay: Duration,
    command_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
) -> bool {
    let timer = tokio::time::sleep(delay);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            () = &mut timer => return true,
            maybe_command = command_rx.recv() => {
                match maybe_command {
                    Some(command) => {
                        debug!("dropping {command:?} while monitor stream is disconnected");
                    }
                    None => return false,
                }
            }
        }
    }
}
