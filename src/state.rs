//! Connection state machine and derived monitor store.
//!
//! `MonitorState` holds everything the UI observes: the bounded event
//! history, the latest server-owned snapshots, and the connection phase. It
//! is pure state plus dispatch; the websocket worker in `client` feeds it
//! transitions and envelopes, so every rule here is testable without a
//! socket.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::proto::{ConnectionStatus, MessageStats, MonitorEvent, ServerEnvelope};

/// Maximum number of events retained in history, oldest evicted first.
pub const MAX_HISTORY: usize = 100;

/// Connection phase of a monitor client instance.
///
/// The only legal cycle is `Disconnected -> Connecting -> Connected ->
/// Disconnected -> ...`; there is no terminal phase while the owning handle
/// is alive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Disconnected,
    Connecting,
    Connected,
}

impl Phase {
    /// Legal-transition table for the connection cycle.
    ///
    /// A failed connect attempt moves `Connecting -> Disconnected` the same
    /// way a live session close does.
    fn allows(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Disconnected, Phase::Connecting)
                | (Phase::Connecting, Phase::Connected)
                | (Phase::Connecting, Phase::Disconnected)
                | (Phase::Connected, Phase::Disconnected)
        )
    }
}

/// UI-facing store synchronized with the monitor stream.
#[derive(Debug)]
pub struct MonitorState {
    phase: Phase,
    events: VecDeque<MonitorEvent>,
    connection_status: Option<ConnectionStatus>,
    stats: Option<MessageStats>,
}

impl MonitorState {
    /// Creates an empty store in the `Disconnected` phase.
    pub fn new() -> Self {
        Self {
            phase: Phase::Disconnected,
            events: VecDeque::new(),
            connection_status: None,
            stats: None,
        }
    }

    /// Returns the current connection phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns true while a live session is established.
    pub fn is_connected(&self) -> bool {
        self.phase == Phase::Connected
    }

    /// Returns the buffered history, ordered oldest to newest.
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events.iter().cloned().collect()
    }

    /// Returns the latest server connection snapshot, if any.
    pub fn connection_status(&self) -> Option<ConnectionStatus> {
        self.connection_status.clone()
    }

    /// Returns the latest server message aggregates, if any.
    pub fn stats(&self) -> Option<MessageStats> {
        self.stats.clone()
    }

    /// Moves to `Connecting` at the start of an attempt.
    pub fn begin_connect(&mut self) -> bool {
        self.transition(Phase::Connecting)
    }

    /// Moves to `Connected` once the transport reports a successful open.
    pub fn mark_connected(&mut self) -> bool {
        self.transition(Phase::Connected)
    }

    /// Moves to `Disconnected` on close or connect failure.
    ///
    /// Ephemeral server-owned snapshots are dropped together with the
    /// connected flag; history is preserved.
    pub fn mark_disconnected(&mut self) -> bool {
        if !self.transition(Phase::Disconnected) {
            return false;
        }
        self.connection_status = None;
        self.stats = None;
        true
    }

    /// Applies one inbound envelope to the store.
    pub fn apply_envelope(&mut self, envelope: ServerEnvelope) {
        match envelope {
            ServerEnvelope::History { events } => {
                // The server is authoritative: the list replaces local
                // history verbatim, with no merge and no truncation.
                self.events = events.into();
            }
            ServerEnvelope::Stats { data } => {
                self.stats = Some(data.stats);
                self.connection_status = Some(data.connection_status);
            }
            ServerEnvelope::Event { event } => {
                self.events.push_back(event);
                while self.events.len() > MAX_HISTORY {
                    self.events.pop_front();
                }
            }
            ServerEnvelope::Ack { message } => {
                info!("monitor ack: {message}");
            }
        }
    }

    /// Empties the local history, used by the optimistic clear command.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn transition(&mut self, next: Phase) -> bool {
        if !self.phase.allows(next) {
            debug!(
                "ignoring illegal phase transition {:?} -> {next:?}",
                self.phase
            );
            return false;
        }
        self.phase = next;
        true
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}
