use serde::{Deserialize, Serialize};

/// One observed occurrence relayed by the monitor service.
///
/// The record is server-defined and relayed verbatim; the client never
/// inspects or validates its content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct MonitorEvent(pub serde_json::Value);

/// Server-reported snapshot of remote connectivity.
///
/// Owned entirely by the server. Replaced wholesale on every `stats`
/// envelope, never merged field by field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct ConnectionStatus(pub serde_json::Value);

/// Server-reported message aggregates.
///
/// Same ownership rule as [`ConnectionStatus`]: replace wholesale, clear on
/// disconnect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct MessageStats(pub serde_json::Value);

/// Joint payload of a `stats` envelope.
///
/// Stats and connection status always travel together so the client can
/// apply them as one atomic update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsPayload {
    pub stats: MessageStats,
    pub connection_status: ConnectionStatus,
}

/// Inbound wire envelope from the monitor service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEnvelope {
    /// Full event list replacing local history verbatim.
    History { events: Vec<MonitorEvent> },
    /// Atomic stats and connection status update.
    Stats { data: StatsPayload },
    /// Single new event appended to history.
    Event { event: MonitorEvent },
    /// Human-readable confirmation, logged only.
    Ack { message: String },
}

/// Outbound command frame sent to the monitor service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    ClearHistory,
    ResetStats,
}

impl ServerEnvelope {
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientCommand {
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
