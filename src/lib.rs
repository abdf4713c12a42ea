//! Realtime client for the monitor event stream.
//!
//! The crate keeps a UI-facing store synchronized with a possibly-unreliable
//! websocket endpoint, reconnecting transparently and applying a strict
//! eviction policy to the buffered event history:
//! - `client`: websocket transport, reconnect handling, and command sender.
//! - `proto`: protocol envelopes shared with the monitor service.
//! - `state`: connection state machine and the derived event/stats store.

/// Websocket connection, reconnect worker, and observation handle.
pub mod client;
/// Monitor protocol envelopes and opaque payloads.
pub mod proto;
/// Connection state machine and derived store.
pub mod state;
