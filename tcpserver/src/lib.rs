//! Single-exchange TCP message server.
//!
//! Accepts TCP connections, reads one fixed-format binary request,
//! routes it to an account or chat handler, writes one binary response and
//! closes the connection.
//!
//! # Architecture
//!
//! ```text
//! Multiplexer (poll readiness loop, session slots, checkpoints)
//! └── FSM Dispatcher (one run per ready connection)
//!     ├── Wire Codec (header + TLV body decode, status envelope encode)
//!     └── Command Dispatch (ordered account / chat tables)
//! ```
//!
//! The whole pipeline is single-threaded: a connection selected as ready is
//! driven to completion before the next one is looked at.

/// Environment configuration
pub mod config;

/// Binary wire protocol: header, TLV bodies, status envelopes
pub mod protocol;

/// Table-driven request state machine
pub mod fsm;

/// Command dispatch tables and business handlers
pub mod handler;

/// Connection multiplexer and manager handshake
pub mod service;

#[cfg(test)]
mod tests;

pub use config::{validate_config, ServerConfig};
pub use protocol::{Body, Header, MsgType, StatusCode};
pub use service::{Multiplexer, REJECT_MESSAGE};
