//! Service layer: the connection multiplexer and the manager handshake.

pub mod manager;
pub mod multiplexer;

pub use multiplexer::{Multiplexer, REJECT_MESSAGE};
