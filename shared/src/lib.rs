//! Shared infrastructure for the message server workspace.
//!
//! - **store**: persistent counter store used to checkpoint the aggregate
//!   user count across restarts
//! - **logging**: tracing subscriber bootstrap

pub mod logging;
pub mod store;

pub use store::{CounterStore, MemoryCounterStore, RedisCounterStore, StoreError, USER_COUNT_KEY};
