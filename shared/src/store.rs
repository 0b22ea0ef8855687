//! Persistent counter store.
//!
//! The server keeps one aggregate number across restarts: the total user
//! count. The multiplexer loads it at startup and checkpoints it back on
//! idle poll timeouts and on shutdown. Everything behind [`CounterStore`]
//! is an external collaborator; the production implementation rides on a
//! synchronous redis connection, and tests use the in-memory variant.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use redis::Commands;
use thiserror::Error;
use tracing::debug;

/// The one key the server persists.
pub const USER_COUNT_KEY: &str = "meta_user:count";

/// Errors reported by counter store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connect(String),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Narrow interface over the persistent key-value store.
///
/// Implementations only need to round-trip an unsigned counter under a
/// fixed key; a missing key reads as zero.
pub trait CounterStore: Send {
    fn get_counter(&mut self, key: &str) -> Result<u32, StoreError>;

    fn put_counter(&mut self, key: &str, value: u32) -> Result<(), StoreError>;

    /// Releases the underlying handle. The default is a no-op for stores
    /// whose connections close on drop.
    fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Redis-backed counter store.
pub struct RedisCounterStore {
    conn: redis::Connection,
}

impl RedisCounterStore {
    /// Opens a connection to the redis instance at `url`
    /// (e.g. `redis://127.0.0.1:6379`).
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Connect(e.to_string()))?;
        let conn = client
            .get_connection()
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        debug!(url, "counter store opened");
        Ok(Self { conn })
    }
}

impl CounterStore for RedisCounterStore {
    fn get_counter(&mut self, key: &str) -> Result<u32, StoreError> {
        let value: Option<u32> = self.conn.get(key)?;
        Ok(value.unwrap_or(0))
    }

    fn put_counter(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        self.conn.set::<_, _, ()>(key, value)?;
        Ok(())
    }
}

/// In-memory counter store for tests.
///
/// The backing cell is shared, so a test can keep a handle and observe
/// checkpoints written by the server loop.
#[derive(Default)]
pub struct MemoryCounterStore {
    cell: Arc<AtomicU32>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle onto the stored value, alive independently of the store.
    pub fn handle(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.cell)
    }
}

impl CounterStore for MemoryCounterStore {
    fn get_counter(&mut self, _key: &str) -> Result<u32, StoreError> {
        Ok(self.cell.load(Ordering::SeqCst))
    }

    fn put_counter(&mut self, _key: &str, value: u32) -> Result<(), StoreError> {
        self.cell.store(value, Ordering::SeqCst);
        Ok(())
    }
}
