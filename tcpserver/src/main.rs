//! TCP message server entry point.
//!
//! Environment variables (optionally via `.env`):
//! - `tcp_host` / `tcp_port`: listen address (default `0.0.0.0:8081`)
//! - `manager_host` / `manager_port`: manager endpoint (default `127.0.0.1:8082`)
//! - `redis_host` / `redis_port`: counter store (default `127.0.0.1:6379`)
//! - `max_clients`: client slot capacity (default 32)
//! - `sync_interval_ms`: poll timeout / checkpoint interval (default 3000)

use std::net::TcpListener;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{info, warn};

use shared::store::RedisCounterStore;
use tcpserver::config::{validate_config, ServerConfig};
use tcpserver::service::{manager, Multiplexer};

fn main() -> Result<()> {
    shared::logging::init();

    let config = ServerConfig::from_env()?;
    validate_config(&config)?;

    info!("=== TCP message server ===");
    info!("listen:  {}", config.bind_address());
    info!("manager: {}", config.manager_address());
    info!("store:   {}", config.redis_address());
    info!("==========================");

    // Shutdown token, set from the signal handler and polled once per
    // multiplexer pass.
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .context("failed to install signal handler")?;
    }

    let store = RedisCounterStore::open(&config.redis_address())
        .context("failed to open counter store")?;

    let listener =
        TcpListener::bind(config.bind_address()).context("failed to bind TCP listener")?;
    info!("listening on {}", config.bind_address());

    let mut multiplexer = Multiplexer::new(
        listener,
        Box::new(store),
        shutdown,
        config.max_clients,
        config.sync_interval_ms,
    )?;

    match manager::announce(&config.manager_address(), multiplexer.user_count()) {
        Ok(()) => info!("announced to manager at {}", config.manager_address()),
        Err(err) => warn!(%err, "manager handshake failed, continuing without it"),
    }

    multiplexer.run()
}
