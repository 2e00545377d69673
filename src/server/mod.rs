// src/server/mod.rs

//! Listener startup and the node's run loop.

mod listener;
mod stream;
mod tls;

pub use listener::RpcListener;
pub use stream::RpcStream;

use crate::config::{Config, ConfigStore};
use crate::core::handler::{LoggingSink, RpcService, Transfer};
use anyhow::{Context as _, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::info;

/// Starts the plaintext RPC port agents submit to.
///
/// Returns `None` without binding anything when the sub-config is absent
/// or disabled; re-enabling requires a restart, the same as any other
/// config change. A bind failure is fatal, with no fallback address and
/// no retry.
pub async fn start_rpc(
    config: &Config,
    service: Arc<dyn RpcService>,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<Option<RpcListener>> {
    let Some(rpc) = config.rpc.as_ref().filter(|c| c.enabled) else {
        return Ok(None);
    };

    let listener = bind(&rpc.listen).await?;
    info!("rpc listening on {}", rpc.listen);
    Ok(Some(RpcListener::new(
        listener,
        None,
        service,
        shutdown_tx.subscribe(),
        true,
    )))
}

/// Starts the TLS RPC port peer transfer nodes submit to.
///
/// The certificate/key pair must load before anything binds; a bad pair
/// is fatal here rather than a silent fall-back to plaintext.
pub async fn start_rpc_with_tls(
    config: &Config,
    service: Arc<dyn RpcService>,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<Option<RpcListener>> {
    let Some(cfg) = config.rpc_with_tls.as_ref().filter(|c| c.enabled) else {
        return Ok(None);
    };

    let acceptor = tls::build_acceptor(cfg)?;
    let listener = bind(&cfg.listen).await?;
    info!("rpc with TLS listening on {}", cfg.listen);
    Ok(Some(RpcListener::new(
        listener,
        Some(acceptor),
        service,
        shutdown_tx.subscribe(),
        false,
    )))
}

async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to listen on {addr}"))
}

/// Brings up every enabled listener and serves until SIGINT or SIGTERM.
pub async fn run(store: Arc<ConfigStore>) -> Result<()> {
    let config = store.snapshot();
    let service: Arc<dyn RpcService> = Arc::new(Transfer::new(Arc::new(LoggingSink)));
    let (shutdown_tx, _) = broadcast::channel(1);

    let mut listeners = JoinSet::new();
    if let Some(listener) = start_rpc(&config, service.clone(), &shutdown_tx).await? {
        listeners.spawn(listener.run());
    }
    if let Some(listener) = start_rpc_with_tls(&config, service.clone(), &shutdown_tx).await? {
        listeners.spawn(listener.run());
    }
    if listeners.is_empty() {
        info!("no RPC port enabled; nothing to serve");
        return Ok(());
    }

    wait_for_shutdown_signal().await?;

    info!("shutting down, signalling listeners");
    let _ = shutdown_tx.send(());
    while listeners.join_next().await.is_some() {}
    info!("node shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    let mut sigint =
        signal(SignalKind::interrupt()).context("failed to register SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;

    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown"),
        _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown"),
    }
    Ok(())
}
