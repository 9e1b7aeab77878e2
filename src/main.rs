// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use ringgate::{
    cache::NullObjectCache,
    cfg::{cli::resolve_config_path, config::GatewayConfig, logger::init_logger},
    engine::InMemoryEngine,
    membership::{Epoch, InMemoryMembership, NodeId, View},
    pool::TcpSocketPool,
    server::GatewayServer,
    waiter::RetryPolicy,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg_path = resolve_config_path("gateway.yaml").context("failed to resolve config path")?;
    let cfg = GatewayConfig::load_from_file(&cfg_path).context("failed to load gateway config")?;

    let _log_guard = init_logger(&cfg).context("failed to initialize logger")?;

    let self_node = NodeId::new(cfg.cluster.self_node);
    let membership = Arc::new(InMemoryMembership::new(
        View::empty(Epoch(0)),
        self_node.clone(),
    ));

    let server = Arc::new(GatewayServer {
        membership: membership.clone(),
        pool: Arc::new(TcpSocketPool::new()),
        engine: Arc::new(InMemoryEngine::new()),
        cache: Arc::new(NullObjectCache),
        replica_count: cfg.cluster.replica_count,
        policy: RetryPolicy {
            poll_timeout: cfg.cluster.poll_timeout,
            max_retry_count: cfg.cluster.max_retry_count,
        },
    });

    let listener = TcpListener::bind(cfg.cluster.listen_address)
        .await
        .with_context(|| format!("failed to bind {}", cfg.cluster.listen_address))?;
    info!(addr = %cfg.cluster.listen_address, "gateway listening");

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_signal.cancel();
    });

    server.serve(listener, shutdown).await
}
