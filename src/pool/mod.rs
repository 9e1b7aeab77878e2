// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The socket pool: the only shared mutable resource in the gateway (spec
//! §5). Grounded in the teacher's `Pool`/`DashMap`-of-sessions shape, but
//! keyed by destination node and holding bare `TcpStream`s rather than
//! logged-in iSCSI sessions — a gateway leg owns its socket exclusively for
//! the leg's lifetime, so there is no per-connection multiplexing to do.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::net::TcpStream;
use tracing::debug;

use crate::{error::TransportError, membership::NodeId};

/// Discipline (spec §5): every leg that reaches dispatch is paired with
/// exactly one of `put` (healthy) or `del` (faulty). A send failure before
/// leg insertion calls `del_node` instead.
#[async_trait]
pub trait SocketPool: Send + Sync {
    /// Acquire a socket to `node`, reusing an idle one if available.
    async fn get(&self, node: &NodeId) -> Result<TcpStream, TransportError>;

    /// Return a healthy socket to the pool.
    fn put(&self, node: &NodeId, sock: TcpStream);

    /// Evict a single faulty socket (simply drop it; nothing to do but make
    /// the call site explicit about *why* the socket is not reused).
    fn del(&self, node: &NodeId, sock: TcpStream);

    /// Evict every pooled socket for `node` (used when a send fails before
    /// any leg was recorded for that node).
    fn del_node(&self, node: &NodeId);
}

/// A `DashMap`-backed pool of idle `TcpStream`s per node, opening a fresh
/// connection on a miss.
pub struct TcpSocketPool {
    idle: DashMap<NodeId, Vec<TcpStream>>,
}

impl Default for TcpSocketPool {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpSocketPool {
    pub fn new() -> Self {
        Self {
            idle: DashMap::new(),
        }
    }
}

#[async_trait]
impl SocketPool for TcpSocketPool {
    async fn get(&self, node: &NodeId) -> Result<TcpStream, TransportError> {
        if let Some(mut idle) = self.idle.get_mut(node)
            && let Some(sock) = idle.pop()
        {
            debug!(%node, "reused pooled socket");
            return Ok(sock);
        }

        debug!(%node, "opening new socket");
        TcpStream::connect(node.addr).await.map_err(|source| TransportError::Io {
            op: "connect",
            source,
        })
    }

    fn put(&self, node: &NodeId, sock: TcpStream) {
        self.idle.entry(node.clone()).or_default().push(sock);
    }

    fn del(&self, node: &NodeId, sock: TcpStream) {
        debug!(%node, "evicting faulty socket");
        drop(sock);
    }

    fn del_node(&self, node: &NodeId) {
        debug!(%node, "evicting all pooled sockets for node");
        self.idle.remove(node);
    }
}
