// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Gateway server loop (component L): accept TCP connections, decode one
//! request at a time per connection, route to the read path or a write
//! entry-point, and write the response back (spec §4.L).
//!
//! One connection is handled by one spawned task; within a connection,
//! requests are handled sequentially — matching §5's "no intra-request
//! parallelism" model, while distinct connections run concurrently.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    cache::ObjectCache,
    engine::LocalEngine,
    entrypoints::{self, EntryPointCtx},
    error::Outcome,
    membership::Membership,
    pool::SocketPool,
    read_path,
    request::GatewayRequest,
    waiter::RetryPolicy,
    wire::{
        header::{REQUEST_HEADER_LEN, RequestHeader, ResponseHeader},
        opcode::ClientOpcode,
    },
};

/// Everything a running gateway needs, shared across every connection task.
pub struct GatewayServer {
    pub membership: Arc<dyn Membership>,
    pub pool: Arc<dyn SocketPool>,
    pub engine: Arc<dyn LocalEngine>,
    pub cache: Arc<dyn ObjectCache>,
    pub replica_count: usize,
    pub policy: RetryPolicy,
}

impl GatewayServer {
    /// Accept connections on `listener` until `shutdown` is cancelled.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (sock, peer) = accepted.context("accept failed")?;
                    let server = Arc::clone(&self);
                    let conn_shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(err) = server.handle_connection(sock, conn_shutdown).await {
                            warn!(%peer, ?err, "connection closed with error");
                        }
                    });
                }
            }
        }
    }

    async fn handle_connection(&self, mut sock: TcpStream, shutdown: CancellationToken) -> Result<()> {
        loop {
            let mut hdr_buf = [0u8; REQUEST_HEADER_LEN];
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                result = sock.read_exact(&mut hdr_buf) => {
                    match result {
                        Ok(_) => {},
                        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                        Err(err) => return Err(err).context("reading request header"),
                    }
                }
            }

            let header = RequestHeader::from_bytes(&hdr_buf).context("parsing request header")?;
            let mut payload = vec![0u8; header.data_length.get() as usize];
            if !payload.is_empty() {
                sock.read_exact(&mut payload).await.context("reading request payload")?;
            }

            let view = self.membership.current_view();
            let mut req = GatewayRequest::new(header, payload.into(), view);

            let (response, body) = self.handle_request(&mut req).await;
            let mut out = vec![0u8; crate::wire::header::RESPONSE_HEADER_LEN];
            response.to_bytes(&mut out).context("serializing response header")?;
            sock.write_all(&out).await.context("writing response header")?;
            if !body.is_empty() {
                sock.write_all(&body).await.context("writing response payload")?;
            }
        }
    }

    async fn handle_request(&self, req: &mut GatewayRequest) -> (ResponseHeader, Vec<u8>) {
        let Ok(op) = req.client_opcode() else {
            return (status_only(1), Vec::new());
        };

        debug!(?op, oid = req.oid().0, "dispatching request");

        if op == ClientOpcode::Read {
            return match read_path::read(
                req,
                self.cache.as_ref(),
                self.membership.as_ref(),
                self.pool.as_ref(),
                self.engine.as_ref(),
                self.replica_count,
            )
            .await
            {
                Ok(data) => (req.response, data),
                Err(outcome) => (status_only(outcome_code(outcome)), Vec::new()),
            };
        }

        let ctx = EntryPointCtx {
            membership: self.membership.as_ref(),
            pool: self.pool.as_ref(),
            engine: self.engine.as_ref(),
            cache: self.cache.as_ref(),
            replica_count: self.replica_count,
            policy: self.policy,
        };

        let outcome = match op {
            ClientOpcode::Write => entrypoints::write(req, &ctx).await,
            ClientOpcode::CreateAndWrite => entrypoints::create_and_write(req, &ctx).await,
            ClientOpcode::Remove => entrypoints::remove(req, &ctx).await,
            ClientOpcode::Decref => entrypoints::decref(req, &ctx).await,
            ClientOpcode::Read => unreachable!("handled above"),
        };

        (status_only(outcome_code(outcome)), Vec::new())
    }
}

fn outcome_code(outcome: Outcome) -> u32 {
    match outcome {
        Outcome::Success => 0,
        Outcome::Readonly => 1,
        Outcome::Halt => 2,
        Outcome::NetworkError => 3,
        Outcome::Remote(code) => code,
    }
}

fn status_only(status: u32) -> ResponseHeader {
    ResponseHeader {
        status: zerocopy::U32::new(status),
        ..Default::default()
    }
}
