// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Fan-out dispatcher (component C): build the forwarded header, resolve
//! placement, send to every remote target (running the local leg inline),
//! and reduce the waiter's outcome with whatever was recorded along the way
//! (spec §4.C).

use tokio::io::AsyncWriteExt;
use tracing::{debug, info_span};
use zerocopy::{IntoBytes, U16};

use crate::{
    engine::LocalEngine,
    error::{Outcome, TransportError},
    forward::ForwardContext,
    membership::Membership,
    placement::resolve_vnodes,
    pool::SocketPool,
    request::GatewayRequest,
    waiter::{RetryPolicy, wait_for_completion},
    wire::{header::RequestHeader, opcode::gateway_to_peer_opcode},
};

/// Run the 5-step fan-out contract against `req` and return the reduced
/// outcome. `replica_count` is the placement `k` (spec §4.C / §4.A).
pub async fn forward(
    req: &GatewayRequest,
    membership: &dyn Membership,
    pool: &dyn SocketPool,
    engine: &dyn LocalEngine,
    replica_count: usize,
    policy: RetryPolicy,
) -> Outcome {
    let span = info_span!("forward", oid = req.oid().0, epoch = req.epoch().0, opcode = req.header.opcode);
    let _enter = span.enter();

    let client_op = match req.client_opcode() {
        Ok(op) => op,
        Err(_) => return Outcome::NetworkError,
    };
    let peer_op = gateway_to_peer_opcode(client_op);

    let mut forwarded_header = req.header;
    forwarded_header.opcode = peer_op as u8;
    forwarded_header.proto_ver = U16::new(crate::wire::opcode::PEER_PROTO_VER);

    // Step 2: resolve placement, HALT on empty.
    let targets = resolve_vnodes(&req.view, req.oid(), replica_count);
    if targets.is_empty() {
        return Outcome::Halt;
    }

    let mut ctx = ForwardContext::new();
    let mut outcome = Outcome::Success;
    let mut local_target = None;

    // Step 3: for each target, local is deferred, remote is sent now.
    for vnode in &targets {
        if membership.vnode_is_local(vnode) {
            local_target = Some(());
            continue;
        }

        let node = vnode.node.clone();
        match send_to(&node, &forwarded_header, &req.payload, pool).await {
            Ok(sock) => ctx.push(node, sock),
            Err(_err) => {
                debug!(%node, "send failed, stopping further dispatch");
                outcome = Outcome::NetworkError;
                break;
            },
        }
    }

    // Step 4: run the local leg inline, if present and nothing has failed yet.
    if local_target.is_some() && outcome.is_success() {
        match engine.do_op_work(req).await {
            Ok(_) => {},
            Err(local_err) => outcome = outcome.reduce(local_err),
        }
    }

    // Step 5: wait on whatever legs were appended, reduce with the recorded outcome.
    if ctx.nr_sent() > 0 {
        let legs = ctx.take_all();
        let waited = wait_for_completion(legs, pool, membership, req.epoch(), policy).await;
        outcome = outcome.reduce(waited);
    }

    outcome
}

async fn send_to(
    node: &crate::membership::NodeId,
    header: &RequestHeader,
    payload: &[u8],
    pool: &dyn SocketPool,
) -> Result<tokio::net::TcpStream, TransportError> {
    let mut sock = pool.get(node).await?;
    let mut buf = vec![0u8; crate::wire::header::REQUEST_HEADER_LEN];
    buf.copy_from_slice(header.as_bytes());
    sock.write_all(&buf).await.map_err(|source| TransportError::Io {
        op: "send header",
        source,
    })?;
    if !payload.is_empty() {
        sock.write_all(payload).await.map_err(|source| TransportError::Io {
            op: "send payload",
            source,
        })?;
    }
    Ok(sock)
}
