// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Read path (component E): a read goes to exactly one replica — prefer
//! local, else a randomly chosen remote, with a legacy trim-zero
//! compatibility tail (spec §4.E).

use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info_span};
use zerocopy::IntoBytes;

use crate::{
    cache::ObjectCache,
    engine::LocalEngine,
    error::Outcome,
    membership::Membership,
    placement::resolve_vnodes,
    pool::SocketPool,
    request::GatewayRequest,
    wire::{
        header::{REQUEST_HEADER_LEN, RESPONSE_HEADER_LEN, RequestHeader, ResponseHeader},
        opcode::{PROTO_VER_TRIM_ZERO_SECTORS, gateway_to_peer_opcode},
    },
};

/// Run the read-path contract against `req`. On success, fills `req.response`
/// and returns the payload; on failure returns the last observed error.
pub async fn read(
    req: &mut GatewayRequest,
    cache: &dyn ObjectCache,
    membership: &dyn Membership,
    pool: &dyn SocketPool,
    engine: &dyn LocalEngine,
    replica_count: usize,
) -> Result<Vec<u8>, Outcome> {
    let span = info_span!("read", oid = req.oid().0, epoch = req.epoch().0);
    let _enter = span.enter();

    // Step 1: cache delegation.
    if !cache.bypass(req)
        && let Some((response, data)) = cache.handle_request(req).await?
    {
        req.response = response;
        return Ok(data);
    }

    // Step 2: resolve placement.
    let targets = resolve_vnodes(&req.view, req.oid(), replica_count);
    if targets.is_empty() {
        return Err(Outcome::Halt);
    }

    // Step 3: local attempt, no fallback on failure (spec's specified, if
    // surprising, behavior — see Design Notes §9 Open Questions).
    if let Some(local) = targets.iter().find(|v| membership.vnode_is_local(v)) {
        let _ = local;
        let (response, data) = engine.peer_read_obj(req).await?;
        req.response = response;
        return Ok(inflate_if_legacy(req, data));
    }

    // Step 4: random remote scan.
    let client_op = req.client_opcode().map_err(|_| Outcome::NetworkError)?;
    let peer_op = gateway_to_peer_opcode(client_op);

    let mut forwarded_header = req.header;
    forwarded_header.opcode = peer_op as u8;

    let start = rand::rng().random_range(0..targets.len());
    let mut last_err = Outcome::NetworkError;
    for step in 0..targets.len() {
        let vnode = &targets[(start + step) % targets.len()];
        match exec_req(&vnode.node, &forwarded_header, &req.payload, pool).await {
            Ok((response, data)) => {
                req.response = response;
                return Ok(inflate_if_legacy(req, data));
            },
            Err(err) => {
                debug!(node = %vnode.node, "remote read attempt failed");
                last_err = err;
            },
        }
    }

    Err(last_err)
}

/// Synchronous (single round-trip) send-then-receive against one remote,
/// mirroring the source's `sheep_exec_req`.
async fn exec_req(
    node: &crate::membership::NodeId,
    header: &RequestHeader,
    payload: &[u8],
    pool: &dyn SocketPool,
) -> Result<(ResponseHeader, Vec<u8>), Outcome> {
    let mut sock = pool.get(node).await.map_err(Outcome::from)?;

    let mut buf = vec![0u8; REQUEST_HEADER_LEN];
    buf.copy_from_slice(header.as_bytes());
    if sock.write_all(&buf).await.is_err() || (!payload.is_empty() && sock.write_all(payload).await.is_err()) {
        pool.del(node, sock);
        return Err(Outcome::NetworkError);
    }

    let mut hdr_buf = [0u8; RESPONSE_HEADER_LEN];
    if sock.read_exact(&mut hdr_buf).await.is_err() {
        pool.del(node, sock);
        return Err(Outcome::NetworkError);
    }
    let response = match ResponseHeader::from_bytes(&hdr_buf) {
        Ok(r) => r,
        Err(_) => {
            pool.del(node, sock);
            return Err(Outcome::NetworkError);
        },
    };

    let data_len = response.data_length.get() as usize;
    let mut data = vec![0u8; data_len];
    if data_len > 0 && sock.read_exact(&mut data).await.is_err() {
        pool.del(node, sock);
        return Err(Outcome::NetworkError);
    }

    if response.status.get() != 0 {
        pool.put(node, sock);
        return Err(Outcome::Remote(response.status.get()));
    }

    pool.put(node, sock);
    Ok((response, data))
}

/// Step 5: legacy clients (proto_ver below [`PROTO_VER_TRIM_ZERO_SECTORS`])
/// expect the full requested length with trimmed zero regions re-inflated.
fn inflate_if_legacy(req: &mut GatewayRequest, data: Vec<u8>) -> Vec<u8> {
    if req.header.proto_ver.get() >= PROTO_VER_TRIM_ZERO_SECTORS {
        return data;
    }

    let wanted = req.data_length();
    if data.len() >= wanted {
        return data;
    }

    let mut inflated = vec![0u8; wanted];
    let start = (req.response.obj.offset.get() - req.offset()) as usize;
    let end = (start + data.len()).min(wanted);
    inflated[start..end].copy_from_slice(&data[..end - start]);

    req.response.data_length = zerocopy::U32::new(wanted as u32);
    req.response.obj.offset = zerocopy::U64::new(0);
    inflated
}
