// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Write entry-points (component G): the opcode-specific wrappers that pick
//! cache vs. direct forward and attach the refcount side-effect to data-vid
//! updates (spec §4.G).

use tracing::info_span;

use crate::{
    cache::ObjectCache,
    dispatch::forward,
    engine::LocalEngine,
    error::Outcome,
    membership::Membership,
    pool::SocketPool,
    refcount,
    request::GatewayRequest,
    waiter::RetryPolicy,
};

/// Shared parameters every entry point needs to dispatch a request.
pub struct EntryPointCtx<'a> {
    pub membership: &'a dyn Membership,
    pub pool: &'a dyn SocketPool,
    pub engine: &'a dyn LocalEngine,
    pub cache: &'a dyn ObjectCache,
    pub replica_count: usize,
    pub policy: RetryPolicy,
}

/// `write(req)`: rejects read-only OIDs, otherwise forwards and applies the
/// refcount side-effect on a successful data-vid update.
pub async fn write(req: &GatewayRequest, ctx: &EntryPointCtx<'_>) -> Outcome {
    let _span = info_span!("write", oid = req.oid().0).entered();

    if req.oid().is_readonly() {
        return Outcome::Readonly;
    }

    if !req.bypass_cache
        && !ctx.cache.bypass(req)
        && let Ok(Some((response, _data))) = ctx.cache.handle_request(req).await
    {
        let status = response.status.get();
        return if status == 0 { Outcome::Success } else { Outcome::Remote(status) };
    }

    let oid = req.oid();
    let is_vid_update = refcount::is_data_vid_update(req.offset(), req.data_length());
    let snapshot = if is_vid_update {
        match refcount::snapshot(ctx.engine, oid, req.offset(), req.data_length()).await {
            Ok(s) => Some(s),
            Err(err) => return err,
        }
    } else {
        None
    };

    let outcome = forward(
        req,
        ctx.membership,
        ctx.pool,
        ctx.engine,
        ctx.replica_count,
        ctx.policy,
    )
    .await;

    if outcome.is_success()
        && let Some(snap) = snapshot
    {
        refcount::apply(ctx.engine, oid, &req.payload, snap).await;
    }

    outcome
}

/// `create_and_write(req)`: same as [`write`] but never attaches the
/// refcount side-effect (the object is new; there is nothing displaced).
pub async fn create_and_write(req: &GatewayRequest, ctx: &EntryPointCtx<'_>) -> Outcome {
    let _span = info_span!("create_and_write", oid = req.oid().0).entered();

    if req.oid().is_readonly() {
        return Outcome::Readonly;
    }

    forward(
        req,
        ctx.membership,
        ctx.pool,
        ctx.engine,
        ctx.replica_count,
        ctx.policy,
    )
    .await
}

/// `remove(req)`: plain forward, no cache, no refcount side-effect.
pub async fn remove(req: &GatewayRequest, ctx: &EntryPointCtx<'_>) -> Outcome {
    let _span = info_span!("remove", oid = req.oid().0).entered();
    forward(
        req,
        ctx.membership,
        ctx.pool,
        ctx.engine,
        ctx.replica_count,
        ctx.policy,
    )
    .await
}

/// `decref(req)`: plain forward, no cache, no refcount side-effect.
pub async fn decref(req: &GatewayRequest, ctx: &EntryPointCtx<'_>) -> Outcome {
    let _span = info_span!("decref", oid = req.oid().0).entered();
    forward(
        req,
        ctx.membership,
        ctx.pool,
        ctx.engine,
        ctx.replica_count,
        ctx.policy,
    )
    .await
}
