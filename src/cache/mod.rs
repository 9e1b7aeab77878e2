// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Object cache delegation (spec §4.E step 1 / §4.G `bypass_object_cache`).
//! The cache itself — what it stores and how it's kept coherent — is out of
//! scope; the gateway only needs to know whether to ask it first and how to
//! hand it a request it chooses to own.

use async_trait::async_trait;

use crate::{error::Outcome, request::GatewayRequest, wire::header::ResponseHeader};

/// A cache that can short-circuit a request instead of the gateway going to
/// placement and the network.
#[async_trait]
pub trait ObjectCache: Send + Sync {
    /// True when this request must skip the cache outright (§4.G: readonly
    /// writes, requests already marked `bypass_cache`, or requests the cache
    /// itself injected locally).
    fn bypass(&self, req: &GatewayRequest) -> bool;

    /// Ask the cache to handle `req`. `Ok(Some(_))` is a cache hit the
    /// gateway returns directly to the client; `Ok(None)` is a deliberate
    /// miss that falls through to the normal read/write path.
    async fn handle_request(
        &self,
        req: &GatewayRequest,
    ) -> Result<Option<(ResponseHeader, Vec<u8>)>, Outcome>;
}

/// The cache is disabled by default (spec §1 Non-goals: cache coherence
/// protocol is out of scope). `NullObjectCache` always misses, so every
/// request falls straight through to the read/write path.
#[derive(Default)]
pub struct NullObjectCache;

#[async_trait]
impl ObjectCache for NullObjectCache {
    fn bypass(&self, _req: &GatewayRequest) -> bool {
        true
    }

    async fn handle_request(
        &self,
        _req: &GatewayRequest,
    ) -> Result<Option<(ResponseHeader, Vec<u8>)>, Outcome> {
        Ok(None)
    }
}
