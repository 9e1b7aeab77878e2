// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The gateway's in-flight request: header, response header, payload, the
//! view it was admitted under, and the flags that steer cache/local
//! handling (spec §3 "Request").

use std::sync::Arc;

use bytes::Bytes;

use crate::{
    membership::{Epoch, View},
    wire::{
        Oid,
        header::{RequestHeader, ResponseHeader},
        opcode::{ClientOpcode, UnknownOpcode},
    },
};

/// One client request plus everything the gateway pipeline needs to carry
/// it through placement, dispatch, and reply.
pub struct GatewayRequest {
    pub header: RequestHeader,
    pub response: ResponseHeader,
    pub payload: Bytes,
    /// The ring snapshot this request was admitted under. Borrowed for the
    /// request's whole lifetime; never re-read (Design Notes §9).
    pub view: Arc<View>,
    /// Set when this request was injected locally (e.g. by the object
    /// cache re-entering the gateway) and must not re-enter the cache.
    pub local: bool,
    /// Set to skip the object cache even on a fresh client request.
    pub bypass_cache: bool,
}

impl GatewayRequest {
    pub fn new(header: RequestHeader, payload: Bytes, view: Arc<View>) -> Self {
        Self {
            header,
            response: ResponseHeader::default(),
            payload,
            view,
            local: false,
            bypass_cache: false,
        }
    }

    pub fn client_opcode(&self) -> Result<ClientOpcode, UnknownOpcode> {
        ClientOpcode::try_from(self.header.opcode)
    }

    pub fn oid(&self) -> Oid {
        Oid(self.header.obj.oid.get())
    }

    pub fn offset(&self) -> u64 {
        self.header.obj.offset.get()
    }

    pub fn data_length(&self) -> usize {
        self.header.data_length.get() as usize
    }

    pub fn epoch(&self) -> Epoch {
        Epoch(self.header.epoch.get())
    }
}
