// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The local on-disk object engine is out of scope (spec §1), but the
//! dispatcher, read path, and refcount side-effect all call into it, so this
//! module defines the trait boundary plus one realistic in-memory
//! implementation good enough to drive the end-to-end scenarios in
//! spec §8.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use zerocopy::U32;

use crate::{
    error::Outcome,
    request::GatewayRequest,
    wire::{
        Oid,
        header::{ObjSubHeader, ResponseHeader},
        opcode::ClientOpcode,
    },
};

/// The local on-disk object engine's interface, as the gateway sees it:
/// `peer_read_obj`, `sheep_do_op_work`, and the read/write/decref primitives
/// the refcount side-effect (§4.F) needs directly.
#[async_trait]
pub trait LocalEngine: Send + Sync {
    /// Perform the read described by `req` against the local replica.
    async fn peer_read_obj(&self, req: &GatewayRequest) -> Result<(ResponseHeader, Vec<u8>), Outcome>;

    /// Perform `req`'s opcode (write / create+write / remove / decref)
    /// against the local replica.
    async fn do_op_work(&self, req: &GatewayRequest) -> Result<(ResponseHeader, Vec<u8>), Outcome>;

    async fn read_object(&self, oid: Oid, len: usize, offset: u64) -> Result<Vec<u8>, Outcome>;

    async fn write_object(
        &self,
        oid: Oid,
        data: &[u8],
        offset: u64,
        create: bool,
    ) -> Result<(), Outcome>;

    async fn dec_object_refcnt(
        &self,
        oid: Oid,
        generation: u32,
        count: u32,
    ) -> Result<(), Outcome>;
}

#[derive(Default, Clone)]
struct StoredObject {
    data: Vec<u8>,
    refs: HashMap<(u32, u32), u32>,
}

/// An in-memory stand-in for the real on-disk engine: objects are flat byte
/// buffers keyed by [`Oid`], refcounts are tracked per `(generation, count)`
/// witness. Good enough to exercise the gateway end-to-end without a real
/// cluster.
pub struct InMemoryEngine {
    objects: Mutex<HashMap<Oid, StoredObject>>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Test/seed helper: install an object's bytes directly.
    pub async fn seed(&self, oid: Oid, data: Vec<u8>) {
        self.objects.lock().await.entry(oid).or_default().data = data;
    }

    pub async fn snapshot(&self, oid: Oid) -> Option<Vec<u8>> {
        self.objects.lock().await.get(&oid).map(|o| o.data.clone())
    }
}

#[async_trait]
impl LocalEngine for InMemoryEngine {
    async fn peer_read_obj(
        &self,
        req: &GatewayRequest,
    ) -> Result<(ResponseHeader, Vec<u8>), Outcome> {
        let data = self
            .read_object(req.oid(), req.data_length(), req.offset())
            .await?;
        let rsp = ResponseHeader {
            status: U32::new(0),
            data_length: U32::new(data.len() as u32),
            obj: ObjSubHeader {
                oid: req.header.obj.oid,
                offset: req.header.obj.offset,
            },
        };
        Ok((rsp, data))
    }

    async fn do_op_work(
        &self,
        req: &GatewayRequest,
    ) -> Result<(ResponseHeader, Vec<u8>), Outcome> {
        let op = req.client_opcode().map_err(|_| Outcome::NetworkError)?;
        match op {
            ClientOpcode::Read => self.peer_read_obj(req).await,
            ClientOpcode::Write => {
                self.write_object(req.oid(), &req.payload, req.offset(), false)
                    .await?;
                Ok((ResponseHeader::default(), Vec::new()))
            },
            ClientOpcode::CreateAndWrite => {
                self.write_object(req.oid(), &req.payload, req.offset(), true)
                    .await?;
                Ok((ResponseHeader::default(), Vec::new()))
            },
            ClientOpcode::Remove => {
                self.objects.lock().await.remove(&req.oid());
                Ok((ResponseHeader::default(), Vec::new()))
            },
            ClientOpcode::Decref => {
                // Payload carries a single GenerationRef witness to release.
                if req.payload.len() < 8 {
                    return Err(Outcome::NetworkError);
                }
                let generation = u32::from_be_bytes(req.payload[0..4].try_into().expect("4 bytes"));
                let count = u32::from_be_bytes(req.payload[4..8].try_into().expect("4 bytes"));
                self.dec_object_refcnt(req.oid(), generation, count).await?;
                Ok((ResponseHeader::default(), Vec::new()))
            },
        }
    }

    async fn read_object(&self, oid: Oid, len: usize, offset: u64) -> Result<Vec<u8>, Outcome> {
        let objects = self.objects.lock().await;
        let obj = objects.get(&oid).ok_or(Outcome::Remote(1))?;
        let start = offset as usize;
        let end = (start + len).min(obj.data.len());
        if start > obj.data.len() {
            return Ok(Vec::new());
        }
        Ok(obj.data[start..end].to_vec())
    }

    async fn write_object(
        &self,
        oid: Oid,
        data: &[u8],
        offset: u64,
        create: bool,
    ) -> Result<(), Outcome> {
        let mut objects = self.objects.lock().await;
        if !create && !objects.contains_key(&oid) {
            return Err(Outcome::Remote(1));
        }
        let obj = objects.entry(oid).or_default();
        let start = offset as usize;
        let end = start + data.len();
        if obj.data.len() < end {
            obj.data.resize(end, 0);
        }
        obj.data[start..end].copy_from_slice(data);
        Ok(())
    }

    async fn dec_object_refcnt(
        &self,
        oid: Oid,
        generation: u32,
        count: u32,
    ) -> Result<(), Outcome> {
        let mut objects = self.objects.lock().await;
        let obj = objects.entry(oid).or_default();
        let entry = obj.refs.entry((generation, count)).or_insert(count);
        if *entry == 0 {
            return Err(Outcome::Remote(2));
        }
        *entry -= 1;
        Ok(())
    }
}
