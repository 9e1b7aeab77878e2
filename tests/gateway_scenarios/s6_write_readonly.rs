//! S6 (spec §8): a write against a read-only OID is rejected before
//! placement is even resolved — an empty view proves the rejection happens
//! first, since a placement lookup against it would otherwise HALT rather
//! than report read-only.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use ringgate::{
    cache::NullObjectCache,
    engine::InMemoryEngine,
    entrypoints::{EntryPointCtx, write},
    error::Outcome,
    membership::{Epoch, InMemoryMembership, View},
    pool::TcpSocketPool,
    request::GatewayRequest,
    waiter::RetryPolicy,
    wire::{
        Oid,
        header::{ObjSubHeader, RequestHeader},
        opcode::ClientOpcode,
    },
};
use zerocopy::{U16, U32, U64};

use super::common::node;

#[tokio::test]
async fn write_to_a_readonly_oid_is_rejected_ahead_of_placement() {
    let view = Arc::new(View::empty(Epoch(1)));
    let membership = InMemoryMembership::new((*view).clone(), node(1));
    let pool = TcpSocketPool::new();
    let engine = InMemoryEngine::new();
    let cache = NullObjectCache;

    let oid = Oid::vdi(1, true);
    let header = RequestHeader {
        opcode: ClientOpcode::Write as u8,
        proto_ver: U16::new(1),
        epoch: U64::new(view.epoch.0),
        data_length: U32::new(4),
        obj: ObjSubHeader { oid: U64::new(oid.0), offset: U64::new(0) },
        ..Default::default()
    };
    let req = GatewayRequest::new(header, Bytes::from_static(b"nope"), view);

    let ctx = EntryPointCtx {
        membership: &membership,
        pool: &pool,
        engine: &engine,
        cache: &cache,
        replica_count: 1,
        policy: RetryPolicy {
            poll_timeout: Duration::from_millis(50),
            max_retry_count: 1,
        },
    };

    assert_eq!(write(&req, &ctx).await, Outcome::Readonly);
}
