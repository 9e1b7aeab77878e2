//! S5 (spec §8): one remote leg never answers. With the epoch stable
//! throughout, the waiter retries up to `max_retry_count` times and then
//! gives up with a network error; the write is not treated as having
//! succeeded.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use ringgate::{
    cache::NullObjectCache,
    engine::{InMemoryEngine, LocalEngine},
    entrypoints::{EntryPointCtx, write},
    error::Outcome,
    membership::{Epoch, InMemoryMembership, VNode, View},
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

use super::common::{node, silent_peer};

#[tokio::test]
async fn a_silent_remote_times_out_the_write_as_a_network_error() {
    let local = node(1);
    let remote = silent_peer().await;

    let view = Arc::new(View {
        vnodes: vec![
            VNode { point: 0, node: local.clone() },
            VNode { point: 1, node: remote },
        ],
        nodes: [local.clone()].into_iter().collect(),
        epoch: Epoch(1),
    });

    let membership = InMemoryMembership::new((*view).clone(), local);
    let pool = TcpSocketPool::new();
    let engine = InMemoryEngine::new();
    engine.write_object(Oid(1), b"before", 0, true).await.expect("seed");
    let cache = NullObjectCache;

    let header = RequestHeader {
        opcode: ClientOpcode::Write as u8,
        proto_ver: U16::new(1),
        epoch: U64::new(view.epoch.0),
        data_length: U32::new(6),
        obj: ObjSubHeader { oid: U64::new(Oid(1).0), offset: U64::new(0) },
        ..Default::default()
    };
    let req = GatewayRequest::new(header, Bytes::from_static(b"after!"), view);

    let ctx = EntryPointCtx {
        membership: &membership,
        pool: &pool,
        engine: &engine,
        cache: &cache,
        replica_count: 2,
        // Kept small so the test finishes quickly: 2 retries * 20ms.
        policy: RetryPolicy {
            poll_timeout: Duration::from_millis(20),
            max_retry_count: 2,
        },
    };

    let outcome = write(&req, &ctx).await;
    assert_eq!(outcome, Outcome::NetworkError);
}
