//! S4 (spec §8): a data-vid-table write with every replica healthy forwards
//! successfully and releases the displaced data object's refcount witness.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use ringgate::{
    cache::NullObjectCache,
    engine::{InMemoryEngine, LocalEngine},
    entrypoints::{EntryPointCtx, write},
    membership::{Epoch, InMemoryMembership, VNode, View},
    pool::TcpSocketPool,
    request::GatewayRequest,
    waiter::RetryPolicy,
    wire::{
        Oid, data_ref_offset, data_vid_offset,
        header::{ObjSubHeader, RequestHeader},
        opcode::ClientOpcode,
    },
};
use zerocopy::{U16, U32, U64};

use super::common::{canned_peer, node};

#[tokio::test]
async fn write_succeeds_and_releases_the_displaced_data_objects_refcount() {
    let local = node(1);
    let remote_a = canned_peer(0, Vec::new()).await;
    let remote_b = canned_peer(0, Vec::new()).await;

    let view = Arc::new(View {
        vnodes: vec![
            VNode { point: 0, node: local.clone() },
            VNode { point: 1, node: remote_a },
            VNode { point: 2, node: remote_b },
        ],
        nodes: [local.clone()].into_iter().collect(),
        epoch: Epoch(1),
    });

    let membership = InMemoryMembership::new((*view).clone(), local);
    let pool = TcpSocketPool::new();
    let engine = InMemoryEngine::new();
    let cache = NullObjectCache;

    let vdi = Oid::vdi(1, false);
    engine.write_object(vdi, b"x", 0, true).await.expect("seed vdi");
    let mut vid_buf = Vec::new();
    vid_buf.extend_from_slice(&7u32.to_be_bytes());
    vid_buf.extend_from_slice(&0u32.to_be_bytes());
    engine.write_object(vdi, &vid_buf, data_vid_offset(0), false).await.expect("seed vids");
    let mut ref_buf = Vec::new();
    ref_buf.extend_from_slice(&1u32.to_be_bytes());
    ref_buf.extend_from_slice(&1u32.to_be_bytes());
    ref_buf.extend_from_slice(&0u32.to_be_bytes());
    ref_buf.extend_from_slice(&0u32.to_be_bytes());
    engine.write_object(vdi, &ref_buf, data_ref_offset(0), false).await.expect("seed refs");

    let mut new_vid_buf = Vec::new();
    new_vid_buf.extend_from_slice(&9u32.to_be_bytes());
    new_vid_buf.extend_from_slice(&0u32.to_be_bytes());

    let header = RequestHeader {
        opcode: ClientOpcode::Write as u8,
        proto_ver: U16::new(1),
        epoch: U64::new(view.epoch.0),
        data_length: U32::new(new_vid_buf.len() as u32),
        obj: ObjSubHeader { oid: U64::new(vdi.0), offset: U64::new(data_vid_offset(0)) },
        ..Default::default()
    };
    let req = GatewayRequest::new(header, Bytes::from(new_vid_buf), view);

    let ctx = EntryPointCtx {
        membership: &membership,
        pool: &pool,
        engine: &engine,
        cache: &cache,
        replica_count: 3,
        policy: RetryPolicy {
            poll_timeout: Duration::from_millis(200),
            max_retry_count: 3,
        },
    };

    let outcome = write(&req, &ctx).await;
    assert!(outcome.is_success());

    // the displaced data object (old vid 7, slot 0) had a (1,1) witness;
    // it must have been consumed exactly once by the post-forward side-effect.
    let displaced = Oid::vid_to_data_oid(7, 0);
    assert!(engine.dec_object_refcnt(displaced, 1, 1).await.is_err());
}
