//! S2 (spec §8): no local replica in placement; the read path samples a
//! random remote start index and walks forward, skipping a dead replica
//! until it lands on one that answers.

use std::sync::Arc;

use bytes::Bytes;
use ringgate::{
    cache::NullObjectCache,
    engine::InMemoryEngine,
    membership::{Epoch, InMemoryMembership, VNode, View},
    pool::TcpSocketPool,
    read_path::read,
    request::GatewayRequest,
    wire::{
        Oid,
        header::{ObjSubHeader, RequestHeader},
        opcode::{ClientOpcode, PROTO_VER_TRIM_ZERO_SECTORS},
    },
};
use zerocopy::{U16, U32, U64};

use super::common::{dead_peer, canned_peer, node};

#[tokio::test]
async fn a_dead_replica_does_not_stop_the_scan_from_finding_a_live_one() {
    let payload = b"fan-out payload".to_vec();
    let dead = dead_peer().await;
    let live_a = canned_peer(0, payload.clone()).await;
    let live_b = canned_peer(0, payload.clone()).await;

    let view = Arc::new(View {
        vnodes: vec![
            VNode { point: 0, node: dead },
            VNode { point: 1, node: live_a },
            VNode { point: 2, node: live_b },
        ],
        nodes: Default::default(),
        epoch: Epoch(1),
    });

    // No node in the view is the local identity, so placement never picks
    // the local leg (Step 3 is skipped entirely).
    let membership = InMemoryMembership::new((*view).clone(), node(999));
    let pool = TcpSocketPool::new();
    let engine = InMemoryEngine::new();
    let cache = NullObjectCache;

    let header = RequestHeader {
        opcode: ClientOpcode::Read as u8,
        proto_ver: U16::new(PROTO_VER_TRIM_ZERO_SECTORS),
        epoch: U64::new(view.epoch.0),
        data_length: U32::new(payload.len() as u32),
        obj: ObjSubHeader { oid: U64::new(Oid(1).0), offset: U64::new(0) },
        ..Default::default()
    };
    let mut req = GatewayRequest::new(header, Bytes::new(), view);

    let got = read(&mut req, &cache, &membership, &pool, &engine, 3)
        .await
        .expect("scan lands on a live replica");
    assert_eq!(got, payload);
}
