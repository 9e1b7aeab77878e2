//! S1 (spec §8): a read whose placement includes the local node returns
//! straight from the local engine, with no socket ever touched.

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

use super::common::node;

#[tokio::test]
async fn read_with_local_placement_is_served_from_the_local_engine() {
    let local = node(1);
    let view = Arc::new(View {
        vnodes: vec![VNode { point: 0, node: local.clone() }],
        nodes: [local.clone()].into_iter().collect(),
        epoch: Epoch(1),
    });

    let membership = InMemoryMembership::new((*view).clone(), local);
    let pool = TcpSocketPool::new();
    let engine = InMemoryEngine::new();
    engine.seed(Oid(1), b"the quick brown fox".to_vec()).await;
    let cache = NullObjectCache;

    let header = RequestHeader {
        opcode: ClientOpcode::Read as u8,
        proto_ver: U16::new(PROTO_VER_TRIM_ZERO_SECTORS),
        epoch: U64::new(view.epoch.0),
        data_length: U32::new(19),
        obj: ObjSubHeader { oid: U64::new(Oid(1).0), offset: U64::new(0) },
        ..Default::default()
    };
    let mut req = GatewayRequest::new(header, Bytes::new(), view);

    let got = read(&mut req, &cache, &membership, &pool, &engine, 1)
        .await
        .expect("local hit succeeds");
    assert_eq!(got, b"the quick brown fox");
}
