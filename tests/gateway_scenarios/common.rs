//! Shared fixtures for the end-to-end scenarios: a loopback node identity
//! helper and a couple of canned peer-gateway stand-ins.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use ringgate::membership::NodeId;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn node(port: u16) -> NodeId {
    NodeId::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port))
}

/// A peer that reads one request header (plus payload, if any) and replies
/// with a fixed status/payload, forever.
pub async fn canned_peer(status: u32, response_payload: Vec<u8>) -> NodeId {
    use ringgate::wire::header::{
        ObjSubHeader, REQUEST_HEADER_LEN, RESPONSE_HEADER_LEN, RequestHeader, ResponseHeader,
    };
    use zerocopy::U32;

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            let response_payload = response_payload.clone();
            tokio::spawn(async move {
                let mut hdr_buf = [0u8; REQUEST_HEADER_LEN];
                if sock.read_exact(&mut hdr_buf).await.is_err() {
                    return;
                }
                let header = RequestHeader::from_bytes(&hdr_buf).expect("parse request header");
                let mut payload = vec![0u8; header.data_length.get() as usize];
                if !payload.is_empty() && sock.read_exact(&mut payload).await.is_err() {
                    return;
                }

                let rsp = ResponseHeader {
                    status: U32::new(status),
                    data_length: U32::new(response_payload.len() as u32),
                    obj: ObjSubHeader {
                        oid: header.obj.oid,
                        offset: header.obj.offset,
                    },
                };
                let mut out = [0u8; RESPONSE_HEADER_LEN];
                rsp.to_bytes(&mut out).expect("serialize response header");
                if sock.write_all(&out).await.is_err() {
                    return;
                }
                if !response_payload.is_empty() {
                    let _ = sock.write_all(&response_payload).await;
                }
            });
        }
    });
    NodeId::new(addr)
}

/// A peer that accepts a connection, reads the request, then never replies —
/// used to exercise poll-timeout exhaustion.
pub async fn silent_peer() -> NodeId {
    use ringgate::wire::header::{REQUEST_HEADER_LEN, RequestHeader};

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut hdr_buf = [0u8; REQUEST_HEADER_LEN];
                if sock.read_exact(&mut hdr_buf).await.is_err() {
                    return;
                }
                let header = RequestHeader::from_bytes(&hdr_buf).expect("parse request header");
                let mut payload = vec![0u8; header.data_length.get() as usize];
                if !payload.is_empty() {
                    let _ = sock.read_exact(&mut payload).await;
                }
                // Hold the socket open and never reply.
                std::future::pending::<()>().await;
            });
        }
    });
    NodeId::new(addr)
}

/// A peer whose listener is dropped immediately after accepting, so any read
/// against it fails.
pub async fn dead_peer() -> NodeId {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        loop {
            let Ok((sock, _)) = listener.accept().await else {
                break;
            };
            drop(sock);
        }
    });
    NodeId::new(addr)
}
