// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Completion waiter (component D): block until every outstanding leg
//! retires, reducing per-leg outcomes into one request outcome.
//!
//! The source drives this with one `poll(2)` array per request; Design
//! Notes §9 explicitly sanctions "a cooperative task per leg" as an
//! equivalent readiness mechanism, so this crate drains a
//! [`FuturesUnordered`] one ready leg at a time instead. The two properties
//! the source requires still hold: exactly one ready leg is retired per
//! iteration, and the per-iteration timeout is epoch-aware.

use std::{collections::HashSet, time::Duration};

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::{
    error::{Outcome, TransportError},
    forward::Leg,
    membership::{Epoch, Membership, NodeId},
    pool::SocketPool,
    wire::header::{RESPONSE_HEADER_LEN, ResponseHeader},
};

/// The source's `POLL_TIMEOUT` / `MAX_RETRY_COUNT` pair.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub poll_timeout: Duration,
    pub max_retry_count: u32,
}

/// Read exactly one response header off `leg`'s socket. A short read or I/O
/// error is reported as [`TransportError`]; the leg is always handed back so
/// the caller can decide put vs. del.
async fn read_one(mut leg: Leg) -> (Leg, Result<ResponseHeader, TransportError>) {
    let mut buf = [0u8; RESPONSE_HEADER_LEN];
    let result = leg.sock.read_exact(&mut buf).await;
    let parsed = match result {
        Ok(n) if n == RESPONSE_HEADER_LEN => {
            ResponseHeader::from_bytes(&buf).map_err(|_| TransportError::ShortRead {
                expected: RESPONSE_HEADER_LEN,
                got: n,
            })
        },
        Ok(n) => Err(TransportError::ShortRead {
            expected: RESPONSE_HEADER_LEN,
            got: n,
        }),
        Err(source) => Err(TransportError::Io {
            op: "read response header",
            source,
        }),
    };
    (leg, parsed)
}

/// Block until every leg in `legs` has retired, returning the reduced
/// outcome (spec §4.D / §7). `epoch` is the epoch the request was admitted
/// under; `membership.need_retry(epoch)` governs whether a poll timeout
/// should be retried or treated as a terminal network error.
pub async fn wait_for_completion(
    legs: Vec<Leg>,
    pool: &dyn SocketPool,
    membership: &dyn Membership,
    epoch: Epoch,
    policy: RetryPolicy,
) -> Outcome {
    let mut remaining: HashSet<NodeId> = legs.iter().map(|l| l.node.clone()).collect();
    let mut pending = FuturesUnordered::new();
    for leg in legs {
        pending.push(read_one(leg));
    }

    let mut outcome = Outcome::Success;
    let mut retries_left = policy.max_retry_count;

    while !pending.is_empty() {
        match tokio::time::timeout(policy.poll_timeout, pending.next()).await {
            Ok(Some((leg, Ok(response)))) => {
                remaining.remove(&leg.node);
                let status = response.status.get();
                if status == 0 {
                    pool.put(&leg.node, leg.sock);
                } else {
                    debug!(node = %leg.node, status, "peer reported non-success");
                    pool.del(&leg.node, leg.sock);
                    outcome = Outcome::Remote(status);
                }
            },
            Ok(Some((leg, Err(_transport_err)))) => {
                remaining.remove(&leg.node);
                pool.del(&leg.node, leg.sock);
                outcome = Outcome::NetworkError;
            },
            Ok(None) => break,
            Err(_elapsed) => {
                if membership.need_retry(epoch) && retries_left > 0 {
                    retries_left -= 1;
                    continue;
                }
                warn!(
                    outstanding = remaining.len(),
                    "poll timeout exhausted; evicting all outstanding legs"
                );
                for node in &remaining {
                    pool.del_node(node);
                }
                drop(pending);
                return Outcome::NetworkError;
            },
        }
    }

    outcome
}
