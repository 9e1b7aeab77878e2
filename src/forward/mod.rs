// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-request forward-context: the bounded collection of outstanding
//! remote legs (component B), modeled on the source's `struct write_info`.
//!
//! A `ForwardContext` is never shared across requests (spec §5): it is
//! built, filled, and drained entirely within one dispatch call.

use tokio::net::TcpStream;

use crate::membership::NodeId;

/// One outstanding remote participation in a fan-out.
pub struct Leg {
    pub node: NodeId,
    pub sock: TcpStream,
}

/// Bounded collection of legs plus the "how many are outstanding" count the
/// source calls `nr_sent`. Shift-down on removal keeps indices dense so a
/// 1:1 poll-array/leg correspondence holds even though this crate's waiter
/// (§4.D) reads legs out of a `FuturesUnordered` rather than a literal
/// `pollfd` array.
#[derive(Default)]
pub struct ForwardContext {
    legs: Vec<Leg>,
}

impl ForwardContext {
    pub fn new() -> Self {
        Self { legs: Vec::new() }
    }

    /// Append a leg ready to be waited on.
    pub fn push(&mut self, node: NodeId, sock: TcpStream) {
        self.legs.push(Leg { node, sock });
    }

    pub fn nr_sent(&self) -> usize {
        self.legs.len()
    }

    /// Remove leg `i` (success path): caller is responsible for returning
    /// the socket to the pool.
    pub fn retire_ok(&mut self, i: usize) -> Leg {
        self.legs.remove(i)
    }

    /// Remove leg `i` (failure path): caller is responsible for evicting the
    /// socket from the pool.
    pub fn retire_err(&mut self, i: usize) -> Leg {
        self.legs.remove(i)
    }

    /// Hand off every remaining leg to the completion waiter, leaving this
    /// context empty. This is the async-native analogue of
    /// `pfd_info_init`/`snapshot_pollset`.
    pub fn take_all(&mut self) -> Vec<Leg> {
        std::mem::take(&mut self.legs)
    }
}
