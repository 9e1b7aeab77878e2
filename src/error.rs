// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Protocol-level result taxonomy for the gateway replication engine.
//!
//! [`Outcome`] is the thing that crosses component boundaries (dispatcher,
//! waiter, read path, entry points): it is the gateway's verbatim analogue of
//! `SD_RES_*` from the source this crate generalizes. Plumbing-level failures
//! (I/O, config, startup) stay in `anyhow::Result` exactly as the teacher
//! splits the two concerns.

use thiserror::Error;

/// Verbatim per-replica status, or one of the gateway-synthesized codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Outcome {
    #[error("success")]
    Success,
    /// A mutating opcode targeted a read-only OID.
    #[error("object is read-only")]
    Readonly,
    /// No live placement exists for the requested replica count.
    #[error("no live placement (halt)")]
    Halt,
    /// Socket acquisition, send, poll-timeout exhaustion, or short read.
    #[error("network error")]
    NetworkError,
    /// A status propagated verbatim from the local or a peer engine.
    #[error("remote status {0}")]
    Remote(u32),
}

impl Outcome {
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Reduce two outcomes the way the fan-out dispatcher and completion
    /// waiter do: any non-success wins; when both are non-success the
    /// *last observed* one wins (callers only distinguish success vs.
    /// non-success, per spec).
    #[inline]
    pub fn reduce(self, other: Outcome) -> Outcome {
        if other.is_success() { self } else { other }
    }
}

/// Transport-level failure surfaced by the socket pool or wire codec.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error during {op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    #[error("no pooled or connectable socket for node")]
    Unreachable,
}

impl From<TransportError> for Outcome {
    fn from(_: TransportError) -> Self {
        Outcome::NetworkError
    }
}
