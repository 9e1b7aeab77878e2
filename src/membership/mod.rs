// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Cluster membership: the virtual-node ring snapshot ("view") and the
//! external interface a gateway uses to read it.
//!
//! The membership service itself (how a view gets built, how nodes join or
//! leave) is out of scope here, same as the source: this module only models
//! the *shape* of a view and the read-only queries a gateway makes against
//! it. [`InMemoryMembership`] is a realistic test/embedding double, not a
//! cluster implementation.

use std::{
    collections::HashSet,
    net::SocketAddr,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};

/// Monotonically increasing membership version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Epoch(pub u64);

/// Identity of a host node: something a socket pool can dial and a gateway
/// can compare against its own identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub addr: SocketAddr,
}

impl NodeId {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// One point on the placement ring, backed by a host node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VNode {
    /// Position on the ring (hash space).
    pub point: u64,
    pub node: NodeId,
}

/// Immutable snapshot of the cluster's placement ring.
///
/// Requests borrow an `Arc<View>` for their lifetime; a new view is installed
/// atomically by [`MembershipHandle::install`] and the previous one is
/// dropped once its last holder releases it (Design Notes §9).
#[derive(Debug, Clone)]
pub struct View {
    /// Sorted by `point`, ascending.
    pub vnodes: Vec<VNode>,
    pub nodes: HashSet<NodeId>,
    pub epoch: Epoch,
}

impl View {
    pub fn empty(epoch: Epoch) -> Self {
        Self {
            vnodes: Vec::new(),
            nodes: HashSet::new(),
            epoch,
        }
    }
}

/// Read-only queries a gateway makes against the current cluster view.
pub trait Membership: Send + Sync {
    /// The currently installed view. Cheap: an `Arc` clone.
    fn current_view(&self) -> Arc<View>;

    /// Whether it is still worth retrying an I/O wait bound to `epoch`: true
    /// while the live epoch has not moved past it (membership has not yet
    /// declared anything dead).
    fn need_retry(&self, epoch: Epoch) -> bool;

    fn node_is_local(&self, node: &NodeId) -> bool;

    fn vnode_is_local(&self, vnode: &VNode) -> bool {
        self.node_is_local(&vnode.node)
    }
}

/// A installable, swappable view holder plus "this is me" identity, good
/// enough to embed a gateway in tests or a single-process harness.
pub struct InMemoryMembership {
    view: RwLock<Arc<View>>,
    self_node: NodeId,
}

impl InMemoryMembership {
    pub fn new(initial: View, self_node: NodeId) -> Self {
        Self {
            view: RwLock::new(Arc::new(initial)),
            self_node,
        }
    }

    /// Atomically install a new view. Old holders keep their `Arc` until
    /// they finish using it.
    pub fn install(&self, view: View) {
        *self.view.write().expect("membership lock poisoned") = Arc::new(view);
    }

    pub fn self_node(&self) -> &NodeId {
        &self.self_node
    }
}

impl Membership for InMemoryMembership {
    fn current_view(&self) -> Arc<View> {
        Arc::clone(&self.view.read().expect("membership lock poisoned"))
    }

    fn need_retry(&self, epoch: Epoch) -> bool {
        self.current_view().epoch == epoch
    }

    fn node_is_local(&self, node: &NodeId) -> bool {
        node == &self.self_node
    }
}
