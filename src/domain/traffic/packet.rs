use serde::Serialize;

use crate::domain::utils::id::{ClassId, NodeId};

/// A packet travelling through the mesh.
///
/// Only the frame driver mutates `holder` and `remaining_hops`, one hop per transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Packet {
    /// Sequence number, unique within one traffic source.
    pub seq: u64,
    pub source: NodeId,
    pub destination: NodeId,
    pub class: ClassId,

    /// Frame in which the packet entered the network.
    pub created_frame: u64,

    /// Link traversals the packet may still use before it is dropped.
    pub remaining_hops: u32,

    /// Node whose queue currently holds the packet.
    pub holder: NodeId,
}

impl Packet {
    pub fn new(seq: u64, source: NodeId, destination: NodeId, class: ClassId, created_frame: u64, hop_budget: u32) -> Self {
        Self { seq, source, destination, class, created_frame, remaining_hops: hop_budget, holder: source }
    }

    pub fn is_at_destination(&self) -> bool {
        self.holder == self.destination
    }

    pub fn has_hop_budget(&self) -> bool {
        self.remaining_hops > 0
    }

    /// Number of frames the packet spent in the network, counting `frame` itself.
    pub fn latency_at(&self, frame: u64) -> u64 {
        (frame + 1).saturating_sub(self.created_frame)
    }

    /// Moves the packet one hop to `next`, consuming one unit of hop budget.
    pub fn advance(&mut self, next: NodeId) {
        self.holder = next;
        self.remaining_hops = self.remaining_hops.saturating_sub(1);
    }

    /// Uses up one unit of hop budget in place. Packets without a route age this way.
    pub fn burn_hop(&mut self) {
        self.remaining_hops = self.remaining_hops.saturating_sub(1);
    }
}
