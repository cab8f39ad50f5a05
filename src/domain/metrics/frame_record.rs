use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::scheduler::queue_state::QueueWeight;
use crate::domain::utils::id::ClassId;

/// Packet outcomes of one SAP class within one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassCounts {
    /// Packets that entered the network in this frame.
    pub generated: u64,
    pub delivered: u64,

    /// Packets dropped because their hop budget ran out.
    pub dropped: u64,

    /// Packets dropped because they exceeded the maximum queueing age.
    pub expired: u64,

    /// Backlog at the end of the frame.
    pub queued: u64,

    /// Sum of the end-to-end latencies (in frames) of the packets delivered in this frame.
    pub latency_sum: u64,
}

impl ClassCounts {
    pub fn mean_latency(&self) -> Option<f64> {
        if self.delivered == 0 {
            return None;
        }
        Some(self.latency_sum as f64 / self.delivered as f64)
    }
}

/// Everything the simulation reports about a single frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub frame: u64,

    /// Transmissions applied in this frame.
    pub transmissions: usize,

    /// Queues skipped by the projector as infeasible.
    pub skipped: usize,

    pub classes: BTreeMap<ClassId, ClassCounts>,

    /// Queue weights after this frame's update.
    pub weights: Vec<QueueWeight>,
}

impl FrameRecord {
    pub fn new(frame: u64, class_ids: impl Iterator<Item = ClassId>) -> Self {
        Self { frame, transmissions: 0, skipped: 0, classes: class_ids.map(|id| (id, ClassCounts::default())).collect(), weights: Vec::new() }
    }

    /// Counters of `class`, created on first access.
    pub fn class_mut(&mut self, class: ClassId) -> &mut ClassCounts {
        self.classes.entry(class).or_default()
    }

    pub fn total(&self) -> ClassCounts {
        let mut total = ClassCounts::default();
        for counts in self.classes.values() {
            total.generated += counts.generated;
            total.delivered += counts.delivered;
            total.dropped += counts.dropped;
            total.expired += counts.expired;
            total.queued += counts.queued;
            total.latency_sum += counts.latency_sum;
        }
        total
    }

    /// Delivered share of the packets that left the network in this frame.
    pub fn pdr(&self) -> f64 {
        let total = self.total();
        total.delivered as f64 / (total.delivered + total.dropped + total.expired).max(1) as f64
    }

    pub fn mean_latency(&self) -> Option<f64> {
        self.total().mean_latency()
    }
}
