use std::collections::BTreeMap;

use crate::domain::network::topology::TopologyProvider;
use crate::domain::scheduler::queue_state::{QueueKey, QueueState};
use crate::domain::scheduler::scheduler_config::SchedulerConfig;
use crate::domain::traffic::packet::Packet;
use crate::domain::traffic::sap_class::SapClass;
use crate::domain::utils::id::ClassId;

/// Largest value of the hop pressure; reached when a packet has no slack left.
pub const MAX_HOP_PRESSURE: f64 = 1.0;

/// Projected (sub-)gradient step on the per-queue weights.
///
/// For every non-empty queue:
///
/// `weight <- max(0, weight + η·(g - p))`
///
/// with `g` the utility gradient at the queue's throughput estimate and `p = -β·pressure` the hop
/// penalty of the head packet. `p` is never positive, so queues whose head packet is running out
/// of hop budget gain weight.
#[derive(Debug, Clone)]
pub struct MirrorDescentUpdater {
    step_size: f64,
    hop_penalty: f64,
}

impl MirrorDescentUpdater {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self { step_size: config.step_size, hop_penalty: config.hop_penalty }
    }

    /// How close `packet` is to exhausting its hop budget, in `(0, MAX_HOP_PRESSURE]`.
    ///
    /// With `slack = remaining hops - shortest hop distance to the destination` the pressure is
    /// `1 / (1 + slack)`. It saturates when the budget is zero, the slack is negative or the
    /// destination cannot be reached at all.
    pub fn hop_pressure(packet: &Packet, topology: &dyn TopologyProvider) -> f64 {
        if !packet.has_hop_budget() {
            return MAX_HOP_PRESSURE;
        }

        match topology.hop_distance(packet.holder, packet.destination) {
            Some(distance) if (packet.remaining_hops as usize) >= distance => {
                let slack = packet.remaining_hops as usize - distance;
                MAX_HOP_PRESSURE / (1.0 + slack as f64)
            }
            _ => MAX_HOP_PRESSURE,
        }
    }

    /// The penalty term `p` of the update rule. Zero or negative.
    pub fn hop_penalty(&self, packet: &Packet, topology: &dyn TopologyProvider) -> f64 {
        -self.hop_penalty * Self::hop_pressure(packet, topology)
    }

    /// Updates the weight of every non-empty queue. Empty queues keep their weight.
    ///
    /// All new weights are computed from the state at the start of the call and written back
    /// together afterwards.
    ///
    /// # Returns
    /// The number of queues whose weight was updated.
    pub fn update(&self, queues: &mut QueueState, classes: &BTreeMap<ClassId, SapClass>, topology: &dyn TopologyProvider) -> usize {
        let mut new_weights: Vec<(QueueKey, f64)> = Vec::new();

        for ((node, class_id), queue) in queues.iter() {
            // Empty queues are skipped so idle classes do not decay.
            let Some(head) = queue.head() else {
                continue;
            };

            let gradient = match classes.get(class_id) {
                Some(class) => class.utility_gradient(queue.throughput_estimate()),
                None => {
                    log::debug!("No descriptor for class {}, utility gradient of queue ({}, {}) is zero.", class_id, node, class_id);
                    0.0
                }
            };
            let penalty = self.hop_penalty(head, topology);

            let weight = (queue.weight() + self.step_size * (gradient - penalty)).max(0.0);

            log::trace!(
                "Weight ({}, {}): {:.4} -> {:.4} (gradient {:.4}, penalty {:.4}, throughput {:.4})",
                node,
                class_id,
                queue.weight(),
                weight,
                gradient,
                penalty,
                queue.throughput_estimate()
            );
            new_weights.push(((*node, *class_id), weight));
        }

        for ((node, class), weight) in &new_weights {
            queues.set_weight(*node, *class, *weight);
        }
        new_weights.len()
    }
}
