use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crate::domain::network::topology::TopologyProvider;
use crate::domain::scheduler::queue_state::{QueueKey, QueueState};
use crate::domain::scheduler::scheduler_config::SchedulerConfig;
use crate::domain::traffic::packet::Packet;
use crate::domain::utils::id::{ClassId, NodeId};
use crate::error::ScheduleError;

/// One accepted transmission of the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    pub node: NodeId,
    pub class: ClassId,

    /// Sequence number of the packet that will be sent.
    pub packet_seq: u64,

    pub next_hop: NodeId,

    /// Queue weight the selection was made with.
    pub score: f64,
}

/// Result of one projection: the transmissions in the order they were accepted, plus the queues
/// that were skipped as infeasible.
#[derive(Debug, Clone, Default)]
pub struct ScheduleDecision {
    pub transmissions: Vec<Transmission>,
    pub skipped: Vec<(QueueKey, ScheduleError)>,
}

impl ScheduleDecision {
    pub fn len(&self) -> usize {
        self.transmissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transmissions.is_empty()
    }

    /// Number of accepted transmissions per sending node.
    pub fn per_node(&self) -> BTreeMap<NodeId, usize> {
        let mut counts: BTreeMap<NodeId, usize> = BTreeMap::new();
        for transmission in &self.transmissions {
            *counts.entry(transmission.node).or_insert(0) += 1;
        }
        counts
    }

    /// Number of accepted transmissions per queue.
    pub fn per_queue(&self) -> BTreeMap<QueueKey, usize> {
        let mut counts: BTreeMap<QueueKey, usize> = BTreeMap::new();
        for transmission in &self.transmissions {
            *counts.entry((transmission.node, transmission.class)).or_insert(0) += 1;
        }
        counts
    }
}

/// Heap entry. Ordered so that the max-heap yields the highest score first and, among equal
/// scores, the lowest node id and then the lowest class id.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f64,
    node: NodeId,
    class: ClassId,

    /// FIFO position of the packet this candidate would send.
    position: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.node.cmp(&self.node))
            .then_with(|| other.class.cmp(&self.class))
            .then_with(|| other.position.cmp(&self.position))
    }
}

/// Greedy projection of the continuous queue weights onto a feasible integer schedule.
///
/// Every node owns `slots_per_node` transmission slots per frame. Candidates are served in
/// descending weight order across the whole network; an accepted candidate consumes one slot of
/// its node. A queue selected again sends its next packet in FIFO order.
#[derive(Debug, Clone)]
pub struct GreedySlotProjector {
    slots_per_node: usize,
}

impl GreedySlotProjector {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self { slots_per_node: config.slots_per_node }
    }

    pub fn slots_per_node(&self) -> usize {
        self.slots_per_node
    }

    /// Next hop of `packet` if it can be transmitted in this frame.
    ///
    /// The packet needs remaining hop budget, and its shortest path must contain a second node
    /// that is a direct neighbor of the holder. Zero-length and missing paths are infeasible.
    pub fn feasible_next_hop(packet: &Packet, topology: &dyn TopologyProvider) -> Result<NodeId, ScheduleError> {
        if !packet.has_hop_budget() {
            return Err(ScheduleError::HopBudgetExhausted { packet: packet.seq, holder: packet.holder });
        }

        let path = topology.shortest_hop_path(packet.holder, packet.destination);
        match path.get(1) {
            Some(next_hop) if topology.is_neighbor(packet.holder, *next_hop) => Ok(*next_hop),
            _ => Err(ScheduleError::UnreachableDestination { from: packet.holder, to: packet.destination }),
        }
    }

    /// Selects the transmissions of the current frame. Does not modify any queue.
    pub fn project(&self, queues: &QueueState, topology: &dyn TopologyProvider) -> ScheduleDecision {
        let mut decision = ScheduleDecision::default();
        let mut remaining_slots: BTreeMap<NodeId, usize> = BTreeMap::new();

        let mut heap: BinaryHeap<Candidate> = queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty() && queue.weight() > 0.0)
            .map(|((node, class), queue)| Candidate { score: queue.weight(), node: *node, class: *class, position: 0 })
            .collect();

        while let Some(candidate) = heap.pop() {
            let slots = remaining_slots.entry(candidate.node).or_insert(self.slots_per_node);
            if *slots == 0 {
                continue;
            }

            let Some(queue) = queues.get(candidate.node, candidate.class) else {
                continue;
            };
            let Some(packet) = queue.get(candidate.position) else {
                continue;
            };

            match Self::feasible_next_hop(packet, topology) {
                Ok(next_hop) => {
                    decision.transmissions.push(Transmission {
                        node: candidate.node,
                        class: candidate.class,
                        packet_seq: packet.seq,
                        next_hop,
                        score: candidate.score,
                    });
                    *slots -= 1;

                    if *slots > 0 && candidate.position + 1 < queue.len() {
                        heap.push(Candidate { position: candidate.position + 1, ..candidate });
                    }
                }
                Err(reason) => {
                    // The queue stays blocked behind its infeasible packet for the rest of the frame.
                    log::trace!("Skipping queue ({}, {}): {}", candidate.node, candidate.class, reason);
                    decision.skipped.push(((candidate.node, candidate.class), reason));
                }
            }
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::topology::NetworkTopology;
    use crate::domain::traffic::sap_class::SapClass;

    fn classes() -> Vec<SapClass> {
        vec![SapClass::new(ClassId::new(1), 1.0, 1.0, 1.0, 8), SapClass::new(ClassId::new(2), 1.0, 1.0, 1.0, 8)]
    }

    fn projector(slots_per_node: usize) -> GreedySlotProjector {
        GreedySlotProjector::new(&SchedulerConfig { slots_per_node, ..Default::default() })
    }

    fn enqueue(queues: &mut QueueState, seq: u64, holder: u32, destination: u32, class: u32, hops: u32) {
        let packet = Packet::new(seq, NodeId::new(holder), NodeId::new(destination), ClassId::new(class), 0, hops);
        queues.enqueue(NodeId::new(holder), ClassId::new(class), packet);
    }

    #[test]
    fn test_highest_weight_wins_the_slot() {
        let topology = NetworkTopology::line(4).unwrap();
        let mut queues = QueueState::new(&classes());
        enqueue(&mut queues, 0, 1, 3, 1, 5);
        enqueue(&mut queues, 1, 1, 0, 2, 5);
        queues.set_weight(NodeId::new(1), ClassId::new(2), 3.0);

        let decision = projector(1).project(&queues, &topology);

        assert_eq!(decision.len(), 1);
        assert_eq!(decision.transmissions[0].class, ClassId::new(2));
        assert_eq!(decision.transmissions[0].next_hop, NodeId::new(0));
    }

    #[test]
    fn test_ties_break_by_lowest_node_then_lowest_class() {
        let topology = NetworkTopology::line(4).unwrap();
        let mut queues = QueueState::new(&classes());
        enqueue(&mut queues, 0, 2, 3, 2, 5);
        enqueue(&mut queues, 1, 2, 3, 1, 5);
        enqueue(&mut queues, 2, 1, 3, 2, 5);

        let decision = projector(1).project(&queues, &topology);
        let order: Vec<(u32, u32)> = decision.transmissions.iter().map(|t| (t.node.id, t.class.id)).collect();

        assert_eq!(order, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn test_node_capacity_is_never_exceeded() {
        let topology = NetworkTopology::grid(3, 3, 1.0).unwrap();
        let mut queues = QueueState::new(&classes());
        let mut seq = 0;
        for node in 0..9 {
            for class in 1..=2 {
                for _ in 0..4 {
                    enqueue(&mut queues, seq, node, (node + 4) % 9, class, 8);
                    seq += 1;
                }
            }
        }

        for slots in 1..=3 {
            let decision = projector(slots).project(&queues, &topology);
            for (node, count) in decision.per_node() {
                assert!(count <= slots, "Node {} got {} transmissions with {} slots", node, count, slots);
            }
            assert_eq!(decision.len(), 9 * slots, "Every node has enough backlog to fill all of its slots");
        }
    }

    #[test]
    fn test_repeated_selection_follows_fifo_order() {
        let topology = NetworkTopology::line(3).unwrap();
        let mut queues = QueueState::new(&classes());
        enqueue(&mut queues, 10, 0, 2, 1, 4);
        enqueue(&mut queues, 11, 0, 2, 1, 4);
        enqueue(&mut queues, 12, 0, 2, 1, 4);

        let decision = projector(2).project(&queues, &topology);
        let seqs: Vec<u64> = decision.transmissions.iter().map(|t| t.packet_seq).collect();

        assert_eq!(seqs, vec![10, 11]);
    }

    #[test]
    fn test_infeasible_pair_is_skipped_without_consuming_capacity() {
        let topology = NetworkTopology::from_nodes_and_edges(&[0, 1, 2, 3], &[(0, 1), (1, 2)]).unwrap();
        let mut queues = QueueState::new(&classes());
        // Class 2 has the higher weight but its destination is unreachable.
        enqueue(&mut queues, 0, 0, 3, 2, 5);
        enqueue(&mut queues, 1, 0, 2, 1, 5);
        queues.set_weight(NodeId::new(0), ClassId::new(2), 5.0);

        let decision = projector(1).project(&queues, &topology);

        assert_eq!(decision.len(), 1);
        assert_eq!(decision.transmissions[0].class, ClassId::new(1));
        assert_eq!(
            decision.skipped,
            vec![((NodeId::new(0), ClassId::new(2)), ScheduleError::UnreachableDestination { from: NodeId::new(0), to: NodeId::new(3) })]
        );
    }

    #[test]
    fn test_zero_budget_and_zero_weight_are_not_scheduled() {
        let topology = NetworkTopology::line(3).unwrap();
        let mut queues = QueueState::new(&classes());
        enqueue(&mut queues, 0, 0, 2, 1, 0);
        enqueue(&mut queues, 1, 1, 2, 2, 3);
        queues.set_weight(NodeId::new(1), ClassId::new(2), 0.0);

        let decision = projector(1).project(&queues, &topology);

        assert!(decision.is_empty());
        assert_eq!(decision.skipped.len(), 1);
        assert!(matches!(decision.skipped[0].1, ScheduleError::HopBudgetExhausted { packet: 0, .. }));
    }

    #[test]
    fn test_packet_already_at_destination_is_infeasible() {
        let topology = NetworkTopology::line(3).unwrap();
        let packet = Packet::new(0, NodeId::new(2), NodeId::new(2), ClassId::new(1), 0, 3);

        assert!(GreedySlotProjector::feasible_next_hop(&packet, &topology).is_err(), "A zero-length path has no next hop");
    }
}
