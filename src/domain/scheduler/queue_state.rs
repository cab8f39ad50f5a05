use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use crate::domain::traffic::packet::Packet;
use crate::domain::traffic::sap_class::SapClass;
use crate::domain::utils::id::{ClassId, NodeId};
use crate::error::ScheduleError;

pub type QueueKey = (NodeId, ClassId);

/// Backlog of one SAP class at one node.
#[derive(Debug, Clone)]
pub struct Queue {
    /// Pending packets, oldest at the front.
    packets: VecDeque<Packet>,

    /// Scheduling weight. Never negative.
    weight: f64,

    /// Exponential moving average of the packets served per frame.
    throughput_estimate: f64,
}

impl Queue {
    fn new(weight: f64) -> Self {
        Self { packets: VecDeque::new(), weight: weight.max(0.0), throughput_estimate: 0.0 }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn throughput_estimate(&self) -> f64 {
        self.throughput_estimate
    }

    pub fn head(&self) -> Option<&Packet> {
        self.packets.front()
    }

    /// Packet at FIFO position `position`, 0 being the head.
    pub fn get(&self, position: usize) -> Option<&Packet> {
        self.packets.get(position)
    }
}

/// Weight of a single queue at the end of a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueWeight {
    pub node: NodeId,
    pub class: ClassId,
    pub weight: f64,
}

/// All per-(node, class) queues of one simulation run.
///
/// Queues are created lazily on first enqueue and iterate in `(node, class)` order, which keeps
/// every consumer deterministic.
#[derive(Debug, Clone)]
pub struct QueueState {
    queues: BTreeMap<QueueKey, Queue>,

    /// Initial weight of a new queue, per class.
    base_weights: BTreeMap<ClassId, f64>,
}

impl QueueState {
    pub fn new(classes: &[SapClass]) -> Self {
        let base_weights = classes.iter().map(|class| (class.id, class.base_weight())).collect();
        Self { queues: BTreeMap::new(), base_weights }
    }

    /// Appends `packet` to the tail of the `(node, class)` queue, creating the queue if needed.
    pub fn enqueue(&mut self, node: NodeId, class: ClassId, packet: Packet) {
        let base_weight = match self.base_weights.get(&class) {
            Some(weight) => *weight,
            None => {
                log::warn!("UnknownSapClass: Packet {} uses class {} without descriptor, queue starts with weight 0.", packet.seq, class);
                0.0
            }
        };

        self.queues.entry((node, class)).or_insert_with(|| Queue::new(base_weight)).packets.push_back(packet);
    }

    /// Oldest packet of the queue without removing it.
    pub fn peek_head(&self, node: NodeId, class: ClassId) -> Result<&Packet, ScheduleError> {
        self.queues.get(&(node, class)).and_then(Queue::head).ok_or(ScheduleError::EmptyQueueAccess { node, class })
    }

    /// Removes and returns the oldest packet of the queue.
    pub fn dequeue(&mut self, node: NodeId, class: ClassId) -> Result<Packet, ScheduleError> {
        self.queues.get_mut(&(node, class)).and_then(|queue| queue.packets.pop_front()).ok_or(ScheduleError::EmptyQueueAccess { node, class })
    }

    /// Current backlog, zero for queues which were never created.
    pub fn length(&self, node: NodeId, class: ClassId) -> usize {
        self.queues.get(&(node, class)).map_or(0, Queue::len)
    }

    pub fn get(&self, node: NodeId, class: ClassId) -> Option<&Queue> {
        self.queues.get(&(node, class))
    }

    pub fn weight(&self, node: NodeId, class: ClassId) -> Option<f64> {
        self.queues.get(&(node, class)).map(Queue::weight)
    }

    /// Overwrites the weight of an existing queue, projecting negative values onto zero.
    ///
    /// # Returns
    /// `false` if the queue does not exist.
    pub fn set_weight(&mut self, node: NodeId, class: ClassId, weight: f64) -> bool {
        match self.queues.get_mut(&(node, class)) {
            Some(queue) => {
                queue.weight = if weight.is_nan() { 0.0 } else { weight.max(0.0) };
                true
            }
            None => false,
        }
    }

    /// Folds the transmissions of the last frame into every queue's throughput estimate.
    ///
    /// `decay` is the weight of the newest observation. Queues absent from `served` observed zero.
    pub fn update_throughput(&mut self, served: &BTreeMap<QueueKey, usize>, decay: f64) {
        for (key, queue) in self.queues.iter_mut() {
            let observed = served.get(key).copied().unwrap_or(0) as f64;
            queue.throughput_estimate = (1.0 - decay) * queue.throughput_estimate + decay * observed;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QueueKey, &Queue)> {
        self.queues.iter()
    }

    /// Keys of all queues holding at least one packet, in `(node, class)` order.
    pub fn non_empty_keys(&self) -> Vec<QueueKey> {
        self.queues.iter().filter(|(_, queue)| !queue.is_empty()).map(|(key, _)| *key).collect()
    }

    pub fn total_backlog(&self) -> usize {
        self.queues.values().map(Queue::len).sum()
    }

    pub fn backlog_per_class(&self) -> BTreeMap<ClassId, usize> {
        let mut backlog: BTreeMap<ClassId, usize> = BTreeMap::new();
        for ((_, class), queue) in &self.queues {
            *backlog.entry(*class).or_insert(0) += queue.len();
        }
        backlog
    }

    /// Every queued packet, in `(node, class, position)` order. Weights are not reachable from here.
    pub fn packets_mut(&mut self) -> impl Iterator<Item = &mut Packet> {
        self.queues.values_mut().flat_map(|queue| queue.packets.iter_mut())
    }

    /// Removes every packet matching `predicate` from all queues, keeping FIFO order of the rest.
    ///
    /// # Returns
    /// The removed packets in `(node, class, position)` order.
    pub fn drain_where<F>(&mut self, mut predicate: F) -> Vec<Packet>
    where
        F: FnMut(&Packet) -> bool,
    {
        let mut removed = Vec::new();
        for queue in self.queues.values_mut() {
            if !queue.packets.iter().any(&mut predicate) {
                continue;
            }
            let (drop, keep): (VecDeque<Packet>, VecDeque<Packet>) = queue.packets.drain(..).partition(|packet| predicate(packet));
            queue.packets = keep;
            removed.extend(drop);
        }
        removed
    }

    /// Weights of all queues in `(node, class)` order.
    pub fn weight_snapshot(&self) -> Vec<QueueWeight> {
        self.queues.iter().map(|((node, class), queue)| QueueWeight { node: *node, class: *class, weight: queue.weight }).collect()
    }
}
