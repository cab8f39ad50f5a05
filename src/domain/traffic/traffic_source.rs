use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};

use crate::domain::traffic::packet::Packet;
use crate::domain::traffic::sap_class::SapClass;
use crate::domain::utils::id::{ClassId, NodeId};

/// Produces the packets entering the network in a frame.
pub trait TrafficSource {
    fn arrivals(&mut self, frame: u64) -> Vec<Packet>;
}

/// Seeded Poisson traffic.
///
/// Each frame one arrival count is drawn per SAP class and every node injects that many packets
/// of the class. Destinations are uniform over all other nodes.
#[derive(Debug, Clone)]
pub struct PoissonTraffic {
    node_ids: Vec<NodeId>,
    classes: Vec<SapClass>,
    rng: ChaCha8Rng,
    next_seq: u64,
}

impl PoissonTraffic {
    pub fn new(node_ids: Vec<NodeId>, classes: Vec<SapClass>, seed: u64) -> Self {
        if node_ids.len() < 2 {
            log::warn!("Poisson traffic on {} node(s): no destination other than the source exists, no packet will be generated.", node_ids.len());
        }
        Self { node_ids, classes, rng: ChaCha8Rng::seed_from_u64(seed), next_seq: 0 }
    }

    /// Poisson distributed count with mean `lambda`. Zero for non-positive or non-finite means.
    pub fn sample_poisson<R: Rng + ?Sized>(rng: &mut R, lambda: f64) -> u64 {
        match Poisson::new(lambda) {
            Ok(poisson) => poisson.sample(rng) as u64,
            Err(_) => 0,
        }
    }

    fn random_destination(&mut self, source_index: usize) -> NodeId {
        // Draw among the n-1 other nodes and shift past the source.
        let mut index = self.rng.random_range(0..self.node_ids.len() - 1);
        if index >= source_index {
            index += 1;
        }
        self.node_ids[index]
    }
}

impl TrafficSource for PoissonTraffic {
    fn arrivals(&mut self, frame: u64) -> Vec<Packet> {
        if self.node_ids.len() < 2 {
            return Vec::new();
        }

        let mut counts: Vec<(ClassId, u32, u64)> = Vec::with_capacity(self.classes.len());
        for class in &self.classes {
            counts.push((class.id, class.hop_budget, Self::sample_poisson(&mut self.rng, class.arrival_rate)));
        }

        let mut packets = Vec::new();
        for source_index in 0..self.node_ids.len() {
            let source = self.node_ids[source_index];
            for (class, hop_budget, count) in &counts {
                for _ in 0..*count {
                    let destination = self.random_destination(source_index);
                    packets.push(Packet::new(self.next_seq, source, destination, *class, frame, *hop_budget));
                    self.next_seq += 1;
                }
            }
        }
        packets
    }
}

/// A single scripted packet injection.
#[derive(Debug, Clone, PartialEq)]
pub struct Injection {
    pub source: NodeId,
    pub destination: NodeId,
    pub class: ClassId,
    pub hop_budget: u32,
}

/// Deterministic traffic made of explicit per-frame injections.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTraffic {
    injections: BTreeMap<u64, Vec<Injection>>,
    next_seq: u64,
}

impl ScriptedTraffic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(mut self, frame: u64, source: NodeId, destination: NodeId, class: ClassId, hop_budget: u32) -> Self {
        self.injections.entry(frame).or_default().push(Injection { source, destination, class, hop_budget });
        self
    }

    pub fn num_of_injections(&self) -> usize {
        self.injections.values().map(Vec::len).sum()
    }
}

impl TrafficSource for ScriptedTraffic {
    fn arrivals(&mut self, frame: u64) -> Vec<Packet> {
        let Some(injections) = self.injections.remove(&frame) else {
            return Vec::new();
        };

        injections
            .into_iter()
            .map(|injection| {
                let packet = Packet::new(self.next_seq, injection.source, injection.destination, injection.class, frame, injection.hop_budget);
                self.next_seq += 1;
                packet
            })
            .collect()
    }
}
