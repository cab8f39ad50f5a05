use std::collections::BTreeMap;

use crate::domain::metrics::ANALYTICS_TARGET;
use crate::domain::metrics::frame_record::FrameRecord;
use crate::domain::metrics::metrics_sink::MetricsSink;
use crate::domain::metrics::summary::RunSummary;
use crate::domain::network::topology::TopologyProvider;
use crate::domain::scheduler::hop_aware_scheduler::{FramePhase, HopAwareScheduler};
use crate::domain::scheduler::queue_state::QueueState;
use crate::domain::scheduler::scheduler_config::SchedulerConfig;
use crate::domain::scheduler::slot_projector::ScheduleDecision;
use crate::domain::traffic::sap_class::SapClass;
use crate::domain::traffic::traffic_source::TrafficSource;
use crate::domain::utils::id::ClassId;
use crate::error::{Result, ScheduleError};

/// Frame-synchronous simulation loop around the scheduler.
///
/// Per frame: enqueue arrivals, update weights, project, apply the transmissions, age packets that
/// have no route, drop packets without hop budget (and, if configured, packets that queued for too
/// long), emit a record.
#[derive(Debug)]
pub struct FrameDriver<'a> {
    topology: &'a dyn TopologyProvider,
    classes: &'a BTreeMap<ClassId, SapClass>,
    scheduler: HopAwareScheduler,
    queues: QueueState,

    /// Packets whose latency would exceed this many frames are dropped as expired.
    max_packet_age: Option<u64>,

    /// Index of the next frame to simulate.
    frame: u64,
}

impl<'a> FrameDriver<'a> {
    pub fn new(topology: &'a dyn TopologyProvider, classes: &'a BTreeMap<ClassId, SapClass>, config: SchedulerConfig) -> Self {
        let queues = QueueState::new(&classes.values().cloned().collect::<Vec<_>>());
        Self { topology, classes, scheduler: HopAwareScheduler::new(config), queues, max_packet_age: None, frame: 0 }
    }

    pub fn with_max_packet_age(mut self, max_packet_age: Option<u64>) -> Self {
        self.max_packet_age = max_packet_age;
        self
    }

    pub fn queues(&self) -> &QueueState {
        &self.queues
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    pub fn phase(&self) -> FramePhase {
        self.scheduler.phase()
    }

    /// Simulates one frame and returns its record.
    pub fn step(&mut self, traffic: &mut dyn TrafficSource) -> FrameRecord {
        let frame = self.frame;
        let mut record = FrameRecord::new(frame, self.classes.keys().copied());

        for packet in traffic.arrivals(frame) {
            let counts = record.class_mut(packet.class);
            counts.generated += 1;

            if packet.is_at_destination() {
                // Nothing to transmit, delivered on arrival.
                counts.delivered += 1;
                continue;
            }
            self.queues.enqueue(packet.holder, packet.class, packet);
        }

        let decision = self.scheduler.plan_frame(&mut self.queues, self.classes, self.topology);
        self.apply(frame, &decision, &mut record);
        self.scheduler.finish_frame(&mut self.queues, &decision);

        self.age_stranded_packets();
        self.drop_finished_packets(frame, &mut record);

        for (class, backlog) in self.queues.backlog_per_class() {
            record.class_mut(class).queued = backlog as u64;
        }
        record.transmissions = decision.len();
        record.skipped = decision.skipped.len();
        record.weights = self.queues.weight_snapshot();

        let total = record.total();
        tracing::debug!(
            target: ANALYTICS_TARGET,
            Frame = frame,
            LogDescription = "Frame finished",
            Transmissions = record.transmissions,
            Skipped = record.skipped,
            Generated = total.generated,
            Delivered = total.delivered,
            Dropped = total.dropped,
            Expired = total.expired,
            Queued = total.queued,
            Pdr = record.pdr(),
        );

        self.frame += 1;
        record
    }

    /// Moves every selected packet one hop. Packets reaching their destination are delivered.
    fn apply(&mut self, frame: u64, decision: &ScheduleDecision, record: &mut FrameRecord) {
        for transmission in &decision.transmissions {
            let mut packet = match self.queues.dequeue(transmission.node, transmission.class) {
                Ok(packet) => packet,
                Err(e) => {
                    log::error!("Selected transmission could not be applied: {}", e);
                    continue;
                }
            };

            if packet.seq != transmission.packet_seq {
                log::error!(
                    "Queue ({}, {}) yielded packet {} instead of the selected packet {}.",
                    transmission.node,
                    transmission.class,
                    packet.seq,
                    transmission.packet_seq
                );
            }

            packet.advance(transmission.next_hop);

            if packet.is_at_destination() {
                let counts = record.class_mut(packet.class);
                counts.delivered += 1;
                counts.latency_sum += packet.latency_at(frame);
            } else {
                self.queues.enqueue(packet.holder, packet.class, packet);
            }
        }
    }

    /// Every queued packet whose holder has no path to its destination burns one hop, so it is
    /// dropped after at most its hop budget in frames and stops blocking the queue.
    fn age_stranded_packets(&mut self) {
        let topology = self.topology;
        for packet in self.queues.packets_mut() {
            if topology.shortest_hop_path(packet.holder, packet.destination).len() < 2 {
                packet.burn_hop();
                log::trace!("Packet {} stranded at node {}, {} hop(s) left.", packet.seq, packet.holder, packet.remaining_hops);
            }
        }
    }

    /// Ageing pass: removes packets without hop budget and packets older than `max_packet_age`.
    fn drop_finished_packets(&mut self, frame: u64, record: &mut FrameRecord) {
        let max_packet_age = self.max_packet_age;
        let removed = self
            .queues
            .drain_where(|packet| !packet.has_hop_budget() || max_packet_age.is_some_and(|max_age| packet.latency_at(frame) > max_age));

        for packet in removed {
            let counts = record.class_mut(packet.class);
            if packet.has_hop_budget() {
                log::trace!("Packet {} expired at node {} after {} frames.", packet.seq, packet.holder, packet.latency_at(frame));
                counts.expired += 1;
            } else {
                log::trace!("{}", ScheduleError::HopBudgetExhausted { packet: packet.seq, holder: packet.holder });
                counts.dropped += 1;
            }
        }
    }

    /// Simulates `frames` frames, feeding every record into `sink`.
    pub fn run(&mut self, traffic: &mut dyn TrafficSource, frames: u64, sink: &mut dyn MetricsSink, label: &str) -> Result<RunSummary> {
        let mut summary = RunSummary::new(label);

        for _ in 0..frames {
            let record = self.step(traffic);
            sink.record(&record)?;
            summary.absorb(&record);
        }
        sink.finish()?;

        log::info!(
            "Run '{}' finished after {} frames: generated {}, delivered {}, dropped {}, expired {}, queued {} (PDR {:.3}).",
            label,
            summary.frames,
            summary.generated,
            summary.delivered,
            summary.dropped,
            summary.expired,
            summary.still_queued,
            summary.pdr
        );
        Ok(summary)
    }
}
