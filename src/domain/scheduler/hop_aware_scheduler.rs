use std::collections::BTreeMap;
use std::fmt;

use crate::domain::network::topology::TopologyProvider;
use crate::domain::scheduler::queue_state::QueueState;
use crate::domain::scheduler::scheduler_config::SchedulerConfig;
use crate::domain::scheduler::slot_projector::{GreedySlotProjector, ScheduleDecision};
use crate::domain::scheduler::weight_updater::MirrorDescentUpdater;
use crate::domain::traffic::sap_class::SapClass;
use crate::domain::utils::id::ClassId;

/// Phase of the per-frame scheduler cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePhase {
    #[default]
    Idle,
    UpdatingWeights,
    Projecting,
    Applying,
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FramePhase::Idle => "Idle",
            FramePhase::UpdatingWeights => "UpdatingWeights",
            FramePhase::Projecting => "Projecting",
            FramePhase::Applying => "Applying",
        };
        write!(f, "{}", name)
    }
}

/// Weight updater and slot projector bundled into the frame cycle
/// `Idle -> UpdatingWeights -> Projecting -> Applying -> Idle`.
///
/// Applying the decision is up to the caller, which reports back with [`HopAwareScheduler::finish_frame`].
#[derive(Debug, Clone)]
pub struct HopAwareScheduler {
    config: SchedulerConfig,
    updater: MirrorDescentUpdater,
    projector: GreedySlotProjector,
    phase: FramePhase,
}

impl HopAwareScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let updater = MirrorDescentUpdater::new(&config);
        let projector = GreedySlotProjector::new(&config);
        Self { config, updater, projector, phase: FramePhase::Idle }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    fn enter(&mut self, phase: FramePhase) {
        log::trace!("Scheduler phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Runs the weight update followed by the projection and leaves the scheduler in `Applying`.
    pub fn plan_frame(&mut self, queues: &mut QueueState, classes: &BTreeMap<ClassId, SapClass>, topology: &dyn TopologyProvider) -> ScheduleDecision {
        if self.phase != FramePhase::Idle {
            log::warn!("Frame planned while scheduler is in phase {}, previous frame was not finished.", self.phase);
        }

        self.enter(FramePhase::UpdatingWeights);
        self.updater.update(queues, classes, topology);

        self.enter(FramePhase::Projecting);
        let decision = self.projector.project(queues, topology);

        self.enter(FramePhase::Applying);
        decision
    }

    /// Folds the applied transmissions into the throughput estimates and returns to `Idle`.
    pub fn finish_frame(&mut self, queues: &mut QueueState, decision: &ScheduleDecision) {
        queues.update_throughput(&decision.per_queue(), self.config.throughput_decay);
        self.enter(FramePhase::Idle);
    }
}
