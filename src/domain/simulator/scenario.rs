use std::collections::BTreeMap;
use std::str::FromStr;

use crate::api::scenario_dto::{SapClassDto, ScenarioDto, SchedulerDto, TopologyDto};
use crate::domain::metrics::metrics_sink::MetricsSink;
use crate::domain::metrics::summary::RunSummary;
use crate::domain::network::topology::{NetworkTopology, TopologyProvider};
use crate::domain::scheduler::scheduler_config::SchedulerConfig;
use crate::domain::scheduler::utility::UtilityFunction;
use crate::domain::simulator::frame_driver::FrameDriver;
use crate::domain::traffic::sap_class::SapClass;
use crate::domain::traffic::traffic_source::{PoissonTraffic, TrafficSource};
use crate::domain::utils::id::ClassId;
use crate::error::{ConversionError, Error, Result};
use crate::loader::edge_list::load_edge_list;

/// A fully validated simulation setup. Once constructed, running it cannot fail on configuration.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub topology: NetworkTopology,
    pub classes: BTreeMap<ClassId, SapClass>,
    pub scheduler: SchedulerConfig,
    pub frames: u64,
    pub seed: u64,
    pub max_packet_age: Option<u64>,
}

impl Scenario {
    pub fn new(topology: NetworkTopology, classes: Vec<SapClass>, scheduler: SchedulerConfig) -> std::result::Result<Self, ConversionError> {
        scheduler.validate()?;

        if classes.is_empty() {
            return Err(ConversionError::InvalidConfiguration("At least one SAP class is required".to_string()));
        }

        let mut class_map = BTreeMap::new();
        for class in classes {
            Self::validate_class(&class)?;
            let id = class.id;
            if class_map.insert(id, class).is_some() {
                return Err(ConversionError::InvalidConfiguration(format!("SAP class {} is defined twice", id)));
            }
        }

        Ok(Self { topology, classes: class_map, scheduler, frames: 0, seed: 0, max_packet_age: None })
    }

    fn validate_class(class: &SapClass) -> std::result::Result<(), ConversionError> {
        let invalid = |what: &str, value: f64| {
            ConversionError::InvalidConfiguration(format!("{} of SAP class {} must be a non-negative number, got {}", what, class.id, value))
        };

        if !class.arrival_rate.is_finite() || class.arrival_rate < 0.0 {
            return Err(invalid("Arrival rate", class.arrival_rate));
        }
        if !class.priority.is_finite() || class.priority < 0.0 {
            return Err(invalid("Priority", class.priority));
        }
        if !class.target_rate.is_finite() || class.target_rate < 0.0 {
            return Err(invalid("Target rate", class.target_rate));
        }
        if class.hop_budget == 0 {
            return Err(ConversionError::InvalidConfiguration(format!("Hop budget of SAP class {} must be positive", class.id)));
        }
        Ok(())
    }

    /// Grid of `rows` x `cols` nodes with one SAP class per entry of `arrival_rates`, ids from 1.
    ///
    /// Every class has priority 1, a target rate equal to its arrival rate and `hop_budget`.
    pub fn grid(rows: u32, cols: u32, arrival_rates: &[f64], hop_budget: u32, scheduler: SchedulerConfig) -> std::result::Result<Self, ConversionError> {
        let topology = NetworkTopology::grid(rows, cols, 1.0)?;
        let classes = arrival_rates
            .iter()
            .enumerate()
            .map(|(i, &rate)| SapClass::new(ClassId::new(i as u32 + 1), rate, 1.0, rate, hop_budget))
            .collect();
        Scenario::new(topology, classes, scheduler)
    }

    pub fn with_frames(mut self, frames: u64) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_packet_age(mut self, max_packet_age: Option<u64>) -> Self {
        self.max_packet_age = max_packet_age;
        self
    }

    /// Same scenario with every class using `hop_budget`. Rejects a zero budget.
    pub fn with_hop_budget(mut self, hop_budget: u32) -> std::result::Result<Self, ConversionError> {
        if hop_budget == 0 {
            return Err(ConversionError::InvalidConfiguration("Hop budget must be positive".to_string()));
        }
        for class in self.classes.values_mut() {
            class.hop_budget = hop_budget;
        }
        Ok(self)
    }

    /// Poisson arrivals for every node and class, seeded with the scenario seed.
    pub fn poisson_traffic(&self) -> PoissonTraffic {
        PoissonTraffic::new(self.topology.node_ids(), self.classes.values().cloned().collect(), self.seed)
    }

    pub fn driver(&self) -> FrameDriver<'_> {
        FrameDriver::new(&self.topology, &self.classes, self.scheduler.clone()).with_max_packet_age(self.max_packet_age)
    }

    /// Runs all frames with Poisson arrivals.
    pub fn run(&self, label: &str, sink: &mut dyn MetricsSink) -> Result<RunSummary> {
        let mut traffic = self.poisson_traffic();
        self.run_with(label, &mut traffic, sink)
    }

    /// Runs all frames with the given arrivals.
    pub fn run_with(&self, label: &str, traffic: &mut dyn TrafficSource, sink: &mut dyn MetricsSink) -> Result<RunSummary> {
        log::info!(
            "Starting run '{}': {} node(s), {} link(s), {} class(es), {} frame(s), seed {}.",
            label,
            self.topology.num_of_nodes(),
            self.topology.num_of_links(),
            self.classes.len(),
            self.frames,
            self.seed
        );
        self.driver().run(traffic, self.frames, sink, label)
    }
}

impl TryFrom<ScenarioDto> for Scenario {
    type Error = Error;

    fn try_from(dto: ScenarioDto) -> Result<Scenario> {
        let topology = build_topology(dto.topology)?;
        let scheduler = SchedulerConfig::from(dto.scheduler);
        let classes = dto.classes.into_iter().map(SapClass::try_from).collect::<std::result::Result<Vec<_>, _>>()?;

        if dto.max_packet_age == Some(0) {
            return Err(ConversionError::InvalidConfiguration("Maximum packet age must be positive".to_string()).into());
        }

        let scenario = Scenario::new(topology, classes, scheduler)?
            .with_frames(dto.frames)
            .with_seed(dto.seed)
            .with_max_packet_age(dto.max_packet_age);
        Ok(scenario)
    }
}

fn build_topology(dto: TopologyDto) -> Result<NetworkTopology> {
    let topology = match dto {
        TopologyDto::Line { num_of_nodes } => NetworkTopology::line(num_of_nodes)?,
        TopologyDto::Grid { rows, cols, spacing } => NetworkTopology::grid(rows, cols, spacing)?,
        TopologyDto::EdgeList { nodes, edges } => NetworkTopology::from_nodes_and_edges(&nodes, &edges)?,
        TopologyDto::EdgeListFile { path } => NetworkTopology::from_edges(&load_edge_list(&path)?)?,
        TopologyDto::UnitDisk { positions, radius } => NetworkTopology::unit_disk(&positions, radius)?,
    };
    Ok(topology)
}

impl From<SchedulerDto> for SchedulerConfig {
    fn from(dto: SchedulerDto) -> Self {
        let defaults = SchedulerConfig::default();
        SchedulerConfig {
            step_size: dto.step_size.unwrap_or(defaults.step_size),
            hop_penalty: dto.hop_penalty.unwrap_or(defaults.hop_penalty),
            slots_per_node: dto.slots_per_node.unwrap_or(defaults.slots_per_node),
            throughput_decay: dto.throughput_decay.unwrap_or(defaults.throughput_decay),
        }
    }
}

impl TryFrom<SapClassDto> for SapClass {
    type Error = ConversionError;

    fn try_from(dto: SapClassDto) -> std::result::Result<SapClass, Self::Error> {
        let mut class = SapClass::new(ClassId::new(dto.id), dto.arrival_rate, dto.priority, dto.target_rate, dto.hop_budget);
        if let Some(name) = dto.name {
            class = class.with_name(name);
        }
        if let Some(utility) = dto.utility {
            class = class.with_utility(UtilityFunction::from_str(&utility)?);
        }
        Ok(class)
    }
}
