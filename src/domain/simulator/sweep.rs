use std::path::Path;
use std::thread;

use crate::api::sweep_dto::{GridRunDto, SweepDto};
use crate::domain::metrics::metrics_sink::{JsonLinesSink, MemorySink, MetricsSink};
use crate::domain::metrics::summary::RunSummary;
use crate::domain::scheduler::scheduler_config::SchedulerConfig;
use crate::domain::simulator::scenario::Scenario;
use crate::error::{ConversionError, Error, Result};

pub const PRESET_FRAMES: u64 = 100;
pub const PRESET_SEED: u64 = 42;

/// One configuration of a parameter sweep.
#[derive(Debug, Clone)]
pub struct SweepRun {
    pub label: String,
    pub scenario: Scenario,
}

impl SweepRun {
    pub fn new(label: impl Into<String>, scenario: Scenario) -> Self {
        Self { label: label.into(), scenario }
    }
}

/// Variations of `base` differing only in the hop budget of every class, labelled `hop_budget=<h>`.
pub fn hop_budget_sweep(base: &Scenario, hop_budgets: &[u32]) -> std::result::Result<Vec<SweepRun>, ConversionError> {
    hop_budgets
        .iter()
        .map(|&hop_budget| -> std::result::Result<SweepRun, ConversionError> {
            let scenario = base.clone().with_hop_budget(hop_budget)?;
            Ok(SweepRun::new(format!("hop_budget={}", hop_budget), scenario))
        })
        .collect()
}

/// A labelled grid configuration. Varies size, hop budget and load between runs of one sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPreset {
    pub label: String,
    pub rows: u32,
    pub cols: u32,
    pub hop_budget: u32,

    /// Arrival rate per node and frame, one entry per SAP class.
    pub arrival_rates: Vec<f64>,
}

impl GridPreset {
    pub fn new(label: impl Into<String>, rows: u32, cols: u32, hop_budget: u32, arrival_rates: &[f64]) -> Self {
        Self { label: label.into(), rows, cols, hop_budget, arrival_rates: arrival_rates.to_vec() }
    }

    pub fn scenario(&self, scheduler: &SchedulerConfig, frames: u64, seed: u64) -> std::result::Result<Scenario, ConversionError> {
        let scenario = Scenario::grid(self.rows, self.cols, &self.arrival_rates, self.hop_budget, scheduler.clone())?;
        Ok(scenario.with_frames(frames).with_seed(seed))
    }
}

impl From<GridRunDto> for GridPreset {
    fn from(dto: GridRunDto) -> Self {
        Self { label: dto.label, rows: dto.rows, cols: dto.cols, hop_budget: dto.hop_budget, arrival_rates: dto.lam }
    }
}

/// The standard comparison: a 4x4 baseline, higher load, a tight hop budget and a larger grid.
pub fn comparison_presets() -> Vec<GridPreset> {
    vec![
        GridPreset::new("baseline", 4, 4, 8, &[4.0, 4.0, 2.0]),
        GridPreset::new("high_load", 4, 4, 8, &[6.0, 6.0, 3.0]),
        GridPreset::new("low_hop", 4, 4, 4, &[4.0, 4.0, 2.0]),
        GridPreset::new("large_grid", 5, 5, 8, &[4.0, 4.0, 2.0]),
    ]
}

/// One run per preset, all sharing scheduler settings, frame count and seed.
pub fn grid_sweep(presets: &[GridPreset], scheduler: &SchedulerConfig, frames: u64, seed: u64) -> std::result::Result<Vec<SweepRun>, ConversionError> {
    presets
        .iter()
        .map(|preset| -> std::result::Result<SweepRun, ConversionError> {
            Ok(SweepRun::new(preset.label.clone(), preset.scenario(scheduler, frames, seed)?))
        })
        .collect()
}

impl TryFrom<SweepDto> for Vec<SweepRun> {
    type Error = ConversionError;

    fn try_from(dto: SweepDto) -> std::result::Result<Vec<SweepRun>, Self::Error> {
        let presets: Vec<GridPreset> = dto.runs.into_iter().map(GridPreset::from).collect();
        grid_sweep(&presets, &SchedulerConfig::from(dto.scheduler), dto.frames, dto.seed)
    }
}

/// Runs every configuration on its own thread. Runs share no state.
///
/// With an `output_dir`, each run writes its records to `<output_dir>/<label>/run.jsonl`,
/// otherwise the records are discarded after summarising. Summaries keep the input order.
pub fn run_sweep(runs: &[SweepRun], output_dir: Option<&Path>) -> Result<Vec<RunSummary>> {
    log::info!("Starting sweep over {} configuration(s).", runs.len());

    let results: Vec<Result<RunSummary>> = thread::scope(|scope| {
        let handles: Vec<_> = runs
            .iter()
            .map(|run| {
                let handle = scope.spawn(move || -> Result<RunSummary> {
                    let mut sink: Box<dyn MetricsSink> = match output_dir {
                        Some(dir) => Box::new(JsonLinesSink::create(dir.join(&run.label).join("run.jsonl"))?),
                        None => Box::new(MemorySink::new()),
                    };
                    run.scenario.run(&run.label, sink.as_mut())
                });
                (run.label.as_str(), handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(label, handle)| handle.join().unwrap_or_else(|_| Err(Error::RunPanicked(label.to_string()))))
            .collect()
    });

    results.into_iter().collect()
}
