use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};

use hopmesh_scheduler::domain::metrics::metrics_sink::{JsonLinesSink, MemorySink, MetricsSink};
use hopmesh_scheduler::domain::metrics::summary::{rolling_series, write_csv};
use hopmesh_scheduler::domain::scheduler::scheduler_config::SchedulerConfig;
use hopmesh_scheduler::domain::simulator::scenario::Scenario;
use hopmesh_scheduler::domain::simulator::sweep::{PRESET_FRAMES, PRESET_SEED, SweepRun, comparison_presets, grid_sweep, hop_budget_sweep, run_sweep};
use hopmesh_scheduler::domain::utils::rolling::DEFAULT_ROLLING_WINDOW;
use hopmesh_scheduler::{load_scenario, load_sweep, logger};

/// Frame-based simulator for the hop-budget-aware mesh scheduler.
#[derive(Parser, Debug)]
#[command(name = "hopmesh")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate a single configuration
    Run(ScenarioArgs),

    /// Simulate several configurations in parallel and compare them
    Sweep {
        #[command(flatten)]
        args: ScenarioArgs,

        #[command(flatten)]
        selection: SweepSelection,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SweepSelection {
    /// Hop budgets to compare on the configured scenario
    #[arg(long, num_args = 1..)]
    hop_budgets: Vec<u32>,

    /// Compare the baseline, high_load, low_hop and large_grid grids
    #[arg(long)]
    presets: bool,

    /// JSON sweep file listing the runs
    #[arg(long)]
    plan: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    /// JSON scenario file. Without it a grid scenario is built from the flags below.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Grid rows
    #[arg(long, default_value_t = 4)]
    rows: u32,

    /// Grid columns
    #[arg(long, default_value_t = 4)]
    cols: u32,

    /// Arrival rate per node and frame, one value per class
    #[arg(long, num_args = 1.., default_values_t = [4.0, 4.0, 2.0])]
    lam: Vec<f64>,

    /// Transmission slots per node and frame
    #[arg(long, default_value_t = 10)]
    slots: usize,

    /// Hop budget of every class (overrides the scenario file)
    #[arg(long)]
    hop_budget: Option<u32>,

    /// Number of frames (overrides the scenario file)
    #[arg(long)]
    frames: Option<u64>,

    /// Random seed (overrides the scenario file)
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(long, default_value = "results")]
    out: PathBuf,
}

const DEFAULT_FRAMES: u64 = 500;
const DEFAULT_HOP_BUDGET: u32 = 8;

impl ScenarioArgs {
    fn build(&self) -> anyhow::Result<Scenario> {
        let mut scenario = match &self.scenario {
            Some(path) => load_scenario(path).with_context(|| format!("Failed to load scenario '{}'", path.display()))?,
            None => self.grid_scenario()?,
        };

        if let Some(hop_budget) = self.hop_budget {
            scenario = scenario.with_hop_budget(hop_budget)?;
        }
        if let Some(frames) = self.frames {
            scenario = scenario.with_frames(frames);
        }
        if let Some(seed) = self.seed {
            scenario = scenario.with_seed(seed);
        }
        Ok(scenario)
    }

    fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig { slots_per_node: self.slots, ..Default::default() }
    }

    fn grid_scenario(&self) -> anyhow::Result<Scenario> {
        if self.lam.is_empty() {
            bail!("At least one arrival rate is required");
        }

        let scenario = Scenario::grid(self.rows, self.cols, &self.lam, DEFAULT_HOP_BUDGET, self.scheduler_config())?;
        Ok(scenario.with_frames(DEFAULT_FRAMES))
    }

    /// Applies the frame and seed overrides to runs that were not built from these arguments.
    fn override_runs(&self, runs: Vec<SweepRun>) -> Vec<SweepRun> {
        runs.into_iter()
            .map(|mut run| {
                if let Some(frames) = self.frames {
                    run.scenario = run.scenario.with_frames(frames);
                }
                if let Some(seed) = self.seed {
                    run.scenario = run.scenario.with_seed(seed);
                }
                run
            })
            .collect()
    }
}

fn run(args: &ScenarioArgs) -> anyhow::Result<()> {
    let scenario = args.build()?;

    let mut memory = MemorySink::new();
    let summary = scenario.run("run", &mut memory)?;

    let mut jsonl = JsonLinesSink::create(args.out.join("run.jsonl"))?;
    for record in &memory.records {
        jsonl.record(record)?;
    }
    jsonl.finish()?;

    write_csv(args.out.join("summary.csv"), std::slice::from_ref(&summary))?;
    write_csv(args.out.join("rolling.csv"), &rolling_series(&memory.records, DEFAULT_ROLLING_WINDOW))?;

    log::info!("Finished. Summary: {:?}", summary);
    Ok(())
}

fn sweep(args: &ScenarioArgs, selection: &SweepSelection) -> anyhow::Result<()> {
    let runs = if let Some(plan) = &selection.plan {
        let runs = load_sweep(plan).with_context(|| format!("Failed to load sweep '{}'", plan.display()))?;
        args.override_runs(runs)
    } else if selection.presets {
        let frames = args.frames.unwrap_or(PRESET_FRAMES);
        let seed = args.seed.unwrap_or(PRESET_SEED);
        grid_sweep(&comparison_presets(), &args.scheduler_config(), frames, seed)?
    } else {
        hop_budget_sweep(&args.build()?, &selection.hop_budgets)?
    };

    let summaries = run_sweep(&runs, Some(args.out.as_path()))?;
    write_csv(args.out.join("comparison.csv"), &summaries)?;

    for summary in &summaries {
        log::info!(
            "{}: PDR {:.3}, mean latency {}",
            summary.label,
            summary.pdr,
            summary.mean_latency.map_or("-".to_string(), |latency| format!("{:.2}", latency))
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    logger::init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Run(args) => run(args),
        Command::Sweep { args, selection } => sweep(args, selection),
    }
}
