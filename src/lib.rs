use std::path::Path;

use crate::api::scenario_dto::ScenarioDto;
use crate::api::sweep_dto::SweepDto;
use crate::domain::simulator::scenario::Scenario;
use crate::domain::simulator::sweep::SweepRun;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Reads a scenario file and turns it into a validated [`Scenario`].
pub fn load_scenario(file_path: impl AsRef<Path>) -> Result<Scenario> {
    let file_path = file_path.as_ref();

    let dto: ScenarioDto = parse_json_file(file_path)?;
    log::info!("Scenario file '{}' parsed successfully.", file_path.display());

    let scenario = Scenario::try_from(dto)?;
    log::info!("Scenario constructed: {} node(s), {} class(es).", scenario.topology.num_of_nodes(), scenario.classes.len());

    Ok(scenario)
}

/// Reads a sweep file and builds one validated run per entry.
pub fn load_sweep(file_path: impl AsRef<Path>) -> Result<Vec<SweepRun>> {
    let file_path = file_path.as_ref();

    let dto: SweepDto = parse_json_file(file_path)?;
    log::info!("Sweep file '{}' lists {} run(s).", file_path.display(), dto.runs.len());

    Ok(Vec::<SweepRun>::try_from(dto)?)
}
