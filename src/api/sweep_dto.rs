use serde::Deserialize;

use crate::api::scenario_dto::SchedulerDto;

/// Root object of a sweep file: shared settings plus one entry per run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepDto {
    pub frames: u64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub scheduler: SchedulerDto,
    pub runs: Vec<GridRunDto>,
}

/// A grid scenario with one SAP class per arrival rate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRunDto {
    pub label: String,
    pub rows: u32,
    pub cols: u32,
    pub hop_budget: u32,
    pub lam: Vec<f64>,
}
