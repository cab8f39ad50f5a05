use serde::Deserialize;

use crate::domain::network::node::Position;

/// Root object of a scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    pub frames: u64,
    #[serde(default)]
    pub seed: u64,
    pub max_packet_age: Option<u64>,
    pub topology: TopologyDto,
    #[serde(default)]
    pub scheduler: SchedulerDto,
    pub classes: Vec<SapClassDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "typ", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TopologyDto {
    Line {
        num_of_nodes: u32,
    },
    Grid {
        rows: u32,
        cols: u32,
        #[serde(default = "default_spacing")]
        spacing: f64,
    },
    EdgeList {
        /// Isolated nodes which appear in no edge.
        #[serde(default)]
        nodes: Vec<u32>,
        edges: Vec<(u32, u32)>,
    },
    /// Header-less CSV file, one `a,b` edge per row.
    EdgeListFile {
        path: String,
    },
    UnitDisk {
        positions: Vec<Position>,
        radius: f64,
    },
}

fn default_spacing() -> f64 {
    1.0
}

/// Unset fields fall back to the scheduler defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerDto {
    pub step_size: Option<f64>,
    pub hop_penalty: Option<f64>,
    pub slots_per_node: Option<usize>,
    pub throughput_decay: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SapClassDto {
    pub id: u32,
    pub name: Option<String>,
    pub arrival_rate: f64,
    pub priority: f64,
    pub target_rate: f64,
    pub hop_budget: u32,
    pub utility: Option<String>,
}
