use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::domain::metrics::frame_record::FrameRecord;
use crate::domain::utils::rolling::RollingMean;
use crate::error::Result;

/// Aggregate outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Free-form name of the run, e.g. the swept parameter value.
    pub label: String,
    pub frames: u64,
    pub generated: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub expired: u64,

    /// Backlog after the last frame.
    pub still_queued: u64,

    /// Delivered share of all packets that left the network.
    pub pdr: f64,

    /// Mean of the per-frame PDR values.
    pub mean_frame_pdr: f64,

    /// Mean end-to-end latency of delivered packets in frames, empty if nothing was delivered.
    pub mean_latency: Option<f64>,
    pub max_frame_mean_latency: Option<f64>,

    #[serde(skip)]
    latency_sum: u64,
    #[serde(skip)]
    frame_pdr_sum: f64,
}

impl RunSummary {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), ..Default::default() }
    }

    /// Folds one more frame into the summary.
    pub fn absorb(&mut self, record: &FrameRecord) {
        let total = record.total();

        self.frames += 1;
        self.generated += total.generated;
        self.delivered += total.delivered;
        self.dropped += total.dropped;
        self.expired += total.expired;
        self.still_queued = total.queued;
        self.latency_sum += total.latency_sum;
        self.frame_pdr_sum += record.pdr();

        let finished = self.delivered + self.dropped + self.expired;
        self.pdr = self.delivered as f64 / finished.max(1) as f64;
        self.mean_frame_pdr = self.frame_pdr_sum / self.frames as f64;
        self.mean_latency = if self.delivered > 0 { Some(self.latency_sum as f64 / self.delivered as f64) } else { None };

        if let Some(frame_latency) = total.mean_latency() {
            self.max_frame_mean_latency = Some(self.max_frame_mean_latency.map_or(frame_latency, |max| max.max(frame_latency)));
        }
    }

    pub fn from_records<'a>(label: impl Into<String>, records: impl IntoIterator<Item = &'a FrameRecord>) -> Self {
        let mut summary = Self::new(label);
        for record in records {
            summary.absorb(record);
        }
        summary
    }
}

/// Smoothed PDR and latency at one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingPoint {
    pub frame: u64,
    pub pdr: f64,
    pub latency: f64,
}

/// Rolling means of the per-frame PDR and latency (frames without deliveries count as latency 0).
pub fn rolling_series(records: &[FrameRecord], window: usize) -> Vec<RollingPoint> {
    let mut pdr = RollingMean::new(window);
    let mut latency = RollingMean::new(window);

    records
        .iter()
        .filter_map(|record| {
            let pdr_mean = pdr.push(record.pdr());
            let latency_mean = latency.push(record.mean_latency().unwrap_or(0.0));
            match (pdr_mean, latency_mean) {
                (Some(pdr), Some(latency)) => Some(RollingPoint { frame: record.frame, pdr, latency }),
                _ => None,
            }
        })
        .collect()
}

/// Writes any serializable rows as a comma separated file with a header line.
pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut csv_wtr = csv::WriterBuilder::new().from_path(path)?;
    for row in rows {
        csv_wtr.serialize(row)?;
    }
    csv_wtr.flush()?;

    log::info!("Wrote {} row(s) to '{}'.", rows.len(), path.display());
    Ok(())
}
