use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::metrics::frame_record::FrameRecord;
use crate::error::Result;

/// Consumer of the per-frame records of a run.
pub trait MetricsSink {
    fn record(&mut self, record: &FrameRecord) -> Result<()>;

    /// Called once after the last frame.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub records: Vec<FrameRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsSink for MemorySink {
    fn record(&mut self, record: &FrameRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Writes one JSON document per frame and line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
}

impl JsonLinesSink<File> {
    /// Creates (or truncates) the file at `path`, including missing parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: BufWriter::new(writer) }
    }

    pub fn into_inner(self) -> std::result::Result<W, std::io::Error> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> MetricsSink for JsonLinesSink<W> {
    fn record(&mut self, record: &FrameRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
