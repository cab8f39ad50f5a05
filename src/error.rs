use thiserror::Error;

use crate::domain::utils::id::{ClassId, NodeId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse scenario JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to read or write CSV data: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to build simulation model: {0}")]
    ModelConstructionError(#[from] ConversionError),

    #[error("Simulation run '{0}' panicked")]
    RunPanicked(String),
}

/// Errors raised while turning scenario DTOs into validated domain objects.
///
/// All of these are fatal at startup: no frame is simulated once one of them occurred.
#[derive(Debug, Error, PartialEq)]
pub enum ConversionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown utility function: {0}")]
    UnknownUtility(String),

    #[error("Topology contains no nodes")]
    EmptyTopology,
}

/// Recoverable conditions of the scheduler core.
///
/// None of them is ever propagated as fatal. The weight updater and the slot projector skip the
/// affected queue for the current frame, the frame driver turns `HopBudgetExhausted` into a drop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Queue ({node}, {class}) is empty")]
    EmptyQueueAccess { node: NodeId, class: ClassId },

    #[error("No usable path from {from} to {to}")]
    UnreachableDestination { from: NodeId, to: NodeId },

    #[error("Packet {packet} at {holder} has no hop budget left")]
    HopBudgetExhausted { packet: u64, holder: NodeId },
}

pub type Result<T> = std::result::Result<T, Error>;
