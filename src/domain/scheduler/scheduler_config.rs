use crate::error::ConversionError;

pub const DEFAULT_STEP_SIZE: f64 = 0.05;
pub const DEFAULT_HOP_PENALTY: f64 = 0.5;
pub const DEFAULT_SLOTS_PER_NODE: usize = 1;
pub const DEFAULT_THROUGHPUT_DECAY: f64 = 0.1;

/// Tuning knobs of the scheduler core. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Mirror-descent step size η.
    pub step_size: f64,

    /// Hop penalty coefficient β.
    pub hop_penalty: f64,

    /// Transmission slots per node and frame.
    pub slots_per_node: usize,

    /// Weight α of the newest observation in the throughput moving average.
    pub throughput_decay: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            hop_penalty: DEFAULT_HOP_PENALTY,
            slots_per_node: DEFAULT_SLOTS_PER_NODE,
            throughput_decay: DEFAULT_THROUGHPUT_DECAY,
        }
    }
}

impl SchedulerConfig {
    /// Rejects configurations the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConversionError> {
        if !self.step_size.is_finite() || self.step_size < 0.0 {
            return Err(ConversionError::InvalidConfiguration(format!("Step size must be a non-negative number, got {}", self.step_size)));
        }

        if !self.hop_penalty.is_finite() || self.hop_penalty < 0.0 {
            return Err(ConversionError::InvalidConfiguration(format!("Hop penalty must be a non-negative number, got {}", self.hop_penalty)));
        }

        if self.slots_per_node == 0 {
            return Err(ConversionError::InvalidConfiguration("Every node needs at least one transmission slot per frame".to_string()));
        }

        if !(self.throughput_decay > 0.0 && self.throughput_decay <= 1.0) {
            return Err(ConversionError::InvalidConfiguration(format!("Throughput decay must lie in (0, 1], got {}", self.throughput_decay)));
        }

        Ok(())
    }
}
