pub mod hop_aware_scheduler;
pub mod queue_state;
pub mod scheduler_config;
pub mod slot_projector;
pub mod utility;
pub mod weight_updater;
