pub mod metrics;
pub mod network;
pub mod scheduler;
pub mod simulator;
pub mod traffic;
pub mod utils;
