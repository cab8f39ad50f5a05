pub mod frame_driver;
pub mod scenario;
pub mod sweep;
