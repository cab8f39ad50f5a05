pub mod id;
pub mod rolling;
