pub mod node;
pub mod topology;
