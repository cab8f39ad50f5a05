pub mod scenario_dto;
pub mod sweep_dto;
