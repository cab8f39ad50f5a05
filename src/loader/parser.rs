use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::api::scenario_dto::ScenarioDto;
use crate::error::Result;

/// Deserializes the JSON document stored at `file_path`.
///
/// A missing or unreadable file yields `Error::IoError`, malformed JSON or a shape mismatch
/// `Error::DeserializationError`.
pub fn parse_json_file<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T> {
    let reader = BufReader::new(File::open(file_path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn parse_scenario_str(json: &str) -> Result<ScenarioDto> {
    Ok(serde_json::from_str(json)?)
}
