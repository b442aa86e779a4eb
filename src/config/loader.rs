//! CSV-based config override loader
//!
//! Reads `key,value` rows such as `exit.selling_cost_rate,0.025`.

use crate::error::LoadError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default location of the engine override file
pub const DEFAULT_CONFIG_PATH: &str = "data/engine_config.csv";

/// Load override pairs from a CSV file with a `key,value` header
pub fn load_overrides(path: &Path) -> Result<Vec<(String, String)>, LoadError> {
    let file = File::open(path)?;
    load_overrides_from_reader(file)
}

/// Load override pairs from any reader
pub fn load_overrides_from_reader<R: Read>(reader: R) -> Result<Vec<(String, String)>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut overrides = Vec::new();
    for result in reader.records() {
        let record = result?;
        let key = record.get(0).unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        let value = record.get(1).unwrap_or_default();
        overrides.push((key.to_string(), value.to_string()));
    }

    Ok(overrides)
}
