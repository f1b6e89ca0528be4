use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::{RawCell, RawTable};
use crate::error::{RefineryError, Result};
use crate::observability::metrics as obs;

pub const RAW_EMPLOYEE: &str = "raw_employee";
pub const RAW_TIMESHEET: &str = "raw_timesheet";

/// Reads one landed table from an NDJSON file, one JSON object per line.
/// Scalars are coerced to their textual form; JSON nulls and missing keys
/// become missing cells. Placeholder spellings are left for the cleaners.
pub fn read_raw_table(path: &Path, table_name: &str) -> Result<RawTable> {
    match parse_ndjson_table(path, table_name) {
        Ok(table) => {
            obs::landing::table_read(table.row_count());
            debug!(
                path = %path.display(),
                table = table_name,
                rows = table.row_count(),
                "read landed table"
            );
            Ok(table)
        }
        Err(e) => {
            obs::landing::read_error();
            Err(e)
        }
    }
}

fn parse_ndjson_table(path: &Path, table_name: &str) -> Result<RawTable> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records: Vec<serde_json::Map<String, Value>> = Vec::new();
    let mut column_names: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value =
            serde_json::from_str(&line).map_err(|e| RefineryError::Landing {
                table: table_name.to_string(),
                message: format!("line {}: {}", index + 1, e),
            })?;
        let Value::Object(record) = value else {
            return Err(RefineryError::Landing {
                table: table_name.to_string(),
                message: format!("line {} is not a JSON object", index + 1),
            });
        };
        for key in record.keys() {
            if seen.insert(key.clone()) {
                column_names.push(key.clone());
            }
        }
        records.push(record);
    }

    let mut table = RawTable::new(table_name);
    for name in column_names {
        let cells: Vec<RawCell> = records
            .iter()
            .map(|record| record.get(&name).and_then(cell_text))
            .collect();
        table.push_column(name, cells)?;
    }
    Ok(table)
}

/// Already-typed landing values still flow through the textual cleaning
/// rules, so numbers and bools render as their display form. Nested values
/// keep their compact JSON text.
fn cell_text(value: &Value) -> RawCell {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        nested => Some(nested.to_string()),
    }
}

/// SHA-256 of the landed file, recorded per run so a staged batch can be
/// traced back to the exact source bytes.
pub fn source_fingerprint(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
