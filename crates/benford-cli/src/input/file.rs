use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

/// Read a list of numbers, one or more per line, comma separated.
pub fn read_values(path: &str) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_values(&contents).map_err(|e| format!("'{}': {}", canonical.display(), e).into())
}

/// Parse comma separated numbers.
///
/// A first row with no numeric field is treated as a header. Empty fields are
/// skipped; any other non-numeric field is an error.
pub fn parse_values(text: &str) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut values = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        if row == 0 && record.iter().all(|f| f.parse::<f64>().is_err()) {
            continue;
        }
        for field in record.iter().filter(|f| !f.is_empty()) {
            let v: f64 = field
                .parse()
                .map_err(|_| format!("line {}: '{}' is not a number", row + 1, field))?;
            values.push(v);
        }
    }
    Ok(values)
}

/// Resolve and validate the path.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }
    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }
    Ok(canonical)
}
