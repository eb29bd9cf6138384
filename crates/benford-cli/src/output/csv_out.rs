use serde_json::{Map, Value};
use std::io;

/// Write output as CSV to stdout.
///
/// Arrays become one row per element. A result envelope becomes a two-column
/// `field,value` listing with nested objects flattened to dotted keys; the
/// per-digit table is written as `digits.<d>.<column>`.
pub fn print_csv(value: &Value) {
    write_csv(value, io::stdout().lock());
}

pub fn write_csv<W: io::Write>(value: &Value, out: W) {
    let mut wtr = csv::Writer::from_writer(out);

    match value {
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        Value::Object(map) => {
            let target = match map.get("result") {
                Some(Value::Object(result)) => result,
                _ => map,
            };
            let mut rows = Vec::new();
            flatten("", target, &mut rows);
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in rows {
                let _ = wtr.write_record([key.as_str(), val.as_str()]);
            }
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn flatten(prefix: &str, map: &Map<String, Value>, rows: &mut Vec<(String, String)>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => flatten(&name, inner, rows),
            Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => {
                for item in items.iter().filter_map(Value::as_object) {
                    let tag = item
                        .get("digit")
                        .map(format_csv_value)
                        .unwrap_or_else(|| rows.len().to_string());
                    flatten(&format!("{name}.{tag}"), item, rows);
                }
            }
            _ => rows.push((name, format_csv_value(val))),
        }
    }
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr.iter().filter_map(Value::as_object) {
            let row: Vec<String> = headers
                .iter()
                .map(|h| item.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr
            .iter()
            .map(format_csv_value)
            .collect::<Vec<_>>()
            .join(";"),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
