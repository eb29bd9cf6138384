use serde_json::Value;

/// Print just the headline answer.
///
/// Full analyses print the combined p-value and verdict, metrics-only runs
/// print MAD, batch runs print one `filename p_value verdict` line per input.
pub fn print_minimal(value: &Value) {
    if let Value::Array(rows) = value {
        for row in rows {
            println!(
                "{} {} {}",
                field(row, "filename"),
                field(row, "p_value"),
                field(row, "is_benford")
            );
        }
        return;
    }

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(test) = result.get("test").filter(|t| !t.is_null()) {
        println!("{} {}", field(test, "combined_p"), verdict(test));
        return;
    }
    if let Some(chi) = result.get("chi_square") {
        println!("{}", field(chi, "p_value"));
        return;
    }
    if let Some(mad) = result.get("mad") {
        println!("{}", format_minimal(mad));
        return;
    }
    println!("{}", format_minimal(result));
}

fn verdict(test: &Value) -> &'static str {
    match test.get("conforms").and_then(Value::as_bool) {
        Some(true) => "conforms",
        Some(false) => "deviates",
        None => "unknown",
    }
}

fn field(value: &Value, key: &str) -> String {
    value.get(key).map(format_minimal).unwrap_or_else(|| "-".into())
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
