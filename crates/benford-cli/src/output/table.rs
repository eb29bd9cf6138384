use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => print_analysis(result, map),
            _ => print_fields(map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_analysis(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    if let Some(Value::Array(digits)) = result.get("digits") {
        print_digit_table(digits);
    }

    let mut summary = Map::new();
    for key in ["label", "sample_size", "excluded_values"] {
        if let Some(v) = result.get(key) {
            summary.insert(key.to_string(), v.clone());
        }
    }
    if let Some(Value::Object(metrics)) = result.get("metrics") {
        summary.extend(metrics.clone());
    }
    if let Some(Value::Object(chi)) = result.get("chi_square") {
        for key in ["statistic", "p_value"] {
            if let Some(v) = chi.get(key) {
                summary.insert(format!("chi2_{key}"), v.clone());
            }
        }
    }
    if let Some(Value::Object(test)) = result.get("test") {
        for key in [
            "hotelling_q",
            "hotelling_p",
            "combined_stat",
            "combined_p",
            "conforms",
            "trials",
            "seed",
        ] {
            if let Some(v) = test.get(key) {
                summary.insert(key.to_string(), v.clone());
            }
        }
    }
    println!();
    print_fields(&summary);

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_digit_table(digits: &[Value]) {
    let mut builder = Builder::default();
    builder.push_record(["Digit", "Observed", "Expected", "Observed %", "Expected %"]);
    for d in digits {
        let field = |k: &str| d.get(k).map(format_value).unwrap_or_default();
        let pct = |k: &str| {
            d.get(k)
                .and_then(Value::as_f64)
                .map(|p| format!("{:.2}", p * 100.0))
                .unwrap_or_default()
        };
        let expected = d
            .get("expected_count")
            .and_then(Value::as_f64)
            .map(|e| format!("{e:.2}"))
            .unwrap_or_default();
        builder.push_record([
            field("digit"),
            field("observed_count"),
            expected,
            pct("observed_pct"),
            pct("expected_pct"),
        ]);
    }
    println!("{}", Table::from(builder));
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr.iter().filter_map(Value::as_object) {
            let row: Vec<String> = headers
                .iter()
                .map(|h| item.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
