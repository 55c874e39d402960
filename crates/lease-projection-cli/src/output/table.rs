use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::scalar;

/// Format output as tables: the headline result, then per-year rows.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else if let Some(Value::Array(results)) = map.get("results") {
                print_array_table(results);
                print_warnings(map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_flat_object(res_map),
        other => println!("{}", scalar(other, "null")),
    }

    if let Some(Value::Array(rows)) = envelope.get("rows") {
        println!();
        print_array_table(rows);
    }

    if let Some(Value::Object(validation)) = envelope.get("validation") {
        println!("\nValidation:");
        for (key, val) in validation {
            println!("  {}: {}", key, scalar(val, "null"));
        }
    }

    print_warnings(envelope);
}

fn print_warnings(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &scalar(val, "null")]);
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

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(|v| scalar(v, "")).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", scalar(item, "null"));
        }
    }
}
