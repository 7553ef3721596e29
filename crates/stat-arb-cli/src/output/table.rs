use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten_scalars, format_scalar, record_arrays};

/// Format output as tables: one Field/Value table for the scalar results,
/// then one table per list of records (trades, ledger, sweep rows).
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result_table(result, map),
            None => print_field_table(value),
        },
        Value::Array(arr) => print_records(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    print_field_table(result);

    for (name, records) in record_arrays(result) {
        println!("\n{}:", name);
        print_records(records);
    }

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

fn print_field_table(value: &Value) {
    let mut rows = Vec::new();
    flatten_scalars("", value, &mut rows);
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in rows {
        builder.push_record([key, val]);
    }
    println!("{}", Table::from(builder));
}

fn print_records(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", format_scalar(item));
        }
        return;
    };

    let mut headers = Vec::new();
    flatten_scalars("", &Value::Object(first.clone()), &mut headers);
    let headers: Vec<String> = headers.into_iter().map(|(k, _)| k).collect();

    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for item in arr {
        let mut cells = Vec::new();
        flatten_scalars("", item, &mut cells);
        let row: Vec<String> = headers
            .iter()
            .map(|h| {
                cells
                    .iter()
                    .find(|(k, _)| k == h)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            })
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}
