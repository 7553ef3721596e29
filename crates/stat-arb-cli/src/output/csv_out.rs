use serde_json::Value;
use std::io;

use super::{flatten_scalars, format_scalar, record_arrays};

/// Write output as CSV to stdout.
///
/// A sweep writes one row per combination; any other result is written as
/// `field,value` pairs with nested fields flattened to dotted names.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let sweep_rows = record_arrays(result)
        .into_iter()
        .find(|(name, _)| *name == "results")
        .map(|(_, rows)| rows);

    match (sweep_rows, result) {
        (Some(rows), _) => write_records(&mut wtr, rows),
        (None, Value::Array(arr)) => write_records(&mut wtr, arr),
        (None, Value::Object(_)) => {
            let mut pairs = Vec::new();
            flatten_scalars("", result, &mut pairs);
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in pairs {
                let _ = wtr.write_record([key, val]);
            }
        }
        (None, _) => {
            let _ = wtr.write_record([&format_scalar(result)]);
        }
    }

    let _ = wtr.flush();
}

fn write_records<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    let Some(first) = arr.first() else {
        return;
    };

    let mut header_pairs = Vec::new();
    flatten_scalars("", first, &mut header_pairs);
    let headers: Vec<String> = header_pairs.into_iter().map(|(k, _)| k).collect();
    let _ = wtr.write_record(&headers);

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
        let _ = wtr.write_record(&row);
    }
}
