pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a scalar for a table cell or CSV field.
pub(crate) fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Flatten nested objects into dotted `(key, value)` pairs. Arrays are
/// left out; callers render them separately.
pub(crate) fn flatten_scalars(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_scalars(&path, val, out);
            }
        }
        Value::Array(_) => {}
        _ => out.push((prefix.to_string(), format_scalar(value))),
    }
}

/// Arrays of objects inside a result, such as trades or sweep rows.
pub(crate) fn record_arrays(result: &Value) -> Vec<(&str, &[Value])> {
    let Value::Object(map) = result else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, val)| match val {
            Value::Array(items) if items.first().is_some_and(Value::is_object) => {
                Some((key.as_str(), items.as_slice()))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_result() {
        let v = json!({"total_return": 0.5, "regression": {"alpha": 1.0, "beta": 2.0}, "trades": [1]});
        let mut out = Vec::new();
        flatten_scalars("", &v, &mut out);
        assert!(out.contains(&("regression.beta".to_string(), "2.0".to_string())));
        assert!(out.iter().all(|(k, _)| k != "trades"));
    }

    #[test]
    fn test_record_arrays_only_objects() {
        let v = json!({"trades": [{"a": 1}], "values": [1, 2], "empty": []});
        let arrays = record_arrays(&v);
        assert_eq!(arrays.len(), 1);
        assert_eq!(arrays[0].0, "trades");
    }
}
