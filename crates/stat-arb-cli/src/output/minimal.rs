use serde_json::Value;

use super::format_scalar;

// Headline fields, in order of priority
const PRIORITY_KEYS: [&str; 3] = ["total_return", "best_total_return", "beta"];

/// Print just the headline number from the output, falling back to the
/// first field of the result.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                return format_scalar(val);
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_scalar(val));
        }
    }

    format_scalar(result_obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backtest_headline() {
        let v = json!({"result": {"beta": 0.5, "total_return": 0.125}});
        assert_eq!(minimal_line(&v), "0.125");
    }

    #[test]
    fn test_sweep_headline_skips_null() {
        let v = json!({"result": {"best_total_return": null, "beta": 0.5}});
        assert_eq!(minimal_line(&v), "0.5");
    }
}
