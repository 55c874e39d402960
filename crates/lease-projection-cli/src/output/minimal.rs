use serde_json::Value;

use super::scalar;

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority, then falls
/// back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    // Batch output: one status line per proposal
    if let Some(Value::Array(results)) = value.as_object().and_then(|m| m.get("results")) {
        for r in results {
            let id = r.get("proposal_id").map(|v| scalar(v, "")).unwrap_or_default();
            let status = r.get("status").map(|v| scalar(v, "")).unwrap_or_default();
            println!("{} {}", id, status);
        }
        return;
    }

    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "net_annualized_value",
        "fingerprint",
        "total_rent",
        "total_capex",
        "other_revenue_ratio",
        "npv_rent",
        "irr",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", scalar(val, "null"));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, scalar(val, "null"));
            return;
        }
    }

    println!("{}", scalar(result_obj, "null"));
}
