use serde_json::Value;

/// Print just the headline answer.
///
/// A valuation prints its equity price range; other outputs fall back to
/// well-known fields, then to the first field of the result.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(price) = result_obj.get("equity_price") {
        println!(
            "{} - {}",
            format_minimal(&price["low"]),
            format_minimal(&price["high"])
        );
        return;
    }

    let priority_keys = ["normalized_ebitda", "confidence", "profile", "valid"];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", headline(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

/// Pull the scalar out of the nested objects the priority keys point at.
fn headline(value: &Value) -> String {
    for inner in ["value", "grade", "code"] {
        if let Some(v) = value.get(inner) {
            return format_minimal(v);
        }
    }
    format_minimal(value)
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
