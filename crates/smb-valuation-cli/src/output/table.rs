use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) if result.contains_key("equity_price") => {
                print_valuation(result);
                print_footer(map);
            }
            Some(result) => {
                print_object(result);
                print_footer(map);
            }
            None => print_object(value),
        },
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", value),
    }
}

fn print_valuation(result: &Map<String, Value>) {
    let mut summary = Builder::default();
    summary.push_record(["", "Low", "Medium", "High"]);
    for (label, key) in [
        ("Blended EV", "blended"),
        ("Adjusted EV", "adjusted_enterprise_value"),
        ("Equity price", "equity_price"),
    ] {
        if let Some(band) = result.get(key) {
            summary.push_record([
                label.to_string(),
                field(band, "low"),
                field(band, "medium"),
                field(band, "high"),
            ]);
        }
    }
    println!("{}", Table::from(summary));

    if let Some(sector) = result.get("sector") {
        println!(
            "Sector: {} ({}), matched by {}",
            field(sector, "name"),
            field(sector, "code"),
            field(sector, "matched")
        );
    }
    if let Some(c) = result.get("confidence") {
        println!("Confidence: {} ({})", field(c, "grade").bold(), field(c, "score"));
    }

    if let Some(Value::Array(methods)) = result.get("methods") {
        println!("\n{}", "Methods".bold());
        let mut b = Builder::default();
        b.push_record(["Method", "Low", "High", "Weight", "Basis", "Rationale"]);
        for m in methods {
            b.push_record([
                field(m, "method"),
                field(m, "low"),
                field(m, "high"),
                field(m, "weight"),
                field(m, "basis"),
                field(m, "rationale"),
            ]);
        }
        println!("{}", Table::from(b));
    }

    if let Some(Value::Array(adjustments)) = result.get("adjustments") {
        if !adjustments.is_empty() {
            println!("\n{}", "Adjustments".bold());
            let mut b = Builder::default();
            b.push_record(["Kind", "Direction", "Rate", "Rationale"]);
            for a in adjustments {
                b.push_record([
                    field(a, "kind"),
                    field(a, "direction"),
                    field(a, "rate"),
                    field(a, "rationale"),
                ]);
            }
            println!("{}", Table::from(b));
        }
    }

    if let Some(Value::Array(anomalies)) = result.get("anomalies") {
        if !anomalies.is_empty() {
            println!("\n{}", "Anomalies".bold());
            let mut b = Builder::default();
            b.push_record(["Severity", "Kind", "Rule"]);
            for a in anomalies {
                b.push_record([field(a, "severity"), field(a, "kind"), field(a, "rule")]);
            }
            println!("{}", Table::from(b));
        }
    }
}

fn print_footer(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Flags:".yellow());
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    } else {
        println!("{}", format_value(value));
    }
}

fn print_rows(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            let row: Vec<String> = headers.iter().map(|h| field(item, h)).collect();
            builder.push_record(row);
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn field(value: &Value, key: &str) -> String {
    value.get(key).map(format_value).unwrap_or_default()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
