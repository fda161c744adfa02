use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Print a command result: one JSON object, or a check line followed by `key: value` rows
pub fn output_success<T: Serialize>(output_format: OutputFormat, message: &str, details: &T) -> anyhow::Result<()> {
    let details = match serde_json::to_value(details)? {
        Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("result".to_string(), other);
            map
        }
    };

    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "success": true, "message": message });
            if let Some(body) = response.as_object_mut() {
                body.extend(details);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            for (key, value) in details {
                println!("  {:<10} {}", format!("{}:", key), value);
            }
        }
    }
    Ok(())
}
