use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a result value in the appropriate format. Text mode prints just
/// the value so it can be piped into other tools.
pub fn output_value(output_format: &OutputFormat, message: &str, value: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "message": message,
                "value": value,
            });
            if let (Some(Value::Object(extra)), Some(map)) = (data, response.as_object_mut()) {
                map.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("{}", value);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let response = json!({
                "error": {
                    "code": error_code,
                    "message": message,
                }
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}
