use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::meta::sanitize::sanitize_key;

pub fn show(name: &str, output_format: &OutputFormat) -> anyhow::Result<()> {
    output_value(output_format, "Sanitized key", &sanitize_key(name), None)
}
