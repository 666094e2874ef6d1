use anyhow::anyhow;

use crate::cli::utils::{output_error, output_value};
use crate::cli::OutputFormat;
use crate::error::ApiError;
use crate::sealing::{self, SealingKey};

pub fn generate_key(output_format: &OutputFormat) -> anyhow::Result<()> {
    let key = SealingKey::generate_base64();
    output_value(output_format, "Generated sealing key; export it as SEALING_KEY", &key, None)
}

pub fn seal(text: &str, output_format: &OutputFormat) -> anyhow::Result<()> {
    match sealing::seal(Some(text)) {
        Ok(Some(sealed)) => output_value(output_format, "Sealed", &sealed, None),
        Ok(None) => Err(anyhow!("nothing to seal: input is empty")),
        Err(e) => {
            let api: ApiError = e.clone().into();
            output_error(output_format, &e.to_string(), api.error_code())?;
            Err(e.into())
        }
    }
}

pub fn open(sealed: &str, lenient: bool, output_format: &OutputFormat) -> anyhow::Result<()> {
    if lenient {
        return output_value(output_format, "Opened (lenient)", &sealing::open_lenient(sealed), None);
    }

    match sealing::open(sealed) {
        Ok(plain) => output_value(output_format, "Opened", &plain, None),
        Err(e) => {
            let api: ApiError = e.clone().into();
            output_error(output_format, &e.to_string(), api.error_code())?;
            Err(e.into())
        }
    }
}
