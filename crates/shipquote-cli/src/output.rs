use serde_json::Value;

use crate::error::CliError;

pub fn render(document: &Value, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };
    println!("{payload}");

    Ok(())
}
