pub mod file;
pub mod stdin;

use portfolio_risk_core::config::EngineConfig;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Raw request JSON from `--input` or stdin with engine defaults filled in.
pub fn load_value(
    path: Option<&str>,
    config: Option<&EngineConfig>,
    what: &str,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut value = if let Some(path) = path {
        file::read_json_value(path)?
    } else if let Some(data) = stdin::read_stdin()? {
        data
    } else {
        return Err(format!("--input <file.json> or stdin required for {what}").into());
    };
    if let Some(cfg) = config {
        cfg.overlay(&mut value);
    }
    Ok(value)
}

/// Typed request; see [`load_value`].
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
    config: Option<&EngineConfig>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    let value = load_value(path, config, what)?;
    serde_json::from_value(value).map_err(|e| format!("Invalid {what} input: {e}").into())
}
