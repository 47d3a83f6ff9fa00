use clap::Args;
use serde_json::{json, Value};

use smb_valuation_core::{Engine, EngineConfig};

/// Arguments for configuration validation
#[derive(Args)]
pub struct CheckConfigArgs {
    /// File to validate (falls back to --config, then the embedded configuration)
    #[arg(long)]
    pub file: Option<String>,
}

pub fn run_check_config(
    args: CheckConfigArgs,
    config: Option<&str>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let source = args.file.as_deref().or(config);
    let cfg = match source {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::embedded()?,
    };
    let discount_ceiling = cfg.discount_ceiling;
    let min_sample = cfg.market.min_sample;
    let engine = Engine::new(cfg)?;

    Ok(json!({
        "source": source.unwrap_or("embedded"),
        "valid": true,
        "sectors": engine.registry().len(),
        "discount_ceiling": discount_ceiling,
        "market_min_sample": min_sample,
    }))
}
