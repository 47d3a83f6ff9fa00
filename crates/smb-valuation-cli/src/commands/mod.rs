pub mod config;
pub mod normalize;
pub mod scan;
pub mod sectors;
pub mod valuate;

use smb_valuation_core::{Engine, EngineConfig};
use tracing::debug;

/// Engine over `--config` when given, the embedded configuration otherwise.
pub fn build_engine(config: Option<&str>) -> Result<Engine, Box<dyn std::error::Error>> {
    debug!(config = config.unwrap_or("embedded"), "loading engine configuration");
    let cfg = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::embedded()?,
    };
    Ok(Engine::new(cfg)?)
}
