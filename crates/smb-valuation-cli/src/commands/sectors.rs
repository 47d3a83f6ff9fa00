use clap::Args;
use serde_json::{json, Value};

use smb_valuation_core::sector::SectorProfile;

use super::build_engine;

/// Arguments for the sector catalogue
#[derive(Args)]
pub struct SectorsArgs {
    /// Resolve this code (exact, classification prefix, or default fallback)
    #[arg(long)]
    pub code: Option<String>,
}

pub fn run_sectors(args: SectorsArgs, config: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let engine = build_engine(config)?;

    if let Some(code) = args.code {
        let m = engine.lookup_sector(&code);
        return Ok(json!({
            "requested": code,
            "matched": m.kind,
            "profile": m.profile,
        }));
    }

    let rows: Vec<Value> = engine.registry().profiles().iter().map(summary).collect();
    Ok(Value::Array(rows))
}

fn summary(p: &SectorProfile) -> Value {
    let methods: Vec<String> = p
        .methods
        .iter()
        .map(|m| format!("{} {}", m.method, m.weight))
        .collect();
    let range = |r: Option<smb_valuation_core::sector::MultipleRange>| {
        r.map(|r| format!("{}-{}x", r.min, r.max)).unwrap_or_default()
    };
    json!({
        "code": p.code,
        "name": p.name,
        "methods": methods.join(", "),
        "revenue_multiple": range(p.revenue_multiple),
        "ebitda_multiple": range(p.ebitda_multiple),
        "asset_floor": p.asset_floor,
        "factors": p.adjustment_factors.len(),
    })
}
