use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use smb_valuation_core::ValuationRequest;

use super::build_engine;
use crate::input;

/// Arguments for a full valuation
#[derive(Args)]
pub struct ValuateArgs {
    /// Path to a JSON or YAML valuation request (stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the request's sector code (code, alias or NAF code)
    #[arg(long)]
    pub sector: Option<String>,

    /// Override the fraction of shares being valued (e.g. 0.3)
    #[arg(long)]
    pub stake: Option<Decimal>,
}

pub fn run_valuate(args: ValuateArgs, config: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: ValuationRequest = input::read_request(args.input.as_deref(), "valuate")?;
    if let Some(sector) = args.sector {
        request.sector_code = sector;
    }
    if let Some(stake) = args.stake {
        request.risk.ownership_fraction = stake;
    }

    let engine = build_engine(config)?;
    let result = engine.valuate_company_envelope(&request)?;
    Ok(serde_json::to_value(result)?)
}
