use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use smb_valuation_core::normalization::NormalizationInputs;
use smb_valuation_core::types::with_metadata;
use smb_valuation_core::FinancialStatement;

use super::build_engine;
use crate::input;

/// Arguments for EBITDA normalization
#[derive(Args)]
pub struct NormalizeArgs {
    /// Path to a JSON or YAML file with `statements` and `normalization`
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct NormalizeRequest {
    statements: Vec<FinancialStatement>,
    #[serde(default)]
    normalization: NormalizationInputs,
}

pub fn run_normalize(args: NormalizeArgs, config: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let request: NormalizeRequest = input::read_request(args.input.as_deref(), "normalize")?;
    let engine = build_engine(config)?;
    let report = engine.normalize_ebitda(request.statements, &request.normalization)?;
    let warnings = report.warnings.clone();
    Ok(serde_json::to_value(with_metadata(
        "Latest-year EBITDA normalization",
        warnings,
        report,
    ))?)
}
