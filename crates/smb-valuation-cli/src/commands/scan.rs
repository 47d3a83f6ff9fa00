use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use smb_valuation_core::adjustments::QualitativeRisk;
use smb_valuation_core::normalization::NormalizationInputs;
use smb_valuation_core::types::with_metadata;
use smb_valuation_core::FinancialStatement;

use super::build_engine;
use crate::input;

/// Arguments for the anomaly scan
#[derive(Args)]
pub struct ScanArgs {
    /// Path to a JSON or YAML file with `statements` and optional `normalization` / `risk`
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct ScanRequest {
    statements: Vec<FinancialStatement>,
    #[serde(default)]
    normalization: NormalizationInputs,
    #[serde(default)]
    risk: QualitativeRisk,
}

pub fn run_scan(args: ScanArgs, config: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ScanRequest = input::read_request(args.input.as_deref(), "scan")?;
    let engine = build_engine(config)?;
    let outcome =
        engine.scan_statements(request.statements, &request.normalization, &request.risk)?;
    Ok(serde_json::to_value(with_metadata(
        "Rule-based anomaly scan and confidence grade",
        Vec::new(),
        outcome,
    ))?)
}
