use std::sync::OnceLock;

use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use smb_valuation_core::adjustments::QualitativeRisk;
use smb_valuation_core::normalization::NormalizationInputs;
use smb_valuation_core::{Engine, EngineConfig, FinancialStatement, ValuationRequest};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Engine over the embedded configuration, built on first use.
fn engine() -> NapiResult<&'static Engine> {
    static ENGINE: OnceLock<Result<Engine, String>> = OnceLock::new();
    ENGINE
        .get_or_init(|| Engine::with_defaults().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(to_napi_error)
}

#[derive(Deserialize)]
struct StatementsInput {
    statements: Vec<FinancialStatement>,
    #[serde(default)]
    normalization: NormalizationInputs,
    #[serde(default)]
    risk: QualitativeRisk,
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn valuate_company(input_json: String) -> NapiResult<String> {
    let request: ValuationRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = engine()?
        .valuate_company_envelope(&request)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Value with a caller-supplied YAML configuration instead of the embedded one.
#[napi]
pub fn valuate_company_with_config(input_json: String, config_yaml: String) -> NapiResult<String> {
    let request: ValuationRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = EngineConfig::from_yaml_str(&config_yaml).map_err(to_napi_error)?;
    let engine = Engine::new(config).map_err(to_napi_error)?;
    let output = engine
        .valuate_company_envelope(&request)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Normalization and scoring
// ---------------------------------------------------------------------------

#[napi]
pub fn normalize_ebitda(input_json: String) -> NapiResult<String> {
    let input: StatementsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = engine()?
        .normalize_ebitda(input.statements, &input.normalization)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn scan_statements(input_json: String) -> NapiResult<String> {
    let input: StatementsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = engine()?
        .scan_statements(input.statements, &input.normalization, &input.risk)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Sectors
// ---------------------------------------------------------------------------

#[napi]
pub fn lookup_sector(sector_code: String) -> NapiResult<String> {
    let m = engine()?.lookup_sector(&sector_code);
    let output = serde_json::json!({
        "requested": sector_code,
        "matched": m.kind,
        "profile": m.profile,
    });
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn list_sectors() -> NapiResult<String> {
    serde_json::to_string(engine()?.registry().profiles()).map_err(to_napi_error)
}
