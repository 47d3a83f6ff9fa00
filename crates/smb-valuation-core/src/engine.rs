//! Request-level orchestration.
//!
//! [`Engine`] owns the immutable configuration and sector registry behind
//! `Arc`s; cloning it is cheap and every call is a pure function of the request.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adjustments::{
    apply, build_chain, validate_risk, Adjustment, NetDebtBridge, QualitativeRisk,
    StackedFactors, ValueBand,
};
use crate::config::{EngineConfig, LocationTier};
use crate::error::ValuationError;
use crate::flags::ValuationFlag;
use crate::normalization::{
    adjustments_from_inputs, normalize, DebtLikeItems, EbitdaSource, NormalizationInputs,
    NormalizedEbitda,
};
use crate::scoring::{grade, scan, Anomaly, ConfidenceReport, ScanReport};
use crate::sector::{Direction, MatchKind, SectorMatch, SectorRegistry};
use crate::statements::{check_amount, FinancialStatement, StatementSeries};
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate};
use crate::valuation::{
    valuate, AssetRevaluation, BlendedValuation, MarketStatistics, MethodResult, ValuationContext,
};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValuationRequest {
    /// Sector code, alias or classification code (e.g. a NAF code)
    pub sector_code: String,
    /// One to three fiscal years, most recent first
    pub statements: Vec<FinancialStatement>,
    #[serde(default)]
    pub normalization: NormalizationInputs,
    #[serde(default)]
    pub risk: QualitativeRisk,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<MarketStatistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationTier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub asset_revaluations: Vec<AssetRevaluation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub off_balance_guarantees: Option<Money>,
    #[serde(default)]
    pub currency: Currency,
}

/// Profile the request was valued against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSector {
    pub requested: String,
    pub code: String,
    pub name: String,
    pub matched: MatchKind,
}

impl ResolvedSector {
    fn from_match(requested: &str, m: &SectorMatch<'_>) -> Self {
        ResolvedSector {
            requested: requested.to_string(),
            code: m.profile.code.clone(),
            name: m.profile.name.clone(),
            matched: m.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub currency: Currency,
    pub sector: ResolvedSector,
    pub normalized_ebitda: NormalizedEbitda,
    pub methods: Vec<MethodResult>,
    pub blended: BlendedValuation,
    pub adjustments: Vec<Adjustment>,
    pub factors: StackedFactors,
    pub adjusted_enterprise_value: ValueBand,
    pub net_debt: NetDebtBridge,
    pub ownership_fraction: Rate,
    pub equity_price: ValueBand,
    pub confidence: ConfidenceReport,
    pub anomalies: Vec<Anomaly>,
    pub flags: Vec<ValuationFlag>,
}

/// Normalization without valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub normalized_ebitda: NormalizedEbitda,
    pub debt_like: DebtLikeItems,
    pub warnings: Vec<String>,
}

/// Anomaly scan and confidence grade without valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub scan: ScanReport,
    pub confidence: ConfidenceReport,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    registry: Arc<SectorRegistry>,
}

impl Engine {
    /// Validate the configuration and build the sector registry. Any profile
    /// problem is fatal here.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let registry = SectorRegistry::from_profiles(config.sectors.clone())?;
        info!(sectors = registry.len(), "valuation engine ready");
        Ok(Engine {
            config: Arc::new(config),
            registry: Arc::new(registry),
        })
    }

    /// Engine over the embedded configuration.
    pub fn with_defaults() -> EngineResult<Self> {
        Self::new(EngineConfig::embedded()?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &SectorRegistry {
        &self.registry
    }

    pub fn lookup_sector(&self, sector_code: &str) -> SectorMatch<'_> {
        self.registry.lookup(sector_code)
    }

    /// Normalize the latest year of `statements`.
    pub fn normalize_ebitda(
        &self,
        statements: Vec<FinancialStatement>,
        inputs: &NormalizationInputs,
    ) -> EngineResult<NormalizationReport> {
        let series = StatementSeries::new(statements)?;
        let latest = series.latest();
        let plan = adjustments_from_inputs(inputs, latest.revenue, &self.config)?;
        let normalized = normalize(latest, &plan.adjustments)?;
        Ok(NormalizationReport {
            normalized_ebitda: normalized,
            debt_like: plan.debt_like,
            warnings: plan.warnings,
        })
    }

    /// Scan and grade without valuing.
    pub fn scan_statements(
        &self,
        statements: Vec<FinancialStatement>,
        inputs: &NormalizationInputs,
        risk: &QualitativeRisk,
    ) -> EngineResult<ScanOutcome> {
        let series = StatementSeries::new(statements)?;
        let plan = adjustments_from_inputs(inputs, series.latest().revenue, &self.config)?;
        let normalized = normalize(series.latest(), &plan.adjustments)?;
        let report = scan(&series, risk, &self.config.scanner);
        let confidence = grade(&series, &normalized, &report, &self.config.confidence);
        Ok(ScanOutcome {
            scan: report,
            confidence,
        })
    }

    /// Value a company end to end.
    pub fn valuate_company(&self, req: &ValuationRequest) -> EngineResult<ValuationResult> {
        let series = StatementSeries::new(req.statements.clone())?;
        validate_risk(&req.risk)?;
        for r in &req.asset_revaluations {
            check_amount(&format!("asset_revaluations[{}]", r.label), r.delta)?;
        }
        if let Some(g) = req.off_balance_guarantees {
            check_amount("off_balance_guarantees", g)?;
            if g < Decimal::ZERO {
                return Err(ValuationError::invalid(
                    "off_balance_guarantees",
                    format!("must not be negative (got {g})"),
                ));
            }
        }

        let cfg = &self.config;
        let latest = series.latest();
        let mut flags = Vec::new();

        let sector_match = self.registry.lookup(&req.sector_code);
        let profile = sector_match.profile;
        match &sector_match.kind {
            MatchKind::Exact => {}
            MatchKind::Prefix { prefix } => flags.push(ValuationFlag::SectorPrefixMatch {
                requested: req.sector_code.clone(),
                prefix: prefix.clone(),
            }),
            MatchKind::Default => flags.push(ValuationFlag::UnknownSector {
                requested: req.sector_code.clone(),
            }),
        }

        let plan = adjustments_from_inputs(&req.normalization, latest.revenue, cfg)?;
        flags.extend(
            plan.warnings
                .iter()
                .map(|w| ValuationFlag::NormalizationIncomplete { detail: w.clone() }),
        );
        let normalized = normalize(latest, &plan.adjustments)?;
        if normalized.partial_data && normalized.source == EbitdaSource::Derived {
            flags.push(ValuationFlag::PartialEbitdaData);
        }

        let ctx = ValuationContext {
            location: req.location,
            market: req.market.as_ref(),
            revaluations: &req.asset_revaluations,
        };
        let outcome = valuate(&normalized, &series, profile, &ctx, cfg)?;
        flags.extend(outcome.flags);

        let (chain, chain_flags) = build_chain(&req.risk, profile, &cfg.adjustments)?;
        flags.extend(chain_flags);

        let mut blended = outcome.blended;
        let premiums = chain
            .iter()
            .filter(|a| a.direction == Direction::Premium)
            .count();
        blended.apply_sentiment(premiums, chain.len() - premiums);

        let bridge = NetDebtBridge::build(latest, &plan.debt_like, req.off_balance_guarantees);
        let adjusted = apply(
            &blended,
            chain,
            bridge,
            req.risk.ownership_fraction,
            cfg.discount_ceiling,
        );
        flags.extend(adjusted.flags);

        let report = scan(&series, &req.risk, &cfg.scanner);
        let confidence = grade(&series, &normalized, &report, &cfg.confidence);

        debug!(
            methods = outcome.methods.len(),
            adjustments = adjusted.adjustments.len(),
            anomalies = report.anomalies.len(),
            "valuation assembled"
        );
        info!(
            sector = %profile.code,
            low = %adjusted.equity_price.low,
            high = %adjusted.equity_price.high,
            grade = %confidence.grade,
            "company valued"
        );

        Ok(ValuationResult {
            currency: req.currency.clone(),
            sector: ResolvedSector::from_match(&req.sector_code, &sector_match),
            normalized_ebitda: normalized,
            methods: outcome.methods,
            blended,
            adjustments: adjusted.adjustments,
            factors: adjusted.factors,
            adjusted_enterprise_value: adjusted.adjusted_enterprise_value,
            net_debt: adjusted.net_debt,
            ownership_fraction: adjusted.ownership_fraction,
            equity_price: adjusted.equity_price,
            confidence,
            anomalies: report.anomalies,
            flags,
        })
    }

    /// [`Engine::valuate_company`] wrapped in the standard output envelope; the
    /// envelope warnings list the flag codes.
    pub fn valuate_company_envelope(
        &self,
        req: &ValuationRequest,
    ) -> EngineResult<ComputationOutput<ValuationResult>> {
        let result = self.valuate_company(req)?;
        let warnings = result.flags.iter().map(|f| f.code().to_string()).collect();
        Ok(with_metadata(
            "Sector-weighted multi-method valuation with multiplicative adjustments",
            warnings,
            result,
        ))
    }
}
