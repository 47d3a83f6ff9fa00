//! Multi-method valuation.
//!
//! The sector profile decides which methods run and how they are weighted; the
//! valuator walks that list generically. A method whose prerequisites are
//! missing is excluded with a flag and the remaining weights are renormalized.

pub mod asset;
pub mod blend;
pub mod dcf;
pub mod method;
pub mod multiples;

pub use asset::{value_by_assets, AssetRevaluation};
pub use blend::{blend, profitability_score, BlendedValuation, ProfitabilitySignals};
pub use dcf::value_by_dcf;
pub use method::{AppliedFactor, MethodResult};
pub use multiples::{band_delta, effective_range, value_by_multiple, BandDelta, MarketStatistics};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EngineConfig, LocationTier};
use crate::error::ValuationError;
use crate::flags::{ExclusionReason, ValuationFlag};
use crate::normalization::NormalizedEbitda;
use crate::sector::{MethodId, SectorProfile};
use crate::statements::StatementSeries;
use crate::types::Money;
use crate::EngineResult;

/// Request-level inputs that are not part of the statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValuationContext<'a> {
    pub location: Option<LocationTier>,
    pub market: Option<&'a MarketStatistics>,
    pub revaluations: &'a [AssetRevaluation],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationOutcome {
    pub blended: BlendedValuation,
    /// Contributing methods in profile order
    pub methods: Vec<MethodResult>,
    pub flags: Vec<ValuationFlag>,
}

/// Value the company with every method the profile enables.
pub fn valuate(
    normalized: &NormalizedEbitda,
    series: &StatementSeries,
    profile: &SectorProfile,
    ctx: &ValuationContext<'_>,
    config: &EngineConfig,
) -> EngineResult<ValuationOutcome> {
    let latest = series.latest();
    let growth = series.trailing_revenue_growth();
    let delta = band_delta(latest.revenue, ctx.location, growth, &config.multiple_bands);

    let mut methods = Vec::with_capacity(profile.methods.len());
    let mut flags = Vec::new();

    if let Some(m) = ctx.market {
        let uses_multiples = profile.applies(MethodId::RevenueMultiple)
            || profile.applies(MethodId::EbitdaMultiple);
        if uses_multiples && m.transaction_count < config.market.min_sample {
            flags.push(ValuationFlag::MarketDataIgnored {
                transactions: m.transaction_count,
                min_sample: config.market.min_sample,
            });
        }
    }

    for entry in &profile.methods {
        let method = entry.method;
        let outcome = match method {
            MethodId::RevenueMultiple | MethodId::EbitdaMultiple => {
                let basis = if method == MethodId::RevenueMultiple {
                    revenue_basis(latest.revenue)
                } else {
                    ebitda_basis(normalized.value)
                };
                match basis {
                    Ok(basis) => {
                        let sector_range = profile.range_for(method).ok_or_else(|| {
                            ValuationError::Configuration(format!(
                                "sector '{}': no range for {method}",
                                profile.code
                            ))
                        })?;
                        let eff = effective_range(method, sector_range, ctx.market, &config.market);
                        if let (Some(observed), Some(m)) = (eff.observed, ctx.market) {
                            flags.push(ValuationFlag::MarketDataBlended {
                                method,
                                transactions: m.transaction_count,
                                observed_multiple: observed,
                            });
                        }
                        let (result, unclamped) =
                            value_by_multiple(method, basis, eff.range, sector_range, &delta);
                        if let Some((unclamped_low, unclamped_high)) = unclamped {
                            flags.push(ValuationFlag::MultipleClamped {
                                method,
                                unclamped_low,
                                unclamped_high,
                            });
                        }
                        Ok(result)
                    }
                    Err(reason) => Err(reason),
                }
            }
            MethodId::DiscountedCashFlow => ebitda_basis(normalized.value)
                .map(|ebitda| value_by_dcf(ebitda, growth, &config.dcf)),
            MethodId::AssetBased => {
                value_by_assets(latest, ctx.revaluations, &config.asset).map(|mut r| {
                    r.floor = profile.asset_floor;
                    r
                })
            }
        };

        match outcome {
            Ok(result) => methods.push(result),
            Err(reason) => {
                debug!(method = %method, ?reason, sector = %profile.code, "method excluded");
                flags.push(ValuationFlag::InsufficientData { method, reason });
            }
        }
    }

    if let Some(floor) = methods.iter().find(|m| m.floor) {
        let lowest_other = methods
            .iter()
            .filter(|m| !m.floor)
            .map(|m| m.low)
            .min();
        if let Some(lowest_other) = lowest_other {
            if floor.high < lowest_other {
                flags.push(ValuationFlag::AssetFloorBelowEarnings {
                    asset_high: floor.high,
                    lowest_other,
                });
            }
        }
    }

    let signals = ProfitabilitySignals {
        net_margin: latest.net_margin(),
        benchmark_net_margin: profile.benchmark_net_margin,
        normalized_ebitda: normalized.value,
        revenue_growth: series.revenue_growth(),
    };

    let blended = blend(&mut methods, profile, &signals).ok_or_else(|| {
        ValuationError::InsufficientData(format!(
            "no valuation method of sector '{}' could be applied",
            profile.code
        ))
    })?;

    Ok(ValuationOutcome {
        blended,
        methods,
        flags,
    })
}

fn revenue_basis(revenue: Option<Money>) -> Result<Money, ExclusionReason> {
    match revenue {
        None => Err(ExclusionReason::MissingRevenue),
        Some(r) if r.is_zero() => Err(ExclusionReason::ZeroRevenue),
        Some(r) => Ok(r),
    }
}

fn ebitda_basis(ebitda: Option<Money>) -> Result<Money, ExclusionReason> {
    match ebitda {
        None => Err(ExclusionReason::MissingEbitda),
        Some(e) if e <= Decimal::ZERO => Err(ExclusionReason::NonPositiveEbitda),
        Some(e) => Ok(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::normalize;
    use crate::sector::SectorRegistry;
    use crate::statements::FinancialStatement;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn config() -> EngineConfig {
        EngineConfig::embedded().unwrap()
    }

    fn profile(code: &str) -> SectorProfile {
        let cfg = config();
        let registry = SectorRegistry::from_profiles(cfg.sectors).unwrap();
        registry.lookup(code).profile.clone()
    }

    fn series(statement: FinancialStatement) -> StatementSeries {
        StatementSeries::new(vec![statement]).unwrap()
    }

    fn services_statement() -> FinancialStatement {
        FinancialStatement {
            revenue: Some(dec!(1000000)),
            reported_ebitda: Some(dec!(150000)),
            net_result: Some(dec!(80000)),
            ..FinancialStatement::new(2024)
        }
    }

    #[test]
    fn test_generic_services_ebitda_range() {
        let s = series(services_statement());
        let n = normalize(s.latest(), &[]).unwrap();
        let out = valuate(&n, &s, &profile("default"), &ValuationContext::default(), &config()).unwrap();
        assert_eq!(out.methods.len(), 1);
        assert_eq!(out.blended.low, dec!(600000));
        assert_eq!(out.blended.high, dec!(900000));
        assert_eq!(out.blended.medium, dec!(750000));
    }

    #[test]
    fn test_negative_ebitda_excludes_and_renormalizes() {
        let mut st = services_statement();
        st.reported_ebitda = Some(dec!(-20000));
        let s = series(st);
        let n = normalize(s.latest(), &[]).unwrap();
        let out = valuate(&n, &s, &profile("restaurant"), &ValuationContext::default(), &config()).unwrap();
        assert_eq!(out.methods.len(), 1);
        assert_eq!(out.methods[0].method, MethodId::RevenueMultiple);
        assert_eq!(out.blended.weights[0].weight, Decimal::ONE);
        assert!(out.flags.contains(&ValuationFlag::InsufficientData {
            method: MethodId::EbitdaMultiple,
            reason: ExclusionReason::NonPositiveEbitda,
        }));
    }

    #[test]
    fn test_all_methods_excluded_is_an_error() {
        let s = series(FinancialStatement {
            revenue: Some(dec!(500000)),
            ..FinancialStatement::new(2024)
        });
        let n = normalize(s.latest(), &[]).unwrap();
        let err = valuate(&n, &s, &profile("default"), &ValuationContext::default(), &config()).unwrap_err();
        assert!(matches!(err, ValuationError::InsufficientData(_)));
    }

    #[test]
    fn test_small_market_sample_flagged() {
        let s = series(services_statement());
        let n = normalize(s.latest(), &[]).unwrap();
        let market = MarketStatistics {
            transaction_count: 2,
            average_ebitda_multiple: Some(dec!(9)),
            ..Default::default()
        };
        let ctx = ValuationContext {
            market: Some(&market),
            ..Default::default()
        };
        let out = valuate(&n, &s, &profile("default"), &ctx, &config()).unwrap();
        assert!(out
            .flags
            .iter()
            .any(|f| matches!(f, ValuationFlag::MarketDataIgnored { transactions: 2, .. })));
        assert_eq!(out.blended.low, dec!(600000));
    }

    #[test]
    fn test_asset_floor_reported_for_holding() {
        let s = series(FinancialStatement {
            revenue: Some(dec!(200000)),
            reported_ebitda: Some(dec!(150000)),
            equity: Some(dec!(100000)),
            ..FinancialStatement::new(2024)
        });
        let n = normalize(s.latest(), &[]).unwrap();
        let out = valuate(&n, &s, &profile("holding"), &ValuationContext::default(), &config()).unwrap();
        let asset = out
            .methods
            .iter()
            .find(|m| m.method == MethodId::AssetBased)
            .unwrap();
        assert!(asset.floor);
        assert!(out
            .flags
            .iter()
            .any(|f| matches!(f, ValuationFlag::AssetFloorBelowEarnings { .. })));
    }
}
