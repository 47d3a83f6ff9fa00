//! Revenue and EBITDA multiples.
//!
//! The sector range is first blended with observed market multiples (when the
//! sample is large enough), then shifted by relative size, location and growth
//! deltas, and finally clamped into the sector's configured range.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::method::{AppliedFactor, MethodResult};
use crate::config::{LocationTier, MarketSettings, MultipleBands};
use crate::sector::{MethodId, MultipleRange};
use crate::types::{round_money, round_rate, Money, Multiple, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Transaction statistics supplied by an upstream collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketStatistics {
    pub transaction_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_revenue_multiple: Option<Multiple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_ebitda_multiple: Option<Multiple>,
}

impl MarketStatistics {
    pub fn observed_for(&self, method: MethodId) -> Option<Multiple> {
        match method {
            MethodId::RevenueMultiple => self.average_revenue_multiple,
            MethodId::EbitdaMultiple => self.average_ebitda_multiple,
            _ => None,
        }
    }
}

/// Individual band contributions, each already bounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandDelta {
    pub size: Rate,
    pub location: Rate,
    pub growth: Rate,
    pub total: Rate,
}

/// Range used for one method once market data has been considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveRange {
    pub range: MultipleRange,
    /// Observed multiple blended in, if any
    pub observed: Option<Multiple>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Look up and bound the size, location and growth deltas.
pub fn band_delta(
    revenue: Option<Money>,
    location: Option<LocationTier>,
    growth: Option<Rate>,
    bands: &MultipleBands,
) -> BandDelta {
    let bound = |d: Rate, limit: Rate| d.max(-limit).min(limit);

    let size = revenue
        .and_then(|r| {
            bands
                .size
                .iter()
                .find(|b| b.revenue_up_to.map_or(true, |cap| r <= cap))
        })
        .map_or(Decimal::ZERO, |b| b.delta);

    let location = location
        .and_then(|tier| bands.location.iter().find(|b| b.tier == tier))
        .map_or(Decimal::ZERO, |b| b.delta);

    let growth = growth
        .and_then(|g| bands.growth.iter().rev().find(|b| g >= b.min_growth))
        .map_or(Decimal::ZERO, |b| b.delta);

    let size = bound(size, bands.max_band_delta);
    let location = bound(location, bands.max_band_delta);
    let growth = bound(growth, bands.max_band_delta);
    let total = bound(size + location + growth, bands.max_total_delta);

    BandDelta {
        size,
        location,
        growth,
        total,
    }
}

/// Blend the sector range with the observed market multiple when the sample
/// reaches `settings.min_sample`; otherwise the sector range is kept.
pub fn effective_range(
    method: MethodId,
    sector: MultipleRange,
    market: Option<&MarketStatistics>,
    settings: &MarketSettings,
) -> EffectiveRange {
    let observed = market
        .filter(|m| m.transaction_count >= settings.min_sample)
        .and_then(|m| m.observed_for(method))
        .filter(|obs| *obs > Decimal::ZERO);

    match observed {
        Some(obs) => {
            let w = settings.market_weight;
            let keep = Decimal::ONE - w;
            EffectiveRange {
                range: MultipleRange {
                    min: sector.min * keep + obs * w,
                    max: sector.max * keep + obs * w,
                },
                observed: Some(obs),
            }
        }
        None => EffectiveRange {
            range: sector,
            observed: None,
        },
    }
}

/// Apply the effective multiple range, shifted by the band delta, to a
/// positive basis. The applied multiples never leave `sector`.
pub fn value_by_multiple(
    method: MethodId,
    basis: Money,
    effective: MultipleRange,
    sector: MultipleRange,
    delta: &BandDelta,
) -> (MethodResult, Option<(Multiple, Multiple)>) {
    let factor = Decimal::ONE + delta.total;
    let raw_low = effective.min * factor;
    let raw_high = effective.max * factor;
    let (low_mult, low_clamped) = sector.clamp(raw_low);
    let (high_mult, high_clamped) = sector.clamp(raw_high);
    let clamped = low_clamped || high_clamped;

    let rationale = match method {
        MethodId::RevenueMultiple => "multiple.revenue_x_sector_range",
        _ => "multiple.ebitda_x_sector_range",
    };

    let result = MethodResult {
        method,
        low: round_money(basis * low_mult),
        high: round_money(basis * high_mult),
        weight: Decimal::ZERO,
        basis: round_money(basis),
        applied: AppliedFactor::Multiple {
            low: round_rate(low_mult),
            high: round_rate(high_mult),
            band_delta: round_rate(delta.total),
        },
        rationale: rationale.to_string(),
        clamped,
        floor: false,
    };
    let unclamped = clamped.then(|| (round_rate(raw_low), round_rate(raw_high)));
    (result, unclamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn range() -> MultipleRange {
        MultipleRange {
            min: dec!(4),
            max: dec!(6),
        }
    }

    #[test]
    fn test_neutral_bands_for_mid_sized_company() {
        let d = band_delta(Some(dec!(1000000)), None, None, &MultipleBands::default());
        assert_eq!(d.total, Decimal::ZERO);
    }

    #[test]
    fn test_small_company_lowers_multiple() {
        let d = band_delta(Some(dec!(300000)), None, None, &MultipleBands::default());
        assert_eq!(d.size, dec!(-0.10));
        let (r, unclamped) =
            value_by_multiple(MethodId::EbitdaMultiple, dec!(100000), range(), range(), &d);
        // Low 4 * 0.9 = 3.6 clamps back to 4; high 6 * 0.9 = 5.4
        assert_eq!(r.low, dec!(400000));
        assert_eq!(r.high, dec!(540000));
        assert!(r.clamped);
        assert_eq!(unclamped, Some((dec!(3.6), dec!(5.4))));
    }

    #[test]
    fn test_total_delta_bounded() {
        let mut bands = MultipleBands::default();
        bands.max_total_delta = dec!(0.12);
        let d = band_delta(
            Some(dec!(50000000)),
            Some(LocationTier::Prime),
            Some(dec!(0.30)),
            &bands,
        );
        assert_eq!(d.size + d.location + d.growth, dec!(0.25));
        assert_eq!(d.total, dec!(0.12));
    }

    #[test]
    fn test_growth_band_selection() {
        let bands = MultipleBands::default();
        assert_eq!(band_delta(None, None, Some(dec!(-0.20)), &bands).growth, dec!(-0.10));
        assert_eq!(band_delta(None, None, Some(dec!(0.02)), &bands).growth, Decimal::ZERO);
        assert_eq!(band_delta(None, None, Some(dec!(0.15)), &bands).growth, dec!(0.05));
    }

    #[test]
    fn test_market_blend_requires_sample() {
        let settings = MarketSettings::default();
        let market = MarketStatistics {
            transaction_count: 2,
            average_ebitda_multiple: Some(dec!(8)),
            ..Default::default()
        };
        let eff = effective_range(MethodId::EbitdaMultiple, range(), Some(&market), &settings);
        assert_eq!(eff.observed, None);
        assert_eq!(eff.range, range());
    }

    #[test]
    fn test_market_blend_seventy_thirty() {
        let settings = MarketSettings::default();
        let market = MarketStatistics {
            transaction_count: 3,
            average_ebitda_multiple: Some(dec!(8)),
            ..Default::default()
        };
        let eff = effective_range(MethodId::EbitdaMultiple, range(), Some(&market), &settings);
        assert_eq!(eff.observed, Some(dec!(8)));
        assert_eq!(eff.range.min, dec!(5.2));
        assert_eq!(eff.range.max, dec!(6.6));
    }

    #[test]
    fn test_blended_range_clamped_to_sector() {
        let market = MarketStatistics {
            transaction_count: 5,
            average_ebitda_multiple: Some(dec!(8)),
            ..Default::default()
        };
        let eff = effective_range(
            MethodId::EbitdaMultiple,
            range(),
            Some(&market),
            &MarketSettings::default(),
        );
        let (r, unclamped) = value_by_multiple(
            MethodId::EbitdaMultiple,
            dec!(100000),
            eff.range,
            range(),
            &BandDelta::default(),
        );
        // 5.2 stays inside 4-6; 6.6 comes back to 6
        assert_eq!(r.low, dec!(520000));
        assert_eq!(r.high, dec!(600000));
        assert!(r.clamped);
        assert_eq!(unclamped, Some((dec!(5.2), dec!(6.6))));
    }

    #[test]
    fn test_market_multiple_for_other_method_ignored() {
        let market = MarketStatistics {
            transaction_count: 10,
            average_revenue_multiple: Some(dec!(1.1)),
            ..Default::default()
        };
        let eff = effective_range(
            MethodId::EbitdaMultiple,
            range(),
            Some(&market),
            &MarketSettings::default(),
        );
        assert_eq!(eff.observed, None);
    }

    #[test]
    fn test_monotonic_in_basis() {
        let d = BandDelta::default();
        let (a, _) = value_by_multiple(MethodId::EbitdaMultiple, dec!(100000), range(), range(), &d);
        let (b, _) = value_by_multiple(MethodId::EbitdaMultiple, dec!(100001), range(), range(), &d);
        assert!(b.low >= a.low && b.high >= a.high);
    }
}
