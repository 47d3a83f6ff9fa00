use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::method::MethodResult;
use crate::sector::{MethodWeight, SectorProfile};
use crate::types::{round_money, round_rate, Money, Rate};

const SCORE_BASE: i32 = 50;
const PREMIUM_POINTS: i32 = 5;
const DISCOUNT_POINTS: i32 = 3;

/// Weighted enterprise-value range across the contributing methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendedValuation {
    pub low: Money,
    pub medium: Money,
    pub high: Money,
    /// 0-100, profitability checks plus adjustment sentiment
    pub score: u32,
    /// Weights actually used, renormalized over the included methods
    pub weights: Vec<MethodWeight>,
}

impl BlendedValuation {
    /// Premiums raise the score, discounts lower it.
    pub fn apply_sentiment(&mut self, premiums: usize, discounts: usize) {
        let shifted = self.score as i32 + premiums as i32 * PREMIUM_POINTS
            - discounts as i32 * DISCOUNT_POINTS;
        self.score = shifted.clamp(0, 100) as u32;
    }
}

/// Figures the profitability checks look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfitabilitySignals {
    pub net_margin: Option<Rate>,
    pub benchmark_net_margin: Option<Rate>,
    pub normalized_ebitda: Option<Money>,
    pub revenue_growth: Option<Rate>,
}

pub fn profitability_score(signals: &ProfitabilitySignals) -> i32 {
    let mut score = SCORE_BASE;

    match (signals.net_margin, signals.benchmark_net_margin) {
        (Some(m), _) if m < Decimal::ZERO => score -= 20,
        (Some(m), Some(b)) if m >= b => score += 15,
        (Some(_), Some(_)) => score -= 10,
        _ => {}
    }

    match signals.normalized_ebitda {
        Some(e) if e > Decimal::ZERO => score += 10,
        Some(_) => score -= 20,
        None => {}
    }

    match signals.revenue_growth {
        Some(g) if g > dec!(0.10) => score += 10,
        Some(g) if g > Decimal::ZERO => score += 5,
        Some(g) if g < dec!(-0.05) => score -= 10,
        _ => {}
    }

    score.clamp(0, 100)
}

/// Renormalize the profile weights over `results`, write them back and build
/// the weighted range. `None` when nothing contributed.
pub fn blend(
    results: &mut [MethodResult],
    profile: &SectorProfile,
    signals: &ProfitabilitySignals,
) -> Option<BlendedValuation> {
    let raw: Vec<Rate> = results
        .iter()
        .map(|r| profile.weight_of(r.method).unwrap_or_default())
        .collect();
    let total: Rate = raw.iter().copied().sum();
    if results.is_empty() || total <= Decimal::ZERO {
        return None;
    }

    let mut low = Decimal::ZERO;
    let mut medium = Decimal::ZERO;
    let mut high = Decimal::ZERO;
    let mut weights = Vec::with_capacity(results.len());
    for (result, w) in results.iter_mut().zip(raw) {
        let w = w / total;
        let range = result.range();
        low += w * range.low;
        high += w * range.high;
        medium += w * range.mid();
        result.weight = round_rate(w);
        weights.push(MethodWeight {
            method: result.method,
            weight: round_rate(w),
        });
    }

    Some(BlendedValuation {
        low: round_money(low),
        medium: round_money(medium),
        high: round_money(high),
        score: profitability_score(signals) as u32,
        weights,
    })
}
