//! Discount/premium chain and the enterprise-to-equity bridge.
//!
//! The chain is built in a fixed order from the qualitative answers, stacked
//! multiplicatively against the blended enterprise value, and the result is
//! converted to an equity price for the stake being valued.

pub mod bridge;
pub mod chain;
pub mod stacking;

pub use bridge::NetDebtBridge;
pub use chain::{
    build_chain, validate_risk, Adjustment, AdjustmentKind, FactorIntensity, KeyPersonDependence,
    QualitativeRisk, SectorFactorAnswer, CONTROL_THRESHOLD,
};
pub use stacking::{stack, StackedFactors};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::flags::ValuationFlag;
use crate::types::{round_money, Money, Rate};
use crate::valuation::BlendedValuation;

/// Low/medium/high figures after the chain has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueBand {
    pub low: Money,
    pub medium: Money,
    pub high: Money,
}

impl ValueBand {
    fn map(&self, f: impl Fn(Money) -> Money) -> Self {
        ValueBand {
            low: round_money(f(self.low)),
            medium: round_money(f(self.medium)),
            high: round_money(f(self.high)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentOutcome {
    /// Chain in application order
    pub adjustments: Vec<Adjustment>,
    pub factors: StackedFactors,
    pub adjusted_enterprise_value: ValueBand,
    pub net_debt: NetDebtBridge,
    pub ownership_fraction: Rate,
    pub equity_price: ValueBand,
    pub flags: Vec<ValuationFlag>,
}

/// Apply the chain to the blended range and bridge to an equity price:
/// `(adjusted EV - net debt) * ownership_fraction`.
pub fn apply(
    blended: &BlendedValuation,
    chain: Vec<Adjustment>,
    bridge: NetDebtBridge,
    ownership_fraction: Rate,
    ceiling: Rate,
) -> AdjustmentOutcome {
    let factors = stack(&chain, ceiling);
    let mut flags = Vec::new();

    if factors.ceiling_exceeded {
        warn!(
            computed = %factors.uncapped_discount,
            ceiling = %ceiling,
            "cumulative discount capped at ceiling"
        );
        flags.push(ValuationFlag::DiscountCeilingExceeded {
            computed: factors.uncapped_discount,
            ceiling,
        });
    }

    let ev = ValueBand {
        low: blended.low,
        medium: blended.medium,
        high: blended.high,
    };
    let adjusted = ev.map(|v| v * factors.factor);
    let net_debt = bridge.net_debt;
    let equity = adjusted.map(|v| (v - net_debt) * ownership_fraction);

    if equity.low < Decimal::ZERO {
        flags.push(ValuationFlag::NegativeEquityPrice);
    }

    AdjustmentOutcome {
        adjustments: chain,
        factors,
        adjusted_enterprise_value: adjusted,
        net_debt: bridge,
        ownership_fraction,
        equity_price: equity,
        flags,
    }
}
