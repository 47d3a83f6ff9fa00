use serde::{Deserialize, Serialize};

use crate::sector::MethodId;
use crate::types::{Money, Multiple, Rate, ValueRange};

/// What was actually applied to the basis to produce a method's range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppliedFactor {
    Multiple {
        low: Multiple,
        high: Multiple,
        /// Summed size/location/growth delta (relative)
        band_delta: Rate,
    },
    DiscountRate {
        /// Rate behind the low estimate (the higher one)
        low_estimate_rate: Rate,
        high_estimate_rate: Rate,
        growth: Rate,
        terminal_growth: Rate,
    },
    AssetHaircut {
        haircut: Rate,
        /// Balance-sheet net debt added to net assets to express an EV
        net_debt_added: Money,
    },
}

/// Enterprise-value estimate from a single method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodResult {
    pub method: MethodId,
    pub low: Money,
    pub high: Money,
    /// Weight in the blend after renormalization
    pub weight: Rate,
    /// Figure the factor was applied to (revenue, EBITDA, net assets)
    pub basis: Money,
    pub applied: AppliedFactor,
    /// Machine-readable rationale code
    pub rationale: String,
    /// Adjusted multiple left the sector range and was pulled back
    pub clamped: bool,
    /// Reported as a floor by the sector profile
    pub floor: bool,
}

impl MethodResult {
    pub fn range(&self) -> ValueRange {
        ValueRange::new(self.low, self.high)
    }
}
