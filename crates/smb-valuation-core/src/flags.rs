use serde::{Deserialize, Serialize};

use crate::sector::MethodId;
use crate::types::{Money, Multiple, Rate};

/// Why a valuation method did not contribute to the blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    MissingRevenue,
    MissingEbitda,
    NonPositiveEbitda,
    MissingEquity,
    NonPositiveNetAssets,
    ZeroRevenue,
}

/// Result-level annotations. Every silent-looking fallback in the engine
/// leaves one of these behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValuationFlag {
    /// Sector code unknown; the default profile was used
    UnknownSector { requested: String },
    /// Sector resolved through a classification prefix
    SectorPrefixMatch { requested: String, prefix: String },
    /// EBITDA built with missing add-back components
    PartialEbitdaData,
    /// A method was skipped for missing prerequisites; weights renormalized
    InsufficientData {
        method: MethodId,
        reason: ExclusionReason,
    },
    MultipleClamped {
        method: MethodId,
        unclamped_low: Multiple,
        unclamped_high: Multiple,
    },
    MarketDataBlended {
        method: MethodId,
        transactions: u32,
        observed_multiple: Multiple,
    },
    MarketDataIgnored { transactions: u32, min_sample: u32 },
    /// Floor method reported below every other method's low estimate
    AssetFloorBelowEarnings { asset_high: Money, lowest_other: Money },
    DiscountCeilingExceeded { computed: Rate, ceiling: Rate },
    NegativeEquityPrice,
    /// A sector-factor answer names no factor of the resolved profile
    SectorFactorIgnored { factor: String },
    /// A normalization answer could not be used
    NormalizationIncomplete { detail: String },
}

impl ValuationFlag {
    pub fn code(&self) -> &'static str {
        match self {
            ValuationFlag::UnknownSector { .. } => "unknown_sector",
            ValuationFlag::SectorPrefixMatch { .. } => "sector_prefix_match",
            ValuationFlag::PartialEbitdaData => "partial_ebitda_data",
            ValuationFlag::InsufficientData { .. } => "insufficient_data",
            ValuationFlag::MultipleClamped { .. } => "multiple_clamped",
            ValuationFlag::MarketDataBlended { .. } => "market_data_blended",
            ValuationFlag::MarketDataIgnored { .. } => "market_data_ignored",
            ValuationFlag::AssetFloorBelowEarnings { .. } => "asset_floor_below_earnings",
            ValuationFlag::DiscountCeilingExceeded { .. } => "discount_ceiling_exceeded",
            ValuationFlag::NegativeEquityPrice => "negative_equity_price",
            ValuationFlag::SectorFactorIgnored { .. } => "sector_factor_ignored",
            ValuationFlag::NormalizationIncomplete { .. } => "normalization_incomplete",
        }
    }
}
