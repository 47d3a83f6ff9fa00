use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 5.5x EV/EBITDA)
pub type Multiple = Decimal;

/// Decimal places kept on every reported monetary figure.
pub const MONEY_DP: u32 = 2;

/// Decimal places kept on every reported rate, multiple and factor.
pub const RATE_DP: u32 = 4;

/// Currency code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    EUR,
    GBP,
    USD,
    CHF,
    CAD,
    Other(String),
}

/// A low/high pair. Constructors keep `low <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub low: Money,
    pub high: Money,
}

impl ValueRange {
    pub fn new(a: Money, b: Money) -> Self {
        if a <= b {
            ValueRange { low: a, high: b }
        } else {
            ValueRange { low: b, high: a }
        }
    }

    pub fn mid(&self) -> Money {
        (self.low + self.high) / Decimal::TWO
    }

    pub fn rounded(&self) -> Self {
        ValueRange {
            low: round_money(self.low),
            high: round_money(self.high),
        }
    }
}

/// Round a monetary figure for reporting, midpoint away from zero.
pub fn round_money(value: Money) -> Money {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_rate(value: Rate) -> Rate {
    value.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Ratio that is `None` when the denominator is zero.
pub fn safe_ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation. Carries no clock reading so that
/// identical inputs serialize identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    warnings: Vec<String>,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
