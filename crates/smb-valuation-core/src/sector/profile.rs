use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::{Multiple, Rate};
use crate::EngineResult;

/// Accepted drift of a profile's weight total away from 1.0.
pub const WEIGHT_TOLERANCE: Decimal = dec!(0.000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Valuation methods a sector profile can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodId {
    RevenueMultiple,
    EbitdaMultiple,
    DiscountedCashFlow,
    AssetBased,
}

impl MethodId {
    pub fn code(&self) -> &'static str {
        match self {
            MethodId::RevenueMultiple => "revenue_multiple",
            MethodId::EbitdaMultiple => "ebitda_multiple",
            MethodId::DiscountedCashFlow => "discounted_cash_flow",
            MethodId::AssetBased => "asset_based",
        }
    }
}

impl std::fmt::Display for MethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodWeight {
    pub method: MethodId,
    pub weight: Rate,
}

/// Inclusive multiple range configured for a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleRange {
    pub min: Multiple,
    pub max: Multiple,
}

impl MultipleRange {
    /// Clamp into the range; the flag is true when the value moved.
    pub fn clamp(&self, value: Multiple) -> (Multiple, bool) {
        if value < self.min {
            (self.min, true)
        } else if value > self.max {
            (self.max, true)
        } else {
            (value, false)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Premium,
    Discount,
}

/// A sector-specific premium or discount the caller can opt into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentFactor {
    pub code: String,
    pub reason: String,
    pub direction: Direction,
    pub impact_min: Rate,
    pub impact_max: Rate,
}

/// Declarative description of how a sector is valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorProfile {
    pub code: String,
    pub name: String,
    /// Alternative codes matched exactly (e.g. full NAF codes)
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Classification-code prefixes routed to this profile (e.g. "56")
    #[serde(default)]
    pub classification_prefixes: Vec<String>,
    pub methods: Vec<MethodWeight>,
    #[serde(default)]
    pub revenue_multiple: Option<MultipleRange>,
    #[serde(default)]
    pub ebitda_multiple: Option<MultipleRange>,
    #[serde(default)]
    pub benchmark_net_margin: Option<Rate>,
    /// Asset value acts as a floor: always reported, never dropped
    #[serde(default)]
    pub asset_floor: bool,
    #[serde(default)]
    pub adjustment_factors: Vec<AdjustmentFactor>,
    /// Identifiers of the sector-specific questions upstream should ask
    #[serde(default)]
    pub questions: Vec<String>,
}

impl SectorProfile {
    pub fn weight_of(&self, method: MethodId) -> Option<Rate> {
        self.methods
            .iter()
            .find(|m| m.method == method)
            .map(|m| m.weight)
    }

    pub fn applies(&self, method: MethodId) -> bool {
        self.weight_of(method).is_some()
    }

    pub fn weight_total(&self) -> Rate {
        self.methods.iter().map(|m| m.weight).sum()
    }

    pub fn range_for(&self, method: MethodId) -> Option<MultipleRange> {
        match method {
            MethodId::RevenueMultiple => self.revenue_multiple,
            MethodId::EbitdaMultiple => self.ebitda_multiple,
            _ => None,
        }
    }

    pub fn factor(&self, code: &str) -> Option<&AdjustmentFactor> {
        self.adjustment_factors.iter().find(|f| f.code == code)
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        if self.methods.is_empty() {
            return Err(ValuationError::Configuration(format!(
                "sector '{}' lists no valuation method",
                self.code
            )));
        }
        for (i, m) in self.methods.iter().enumerate() {
            if m.weight <= Decimal::ZERO {
                return Err(ValuationError::Configuration(format!(
                    "sector '{}': weight for {} must be positive",
                    self.code, m.method
                )));
            }
            if self.methods[..i].iter().any(|o| o.method == m.method) {
                return Err(ValuationError::Configuration(format!(
                    "sector '{}': method {} listed twice",
                    self.code, m.method
                )));
            }
        }

        let total = self.weight_total();
        if (total - Decimal::ONE).abs() > WEIGHT_TOLERANCE {
            return Err(ValuationError::WeightConfiguration {
                sector: self.code.clone(),
                total,
            });
        }

        for method in [MethodId::RevenueMultiple, MethodId::EbitdaMultiple] {
            if !self.applies(method) {
                continue;
            }
            match self.range_for(method) {
                None => {
                    return Err(ValuationError::Configuration(format!(
                        "sector '{}': {method} applies but no range is configured",
                        self.code
                    )))
                }
                Some(r) if r.min <= Decimal::ZERO || r.min > r.max => {
                    return Err(ValuationError::Configuration(format!(
                        "sector '{}': {method} range [{}, {}] is invalid",
                        self.code, r.min, r.max
                    )))
                }
                Some(_) => {}
            }
        }

        for f in &self.adjustment_factors {
            if f.impact_min < Decimal::ZERO || f.impact_min > f.impact_max || f.impact_max >= Decimal::ONE {
                return Err(ValuationError::Configuration(format!(
                    "sector '{}': factor '{}' impact range [{}, {}] is invalid",
                    self.code, f.code, f.impact_min, f.impact_max
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services() -> SectorProfile {
        SectorProfile {
            code: "services".into(),
            name: "Services".into(),
            aliases: vec![],
            classification_prefixes: vec![],
            methods: vec![
                MethodWeight {
                    method: MethodId::EbitdaMultiple,
                    weight: dec!(0.7),
                },
                MethodWeight {
                    method: MethodId::RevenueMultiple,
                    weight: dec!(0.3),
                },
            ],
            revenue_multiple: Some(MultipleRange {
                min: dec!(0.5),
                max: dec!(1.0),
            }),
            ebitda_multiple: Some(MultipleRange {
                min: dec!(4),
                max: dec!(6),
            }),
            benchmark_net_margin: Some(dec!(0.06)),
            asset_floor: false,
            adjustment_factors: vec![],
            questions: vec![],
        }
    }

    #[test]
    fn test_valid_profile() {
        assert!(services().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut p = services();
        p.methods[1].weight = dec!(0.2);
        let err = p.validate().unwrap_err();
        assert!(matches!(err, ValuationError::WeightConfiguration { .. }));
    }

    #[test]
    fn test_weight_within_tolerance_accepted() {
        let mut p = services();
        p.methods[0].weight = dec!(0.7000005);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_missing_range_rejected() {
        let mut p = services();
        p.revenue_multiple = None;
        assert!(matches!(
            p.validate().unwrap_err(),
            ValuationError::Configuration(_)
        ));
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let mut p = services();
        p.methods[1].method = MethodId::EbitdaMultiple;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_clamp_flags_movement() {
        let r = MultipleRange {
            min: dec!(4),
            max: dec!(6),
        };
        assert_eq!(r.clamp(dec!(5)), (dec!(5), false));
        assert_eq!(r.clamp(dec!(7)), (dec!(6), true));
        assert_eq!(r.clamp(dec!(3)), (dec!(4), true));
    }
}
