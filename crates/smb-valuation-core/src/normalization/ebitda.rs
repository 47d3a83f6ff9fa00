use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::statements::FinancialStatement;
use crate::types::{round_money, Money};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentCategory {
    OwnerCompensation,
    RelatedPartyRent,
    FinanceLease,
    NonRecurring,
    FamilyCompensation,
    ShareholderCurrentAccount,
}

impl std::fmt::Display for AdjustmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdjustmentCategory::OwnerCompensation => "owner_compensation",
            AdjustmentCategory::RelatedPartyRent => "related_party_rent",
            AdjustmentCategory::FinanceLease => "finance_lease",
            AdjustmentCategory::NonRecurring => "non_recurring",
            AdjustmentCategory::FamilyCompensation => "family_compensation",
            AdjustmentCategory::ShareholderCurrentAccount => "shareholder_current_account",
        };
        f.write_str(s)
    }
}

/// A signed correction to the latest year's earnings.
///
/// A zero delta is meaningful: the item was checked and needed no correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationAdjustment {
    pub category: AdjustmentCategory,
    pub delta: Money,
    /// Machine-readable code describing how the delta was obtained
    pub basis: String,
}

impl NormalizationAdjustment {
    pub fn new(category: AdjustmentCategory, delta: Money, basis: impl Into<String>) -> Self {
        NormalizationAdjustment {
            category,
            delta,
            basis: basis.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EbitdaSource {
    /// EBITDA line of the filing
    Reported,
    /// Operating result plus non-cash charges
    Derived,
    /// No earnings figure could be built
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEbitda {
    pub year: i32,
    pub source: EbitdaSource,
    /// Earnings before corrections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Money>,
    /// Some add-back components were missing from the statement
    pub partial_data: bool,
    pub adjustments: Vec<NormalizationAdjustment>,
    pub total_adjustment: Money,
    /// Base plus every delta; `None` when no base exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Money>,
}

impl NormalizedEbitda {
    /// At least one normalization item was assessed (zero deltas included).
    pub fn assessed(&self) -> bool {
        !self.adjustments.is_empty()
    }

    pub fn delta_for(&self, category: AdjustmentCategory) -> Option<Money> {
        self.adjustments
            .iter()
            .find(|a| a.category == category)
            .map(|a| a.delta)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Normalize a statement's earnings with pre-computed adjustments.
///
/// Each category may appear once; a repeated category is rejected.
pub fn normalize(
    statement: &FinancialStatement,
    adjustments: &[NormalizationAdjustment],
) -> EngineResult<NormalizedEbitda> {
    for (i, adj) in adjustments.iter().enumerate() {
        if adjustments[..i].iter().any(|a| a.category == adj.category) {
            return Err(ValuationError::invalid(
                format!("normalization.{}", adj.category),
                "each adjustment category may be supplied once per year",
            ));
        }
    }

    let (source, base, partial_data) = match statement.ebitda() {
        Some(e) if statement.reported_ebitda.is_some() => (EbitdaSource::Reported, Some(e.value), false),
        Some(e) => (EbitdaSource::Derived, Some(e.value), e.partial),
        None => (EbitdaSource::Unavailable, None, true),
    };

    let mut ordered = adjustments.to_vec();
    ordered.sort_by_key(|a| a.category);

    let total_adjustment: Money = ordered.iter().map(|a| a.delta).sum();
    let value = base.map(|b| round_money(b + total_adjustment));

    Ok(NormalizedEbitda {
        year: statement.year,
        source,
        base,
        partial_data,
        adjustments: ordered,
        total_adjustment: round_money(total_adjustment),
        value,
    })
}
