//! Raw normalization answers and the rules that turn them into adjustments.
//!
//! Every field is optional. `None` means the item was not assessed; an item
//! that was assessed but needs no correction still yields a zero-delta
//! adjustment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ebitda::{AdjustmentCategory, NormalizationAdjustment};
use crate::config::EngineConfig;
use crate::error::ValuationError;
use crate::statements::check_amount;
use crate::types::Money;
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizationInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_compensation: Option<OwnerCompensationInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_party_rent: Option<RentInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finance_lease: Option<FinanceLeaseInput>,
    /// `Some(vec![])` records that non-recurring items were reviewed and none found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_recurring: Option<Vec<NonRecurringItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_compensation: Option<FamilyCompensationInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shareholder_current_account: Option<CurrentAccountInput>,
    /// Pre-computed adjustments for categories not covered above
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional: Vec<NormalizationAdjustment>,
}

/// Total chargeable compensation actually paid to the operating owner
/// (salary plus social charges) for the latest year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerCompensationInput {
    pub actual: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentInput {
    /// Premises owned by the operator or a related entity
    pub premises_related: bool,
    pub paid_rent: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_rent: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceLeaseInput {
    /// Lease payments booked as operating expense in the latest year
    pub annual_payments: Money,
    pub outstanding_principal: Money,
}

/// A one-off item. `amount` is added to EBITDA as signed: a one-off charge is
/// positive (added back), a one-off gain negative (removed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonRecurringItem {
    pub label: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyCompensationInput {
    pub paid: Money,
    /// What the same work would cost at market rates
    pub market_equivalent: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAccountInput {
    pub balance: Money,
    /// Balance must be repaid to the shareholder at closing
    pub repayable: bool,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Debt-like balances surfaced by normalization for the equity bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtLikeItems {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance_lease_principal: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repayable_current_account: Option<Money>,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizationPlan {
    pub adjustments: Vec<NormalizationAdjustment>,
    pub debt_like: DebtLikeItems,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Turn the raw answers into adjustments for the latest year.
///
/// `revenue` is the latest-year revenue and selects the owner-compensation
/// benchmark band.
pub fn adjustments_from_inputs(
    inputs: &NormalizationInputs,
    revenue: Option<Money>,
    config: &EngineConfig,
) -> EngineResult<NormalizationPlan> {
    validate_inputs(inputs)?;

    let mut plan = NormalizationPlan::default();

    if let Some(owner) = &inputs.owner_compensation {
        match revenue.and_then(|r| config.compensation_benchmark(r)) {
            Some(benchmark) => plan
                .adjustments
                .push(owner_compensation_adjustment(owner.actual, benchmark)),
            None => plan.warnings.push(
                "Owner compensation supplied but latest revenue is missing; no benchmark band applies"
                    .into(),
            ),
        }
    }

    if let Some(rent) = &inputs.related_party_rent {
        if !rent.premises_related {
            plan.adjustments.push(NormalizationAdjustment::new(
                AdjustmentCategory::RelatedPartyRent,
                Decimal::ZERO,
                "rent.third_party_landlord",
            ));
        } else if let Some(market) = rent.market_rent {
            plan.adjustments.push(NormalizationAdjustment::new(
                AdjustmentCategory::RelatedPartyRent,
                rent.paid_rent - market,
                "rent.paid_vs_market",
            ));
        } else {
            plan.warnings.push(
                "Premises are related-party owned but no market rent estimate was supplied".into(),
            );
        }
    }

    if let Some(lease) = &inputs.finance_lease {
        plan.adjustments.push(NormalizationAdjustment::new(
            AdjustmentCategory::FinanceLease,
            lease.annual_payments,
            "lease.payments_added_back",
        ));
        plan.debt_like.finance_lease_principal = Some(lease.outstanding_principal);
    }

    if let Some(items) = &inputs.non_recurring {
        let total: Money = items.iter().map(|i| i.amount).sum();
        let basis = if items.is_empty() {
            "non_recurring.none_identified"
        } else {
            "non_recurring.full_signed_value"
        };
        plan.adjustments.push(NormalizationAdjustment::new(
            AdjustmentCategory::NonRecurring,
            total,
            basis,
        ));
    }

    if let Some(family) = &inputs.family_compensation {
        plan.adjustments.push(NormalizationAdjustment::new(
            AdjustmentCategory::FamilyCompensation,
            family.paid - family.market_equivalent,
            "family.paid_vs_market",
        ));
    }

    if let Some(account) = &inputs.shareholder_current_account {
        plan.adjustments.push(NormalizationAdjustment::new(
            AdjustmentCategory::ShareholderCurrentAccount,
            Decimal::ZERO,
            if account.repayable {
                "current_account.reclassified_as_debt"
            } else {
                "current_account.retained"
            },
        ));
        if account.repayable {
            plan.debt_like.repayable_current_account = Some(account.balance);
        }
    }

    plan.adjustments.extend(inputs.additional.iter().cloned());

    debug!(
        adjustments = plan.adjustments.len(),
        warnings = plan.warnings.len(),
        "normalization plan built"
    );
    Ok(plan)
}

/// Compare actual owner compensation with the normative figure.
///
/// Paid below the benchmark: the shortfall is deducted. Paid above: the
/// excess is added back.
pub fn owner_compensation_adjustment(actual: Money, benchmark: Money) -> NormalizationAdjustment {
    let delta = actual - benchmark;
    let basis = if delta < Decimal::ZERO {
        "owner_compensation.shortfall_deducted"
    } else if delta > Decimal::ZERO {
        "owner_compensation.excess_added_back"
    } else {
        "owner_compensation.at_benchmark"
    };
    NormalizationAdjustment::new(AdjustmentCategory::OwnerCompensation, delta, basis)
}

fn validate_inputs(inputs: &NormalizationInputs) -> EngineResult<()> {
    let mut checks: Vec<(&str, Money)> = Vec::new();
    if let Some(o) = &inputs.owner_compensation {
        checks.push(("owner_compensation.actual", o.actual));
    }
    if let Some(r) = &inputs.related_party_rent {
        checks.push(("related_party_rent.paid_rent", r.paid_rent));
        if let Some(m) = r.market_rent {
            checks.push(("related_party_rent.market_rent", m));
        }
    }
    if let Some(l) = &inputs.finance_lease {
        checks.push(("finance_lease.annual_payments", l.annual_payments));
        checks.push(("finance_lease.outstanding_principal", l.outstanding_principal));
    }
    if let Some(f) = &inputs.family_compensation {
        checks.push(("family_compensation.paid", f.paid));
        checks.push(("family_compensation.market_equivalent", f.market_equivalent));
    }
    if let Some(c) = &inputs.shareholder_current_account {
        checks.push(("shareholder_current_account.balance", c.balance));
    }
    for (field, value) in checks {
        let field = format!("normalization.{field}");
        check_amount(&field, value)?;
        if value < Decimal::ZERO {
            return Err(ValuationError::invalid(
                field,
                format!("must not be negative (got {value})"),
            ));
        }
    }
    for item in inputs.non_recurring.iter().flatten() {
        check_amount(&format!("normalization.non_recurring[{}]", item.label), item.amount)?;
    }
    for adj in &inputs.additional {
        check_amount("normalization.additional", adj.delta)?;
    }
    Ok(())
}
