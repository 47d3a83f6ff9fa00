use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::method::{AppliedFactor, MethodResult};
use crate::config::AssetSettings;
use crate::flags::ExclusionReason;
use crate::sector::MethodId;
use crate::statements::FinancialStatement;
use crate::types::{round_money, round_rate, Money};

/// Market-value correction to a balance-sheet item (e.g. property carried at
/// historical cost).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRevaluation {
    pub label: String,
    pub delta: Money,
}

/// Net asset value expressed as an enterprise value.
///
/// NAV = equity + revaluations. Balance-sheet net debt (financial debt minus
/// cash, missing items skipped) is added back. The low estimate applies the
/// liquidation haircut to NAV only.
pub fn value_by_assets(
    statement: &FinancialStatement,
    revaluations: &[AssetRevaluation],
    settings: &AssetSettings,
) -> Result<MethodResult, ExclusionReason> {
    let equity = statement.equity.ok_or(ExclusionReason::MissingEquity)?;
    let nav = equity + revaluations.iter().map(|r| r.delta).sum::<Money>();
    if nav <= Decimal::ZERO {
        return Err(ExclusionReason::NonPositiveNetAssets);
    }

    let net_debt = statement.financial_debt.unwrap_or_default() - statement.cash.unwrap_or_default();
    let haircut = settings.liquidation_haircut;

    Ok(MethodResult {
        method: MethodId::AssetBased,
        low: round_money(nav * (Decimal::ONE - haircut) + net_debt),
        high: round_money(nav + net_debt),
        weight: Decimal::ZERO,
        basis: round_money(nav),
        applied: AppliedFactor::AssetHaircut {
            haircut: round_rate(haircut),
            net_debt_added: round_money(net_debt),
        },
        rationale: "asset.revalued_net_assets".to_string(),
        clamped: false,
        floor: false,
    })
}
