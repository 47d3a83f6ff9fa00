use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::normalization::DebtLikeItems;
use crate::statements::FinancialStatement;
use crate::types::{round_money, Money};

/// Net financial debt with the components it was built from. Missing
/// components are skipped and stay `None` in the breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDebtBridge {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_debt: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance_lease_principal: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repayable_current_account: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub off_balance_guarantees: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash: Option<Money>,
    pub net_debt: Money,
}

impl NetDebtBridge {
    pub fn build(
        statement: &FinancialStatement,
        debt_like: &DebtLikeItems,
        off_balance_guarantees: Option<Money>,
    ) -> Self {
        let mut bridge = NetDebtBridge {
            financial_debt: statement.financial_debt,
            finance_lease_principal: debt_like.finance_lease_principal,
            repayable_current_account: debt_like.repayable_current_account,
            off_balance_guarantees,
            cash: statement.cash,
            net_debt: Decimal::ZERO,
        };
        bridge.net_debt = round_money(bridge.gross_debt() - bridge.cash.unwrap_or_default());
        bridge
    }

    pub fn gross_debt(&self) -> Money {
        [
            self.financial_debt,
            self.finance_lease_principal,
            self.repayable_current_account,
            self.off_balance_guarantees,
        ]
        .into_iter()
        .flatten()
        .sum()
    }
}
