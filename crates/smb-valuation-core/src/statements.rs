//! Fiscal-year financial statements and the validated series the engine
//! consumes.
//!
//! Every monetary field is optional: `None` means "not supplied" and is never
//! read as zero. A [`StatementSeries`] can only be built through
//! [`StatementSeries::new`], which rejects malformed input before any
//! computation starts.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::{safe_ratio, Money, Rate};
use crate::EngineResult;

/// Longest history the engine looks at (N, N-1, N-2).
pub const MAX_YEARS: usize = 3;

const DAYS_PER_YEAR: Decimal = dec!(365);

/// Largest absolute monetary amount accepted on any statement field.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000000);

/// One fiscal year of figures, in a single currency unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatement {
    /// Fiscal year (unique within a series)
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_result: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_result: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depreciation_amortization: Option<Money>,
    /// Provisions charged to the income statement for the year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisions: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_receivables: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_payables: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_debt: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity: Option<Money>,
    /// EBITDA as reported in the accounts, when the filing carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_ebitda: Option<Money>,
    /// Average headcount as supplied upstream; unverified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headcount: Option<u32>,
}

/// EBITDA derived from the statement plus whether components were missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedEbitda {
    pub value: Money,
    pub partial: bool,
}

impl FinancialStatement {
    pub fn new(year: i32) -> Self {
        FinancialStatement {
            year,
            ..Default::default()
        }
    }

    /// Reported EBITDA when present, else operating result + D&A + provisions.
    ///
    /// Null add-backs are skipped and mark the figure as partial. Without an
    /// operating result there is nothing to build on and `None` is returned.
    pub fn ebitda(&self) -> Option<DerivedEbitda> {
        if let Some(value) = self.reported_ebitda {
            return Some(DerivedEbitda {
                value,
                partial: false,
            });
        }
        let operating = self.operating_result?;
        let mut partial = false;
        let mut value = operating;
        for component in [self.depreciation_amortization, self.provisions] {
            match component {
                Some(v) => value += v,
                None => partial = true,
            }
        }
        Some(DerivedEbitda { value, partial })
    }

    pub fn net_margin(&self) -> Option<Rate> {
        match (self.net_result, self.revenue) {
            (Some(net), Some(rev)) if rev > Decimal::ZERO => Some(net / rev),
            _ => None,
        }
    }

    /// Days of sales outstanding on trade receivables.
    pub fn days_receivables(&self) -> Option<Decimal> {
        match (self.trade_receivables, self.revenue) {
            (Some(rec), Some(rev)) if rev > Decimal::ZERO => Some(rec * DAYS_PER_YEAR / rev),
            _ => None,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        let amounts = [
            ("revenue", self.revenue),
            ("operating_result", self.operating_result),
            ("net_result", self.net_result),
            ("depreciation_amortization", self.depreciation_amortization),
            ("provisions", self.provisions),
            ("inventory", self.inventory),
            ("trade_receivables", self.trade_receivables),
            ("trade_payables", self.trade_payables),
            ("cash", self.cash),
            ("financial_debt", self.financial_debt),
            ("equity", self.equity),
            ("reported_ebitda", self.reported_ebitda),
        ];
        for (field, value) in amounts {
            if let Some(v) = value {
                check_amount(&format!("statements[{}].{field}", self.year), v)?;
            }
        }
        let non_negative = [
            ("revenue", self.revenue),
            ("inventory", self.inventory),
            ("trade_receivables", self.trade_receivables),
            ("trade_payables", self.trade_payables),
            ("cash", self.cash),
            ("financial_debt", self.financial_debt),
        ];
        for (field, value) in non_negative {
            if let Some(v) = value {
                if v < Decimal::ZERO {
                    return Err(ValuationError::invalid(
                        format!("statements[{}].{field}", self.year),
                        format!("must not be negative (got {v})"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Rejects amounts whose magnitude exceeds [`MAX_AMOUNT`].
pub fn check_amount(field: &str, value: Decimal) -> EngineResult<()> {
    if value.abs() > MAX_AMOUNT {
        return Err(ValuationError::invalid(
            field,
            format!("magnitude exceeds {MAX_AMOUNT} (got {value})"),
        ));
    }
    Ok(())
}

/// Year-over-year change of `current` against `previous`, relative to the
/// magnitude of `previous`.
pub fn growth(current: Decimal, previous: Decimal) -> Option<Rate> {
    safe_ratio(current - previous, previous.abs())
}

/// A validated 1–3 year series, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatementSeries {
    statements: Vec<FinancialStatement>,
}

impl StatementSeries {
    pub fn new(statements: Vec<FinancialStatement>) -> EngineResult<Self> {
        if statements.is_empty() {
            return Err(ValuationError::invalid(
                "statements",
                "at least one fiscal year is required",
            ));
        }
        if statements.len() > MAX_YEARS {
            return Err(ValuationError::invalid(
                "statements",
                format!("at most {MAX_YEARS} fiscal years are accepted (got {})", statements.len()),
            ));
        }
        for pair in statements.windows(2) {
            if pair[0].year == pair[1].year {
                return Err(ValuationError::invalid(
                    "statements",
                    format!("fiscal year {} appears more than once", pair[0].year),
                ));
            }
            if pair[0].year < pair[1].year {
                return Err(ValuationError::invalid(
                    "statements",
                    format!(
                        "series must be ordered most recent first ({} precedes {})",
                        pair[0].year, pair[1].year
                    ),
                ));
            }
            if pair[0].year - pair[1].year != 1 {
                return Err(ValuationError::invalid(
                    "statements",
                    format!(
                        "fiscal years must be consecutive ({} follows {})",
                        pair[1].year, pair[0].year
                    ),
                ));
            }
        }
        for s in &statements {
            s.validate()?;
        }
        Ok(StatementSeries { statements })
    }

    pub fn latest(&self) -> &FinancialStatement {
        &self.statements[0]
    }

    pub fn previous(&self) -> Option<&FinancialStatement> {
        self.statements.get(1)
    }

    /// Statement `n` years before the latest (0 = latest).
    pub fn year_back(&self, n: usize) -> Option<&FinancialStatement> {
        self.statements.get(n)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn as_slice(&self) -> &[FinancialStatement] {
        &self.statements
    }

    /// Latest-year revenue growth against N-1.
    pub fn revenue_growth(&self) -> Option<Rate> {
        let prev = self.previous()?;
        match (self.latest().revenue, prev.revenue) {
            (Some(cur), Some(old)) => growth(cur, old),
            _ => None,
        }
    }

    /// Compound annual revenue growth from the oldest to the latest year.
    pub fn trailing_revenue_growth(&self) -> Option<Rate> {
        if self.len() < 2 {
            return None;
        }
        let oldest = self.statements.last()?;
        let (latest_rev, oldest_rev) = match (self.latest().revenue, oldest.revenue) {
            (Some(l), Some(o)) if o > Decimal::ZERO && l > Decimal::ZERO => (l, o),
            _ => return None,
        };
        let years = Decimal::from((self.latest().year - oldest.year) as i64);
        if years <= Decimal::ZERO {
            return None;
        }
        let ratio = latest_rev / oldest_rev;
        if years == Decimal::ONE {
            return Some(ratio - Decimal::ONE);
        }
        ratio
            .checked_powd(Decimal::ONE / years)
            .map(|r| r - Decimal::ONE)
    }
}
