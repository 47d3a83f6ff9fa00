use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::anomalies::{ScanReport, Severity};
use crate::config::ConfidenceSettings;
use crate::normalization::NormalizedEbitda;
use crate::statements::{StatementSeries, MAX_YEARS};

const FULL_SCORE: Decimal = dec!(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
        };
        f.write_str(s)
    }
}

/// A deduction from the full score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceReason {
    pub code: String,
    pub points: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub grade: Grade,
    pub score: Decimal,
    pub reasons: Vec<ConfidenceReason>,
    /// A high-severity anomaly held the grade at B or below
    pub capped: bool,
}

/// Grade the input quality. Looks at completeness and anomalies only, never at
/// the size of the valuation.
pub fn grade(
    series: &StatementSeries,
    normalized: &NormalizedEbitda,
    report: &ScanReport,
    settings: &ConfidenceSettings,
) -> ConfidenceReport {
    let mut reasons = Vec::new();
    let mut deduct = |code: String, points: Decimal| {
        if points > Decimal::ZERO {
            reasons.push(ConfidenceReason { code, points });
        }
    };

    let missing_years = MAX_YEARS.saturating_sub(series.len());
    deduct(
        "series.missing_years".into(),
        settings.missing_year * Decimal::from(missing_years as u64),
    );

    let latest = series.latest();
    let fields = [
        ("revenue", latest.revenue.is_some()),
        ("net_result", latest.net_result.is_some()),
        (
            "operating_result",
            latest.operating_result.is_some() || latest.reported_ebitda.is_some(),
        ),
        ("equity", latest.equity.is_some()),
        ("cash", latest.cash.is_some()),
        ("financial_debt", latest.financial_debt.is_some()),
        ("trade_receivables", latest.trade_receivables.is_some()),
    ];
    for (field, present) in fields {
        if !present {
            deduct(format!("field.{field}_missing"), settings.missing_field);
        }
    }

    if normalized.partial_data {
        deduct("ebitda.partial".into(), settings.partial_ebitda);
    }
    if !normalized.assessed() {
        deduct("normalization.not_assessed".into(), settings.no_normalization);
    }

    let high = report.count(Severity::High);
    let medium = report.count(Severity::Medium);
    deduct(
        "anomalies.high".into(),
        settings.high_anomaly * Decimal::from(high as u64),
    );
    deduct(
        "anomalies.medium".into(),
        settings.medium_anomaly * Decimal::from(medium as u64),
    );

    let total: Decimal = reasons.iter().map(|r| r.points).sum();
    let score = (FULL_SCORE - total).max(Decimal::ZERO);

    let mut grade = if score >= settings.grade_a {
        Grade::A
    } else if score >= settings.grade_b {
        Grade::B
    } else if score >= settings.grade_c {
        Grade::C
    } else if score >= settings.grade_d {
        Grade::D
    } else {
        Grade::E
    };
    let capped = high > 0 && grade == Grade::A;
    if capped {
        grade = Grade::B;
    }

    ConfidenceReport {
        grade,
        score,
        reasons,
        capped,
    }
}
