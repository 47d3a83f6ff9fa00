use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::adjustments::QualitativeRisk;
use crate::config::ScannerThresholds;
use crate::statements::{growth, FinancialStatement, StatementSeries};
use crate::types::round_rate;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Alert,
    Question,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyCategory {
    Liquidity,
    Profitability,
    Solvency,
    Leverage,
    Provisions,
    Growth,
    Concentration,
    DataQuality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    fn escalate(self) -> Self {
        match self {
            Severity::Low => Severity::Medium,
            _ => Severity::High,
        }
    }
}

/// A rule hit. Carries the figures that triggered it and never alters them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub category: AnomalyCategory,
    pub severity: Severity,
    pub rule: String,
    pub values: BTreeMap<String, Decimal>,
}

impl Anomaly {
    fn new(kind: AnomalyKind, category: AnomalyCategory, severity: Severity, rule: &str) -> Self {
        Anomaly {
            kind,
            category,
            severity,
            rule: rule.to_string(),
            values: BTreeMap::new(),
        }
    }

    fn with(mut self, name: &str, value: Decimal) -> Self {
        self.values.insert(name.to_string(), round_rate(value));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub years_scanned: usize,
    pub anomalies: Vec<Anomaly>,
}

impl ScanReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.anomalies.iter().filter(|a| a.severity == severity).count()
    }

    pub fn has_rule(&self, rule: &str) -> bool {
        self.anomalies.iter().any(|a| a.rule == rule)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run every rule over the series. Rules comparing two years are skipped when
/// the series holds a single year.
pub fn scan(series: &StatementSeries, risk: &QualitativeRisk, t: &ScannerThresholds) -> ScanReport {
    let latest = series.latest();
    let previous = series.previous();
    let mut out = Vec::new();

    receivables(latest, previous, t, &mut out);
    if let Some(prev) = previous {
        inventory_growth(latest, prev, t, &mut out);
        margin_degradation(latest, prev, t, &mut out);
        provisions(latest, prev, t, &mut out);
        revenue_trend(series, t, &mut out);
    }
    net_loss(latest, &mut out);
    negative_equity(latest, &mut out);
    leverage(latest, t, &mut out);
    ample_cash(latest, t, &mut out);
    concentration(risk, t, &mut out);
    for statement in series.as_slice() {
        headcount(statement, t, &mut out);
    }

    ScanReport {
        years_scanned: series.len(),
        anomalies: out,
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn receivables(
    latest: &FinancialStatement,
    previous: Option<&FinancialStatement>,
    t: &ScannerThresholds,
    out: &mut Vec<Anomaly>,
) {
    let Some(days) = latest.days_receivables() else {
        return;
    };
    let mut anomaly = if days > t.receivable_days_alert {
        Anomaly::new(
            AnomalyKind::Alert,
            AnomalyCategory::Liquidity,
            Severity::High,
            "receivables.days_above_alert",
        )
    } else if days > t.receivable_days_watch {
        Anomaly::new(
            AnomalyKind::Question,
            AnomalyCategory::Liquidity,
            Severity::Medium,
            "receivables.days_above_watch",
        )
    } else {
        return;
    };
    anomaly = anomaly.with("days", days);
    if let Some(prev_days) = previous.and_then(|p| p.days_receivables()) {
        anomaly = anomaly.with("previous_days", prev_days);
        if days - prev_days >= t.receivable_days_trend {
            anomaly.severity = anomaly.severity.escalate();
        }
    }
    out.push(anomaly);
}

fn inventory_growth(
    latest: &FinancialStatement,
    prev: &FinancialStatement,
    t: &ScannerThresholds,
    out: &mut Vec<Anomaly>,
) {
    let inv = match (latest.inventory, prev.inventory) {
        (Some(cur), Some(old)) => growth(cur, old),
        _ => None,
    };
    let rev = match (latest.revenue, prev.revenue) {
        (Some(cur), Some(old)) => growth(cur, old),
        _ => None,
    };
    if let (Some(inv), Some(rev)) = (inv, rev) {
        if inv - rev > t.inventory_growth_gap {
            out.push(
                Anomaly::new(
                    AnomalyKind::Question,
                    AnomalyCategory::Liquidity,
                    Severity::Medium,
                    "inventory.growth_exceeds_revenue",
                )
                .with("inventory_growth", inv)
                .with("revenue_growth", rev),
            );
        }
    }
}

fn net_loss(latest: &FinancialStatement, out: &mut Vec<Anomaly>) {
    if let Some(net) = latest.net_result {
        if net < Decimal::ZERO {
            out.push(
                Anomaly::new(
                    AnomalyKind::Alert,
                    AnomalyCategory::Profitability,
                    Severity::High,
                    "profitability.net_loss",
                )
                .with("net_result", net),
            );
        }
    }
}

fn margin_degradation(
    latest: &FinancialStatement,
    prev: &FinancialStatement,
    t: &ScannerThresholds,
    out: &mut Vec<Anomaly>,
) {
    if let (Some(cur), Some(old)) = (latest.net_margin(), prev.net_margin()) {
        if old - cur > t.margin_drop {
            out.push(
                Anomaly::new(
                    AnomalyKind::Alert,
                    AnomalyCategory::Profitability,
                    Severity::Medium,
                    "profitability.margin_degradation",
                )
                .with("net_margin", cur)
                .with("previous_net_margin", old),
            );
        }
    }
}

fn negative_equity(latest: &FinancialStatement, out: &mut Vec<Anomaly>) {
    if let Some(equity) = latest.equity {
        if equity < Decimal::ZERO {
            out.push(
                Anomaly::new(
                    AnomalyKind::Alert,
                    AnomalyCategory::Solvency,
                    Severity::High,
                    "solvency.negative_equity",
                )
                .with("equity", equity),
            );
        }
    }
}

fn leverage(latest: &FinancialStatement, t: &ScannerThresholds, out: &mut Vec<Anomaly>) {
    let (Some(debt), Some(ebitda)) = (latest.financial_debt, latest.ebitda()) else {
        return;
    };
    if debt <= Decimal::ZERO {
        return;
    }
    if ebitda.value <= Decimal::ZERO {
        out.push(
            Anomaly::new(
                AnomalyKind::Alert,
                AnomalyCategory::Leverage,
                Severity::High,
                "leverage.debt_without_earnings",
            )
            .with("financial_debt", debt)
            .with("ebitda", ebitda.value),
        );
    } else if debt > t.leverage_max * ebitda.value {
        out.push(
            Anomaly::new(
                AnomalyKind::Alert,
                AnomalyCategory::Leverage,
                Severity::High,
                "leverage.debt_above_ebitda_multiple",
            )
            .with("debt_to_ebitda", debt / ebitda.value)
            .with("limit", t.leverage_max),
        );
    }
}

fn provisions(
    latest: &FinancialStatement,
    prev: &FinancialStatement,
    t: &ScannerThresholds,
    out: &mut Vec<Anomaly>,
) {
    let (Some(cur), Some(old)) = (latest.provisions, prev.provisions) else {
        return;
    };
    if cur <= Decimal::ZERO {
        return;
    }
    if old.is_zero() {
        out.push(
            Anomaly::new(
                AnomalyKind::Question,
                AnomalyCategory::Provisions,
                Severity::Low,
                "provisions.new",
            )
            .with("provisions", cur),
        );
    } else if old > Decimal::ZERO && cur >= old * t.provision_growth_factor {
        out.push(
            Anomaly::new(
                AnomalyKind::Question,
                AnomalyCategory::Provisions,
                Severity::Medium,
                "provisions.doubled",
            )
            .with("provisions", cur)
            .with("previous_provisions", old),
        );
    }
}

fn revenue_trend(series: &StatementSeries, t: &ScannerThresholds, out: &mut Vec<Anomaly>) {
    let Some(g) = series.revenue_growth() else {
        return;
    };

    if g >= t.strong_growth {
        out.push(
            Anomaly::new(
                AnomalyKind::Info,
                AnomalyCategory::Growth,
                Severity::Low,
                "growth.strong",
            )
            .with("revenue_growth", g),
        );
        return;
    }

    let mut anomaly = if g <= -t.revenue_decline_alert {
        Anomaly::new(
            AnomalyKind::Alert,
            AnomalyCategory::Growth,
            Severity::High,
            "growth.revenue_decline",
        )
    } else if g <= -t.revenue_decline_watch {
        Anomaly::new(
            AnomalyKind::Alert,
            AnomalyCategory::Growth,
            Severity::Medium,
            "growth.revenue_decline",
        )
    } else {
        return;
    };
    anomaly = anomaly.with("revenue_growth", g);

    // Second consecutive decline
    let earlier = match (series.previous(), series.year_back(2)) {
        (Some(p), Some(pp)) => match (p.revenue, pp.revenue) {
            (Some(cur), Some(old)) => growth(cur, old),
            _ => None,
        },
        _ => None,
    };
    if let Some(earlier) = earlier {
        anomaly = anomaly.with("previous_revenue_growth", earlier);
        if earlier < Decimal::ZERO {
            anomaly.severity = anomaly.severity.escalate();
        }
    }
    out.push(anomaly);
}

fn ample_cash(latest: &FinancialStatement, t: &ScannerThresholds, out: &mut Vec<Anomaly>) {
    if let (Some(cash), Some(revenue)) = (latest.cash, latest.revenue) {
        if revenue > Decimal::ZERO && cash / revenue >= t.ample_cash_ratio {
            out.push(
                Anomaly::new(
                    AnomalyKind::Info,
                    AnomalyCategory::Liquidity,
                    Severity::Low,
                    "liquidity.ample_cash",
                )
                .with("cash_to_revenue", cash / revenue),
            );
        }
    }
}

fn concentration(risk: &QualitativeRisk, t: &ScannerThresholds, out: &mut Vec<Anomaly>) {
    let Some(share) = risk.top_client_share else {
        return;
    };
    let anomaly = if share >= t.concentration_alert {
        Anomaly::new(
            AnomalyKind::Alert,
            AnomalyCategory::Concentration,
            Severity::High,
            "concentration.top_client",
        )
    } else if share >= t.concentration_watch {
        Anomaly::new(
            AnomalyKind::Question,
            AnomalyCategory::Concentration,
            Severity::Medium,
            "concentration.top_client",
        )
    } else {
        return;
    };
    out.push(anomaly.with("top_client_share", share));
}

fn headcount(statement: &FinancialStatement, t: &ScannerThresholds, out: &mut Vec<Anomaly>) {
    let Some(heads) = statement.headcount else {
        return;
    };
    let active = statement.revenue.is_some_and(|r| r > Decimal::ZERO);
    if heads > t.headcount_max || (heads == 0 && active) {
        out.push(
            Anomaly::new(
                AnomalyKind::Question,
                AnomalyCategory::DataQuality,
                Severity::Low,
                "data_quality.implausible_headcount",
            )
            .with("year", Decimal::from(statement.year))
            .with("headcount", Decimal::from(heads)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn year(y: i32, revenue: Decimal) -> FinancialStatement {
        FinancialStatement {
            revenue: Some(revenue),
            net_result: Some(revenue * dec!(0.08)),
            ..FinancialStatement::new(y)
        }
    }

    fn run(statements: Vec<FinancialStatement>) -> ScanReport {
        run_with(statements, &QualitativeRisk::default())
    }

    fn run_with(statements: Vec<FinancialStatement>, risk: &QualitativeRisk) -> ScanReport {
        let series = StatementSeries::new(statements).unwrap();
        scan(&series, risk, &ScannerThresholds::default())
    }

    fn rules(report: &ScanReport) -> Vec<&str> {
        report.anomalies.iter().map(|a| a.rule.as_str()).collect()
    }

    #[test]
    fn test_clean_single_year() {
        let report = run(vec![year(2024, dec!(1000000))]);
        assert_eq!(report.years_scanned, 1);
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn test_single_year_never_runs_trend_rules() {
        let mut s = year(2024, dec!(1000000));
        s.provisions = Some(dec!(50000));
        s.inventory = Some(dec!(900000));
        let report = run(vec![s]);
        for rule in rules(&report) {
            assert!(!rule.starts_with("growth."));
            assert!(!rule.starts_with("provisions."));
            assert!(!rule.starts_with("inventory."));
        }
    }

    #[test]
    fn test_receivable_days_escalate_with_trend() {
        let mut cur = year(2024, dec!(365000));
        cur.trade_receivables = Some(dec!(70000)); // 70 days
        let mut prev = year(2023, dec!(365000));
        prev.trade_receivables = Some(dec!(40000)); // 40 days
        let report = run(vec![cur.clone(), prev]);
        let a = &report.anomalies[0];
        assert_eq!(a.rule, "receivables.days_above_watch");
        assert_eq!(a.severity, Severity::High);
        assert_eq!(a.values["days"], dec!(70));

        let single = run(vec![cur]);
        assert_eq!(single.anomalies[0].severity, Severity::Medium);
    }

    #[test]
    fn test_receivable_days_exactly_on_bands() {
        let mut s = year(2024, dec!(365000));
        s.trade_receivables = Some(dec!(45000));
        assert!(run(vec![s.clone()]).anomalies.is_empty());

        s.trade_receivables = Some(dec!(90000));
        let report = run(vec![s]);
        assert_eq!(rules(&report), vec!["receivables.days_above_watch"]);
        assert_eq!(report.anomalies[0].severity, Severity::Medium);
        assert_eq!(report.anomalies[0].values["days"], dec!(90));
    }

    #[test]
    fn test_inventory_outgrowing_revenue() {
        let mut cur = year(2024, dec!(1000000));
        cur.inventory = Some(dec!(150000));
        let mut prev = year(2023, dec!(1000000));
        prev.inventory = Some(dec!(100000));
        let report = run(vec![cur.clone(), prev.clone()]);
        assert_eq!(rules(&report), vec!["inventory.growth_exceeds_revenue"]);
        let a = &report.anomalies[0];
        assert_eq!(a.severity, Severity::Medium);
        assert_eq!(a.values["inventory_growth"], dec!(0.5));
        assert_eq!(a.values["revenue_growth"], Decimal::ZERO);

        // 25 point gap stays under the 30 point threshold
        cur.inventory = Some(dec!(125000));
        assert!(!run(vec![cur, prev]).has_rule("inventory.growth_exceeds_revenue"));
    }

    #[test]
    fn test_ample_cash_is_info() {
        let mut s = year(2024, dec!(1000000));
        s.cash = Some(dec!(300000));
        let report = run(vec![s.clone()]);
        assert_eq!(rules(&report), vec!["liquidity.ample_cash"]);
        assert_eq!(report.anomalies[0].kind, AnomalyKind::Info);
        assert_eq!(report.anomalies[0].values["cash_to_revenue"], dec!(0.3));

        s.cash = Some(dec!(200000));
        assert!(run(vec![s]).anomalies.is_empty());
    }

    #[test]
    fn test_revenue_decline_two_years_escalates() {
        let report = run(vec![
            year(2024, dec!(900000)),
            year(2023, dec!(1000000)),
            year(2022, dec!(1100000)),
        ]);
        let a = report
            .anomalies
            .iter()
            .find(|a| a.rule == "growth.revenue_decline")
            .unwrap();
        assert_eq!(a.severity, Severity::High);
    }

    #[test]
    fn test_strong_growth_is_info() {
        let report = run(vec![year(2024, dec!(1300000)), year(2023, dec!(1000000))]);
        assert_eq!(rules(&report), vec!["growth.strong"]);
        assert_eq!(report.anomalies[0].kind, AnomalyKind::Info);
    }

    #[test]
    fn test_leverage_rules() {
        let mut s = year(2024, dec!(1000000));
        s.reported_ebitda = Some(dec!(100000));
        s.financial_debt = Some(dec!(500000));
        assert!(run(vec![s.clone()]).has_rule("leverage.debt_above_ebitda_multiple"));

        s.reported_ebitda = Some(dec!(-1));
        assert!(run(vec![s]).has_rule("leverage.debt_without_earnings"));
    }

    #[test]
    fn test_provisions_new_and_doubled() {
        let mut cur = year(2024, dec!(1000000));
        cur.provisions = Some(dec!(20000));
        let mut prev = year(2023, dec!(1000000));
        prev.provisions = Some(Decimal::ZERO);
        assert!(run(vec![cur.clone(), prev.clone()]).has_rule("provisions.new"));

        prev.provisions = Some(dec!(10000));
        assert!(run(vec![cur.clone(), prev.clone()]).has_rule("provisions.doubled"));

        prev.provisions = None;
        assert!(!run(vec![cur, prev]).has_rule("provisions.new"));
    }

    #[test]
    fn test_margin_degradation() {
        let mut cur = year(2024, dec!(1000000));
        cur.net_result = Some(dec!(30000));
        let report = run(vec![cur, year(2023, dec!(1000000))]);
        assert!(report.has_rule("profitability.margin_degradation"));
    }

    #[test]
    fn test_concentration_severity() {
        let high = QualitativeRisk {
            top_client_share: Some(dec!(0.55)),
            ..Default::default()
        };
        let report = run_with(vec![year(2024, dec!(1000000))], &high);
        assert_eq!(report.anomalies[0].rule, "concentration.top_client");
        assert_eq!(report.anomalies[0].severity, Severity::High);
        assert_eq!(report.count(Severity::High), 1);

        let medium = QualitativeRisk {
            top_client_share: Some(dec!(0.35)),
            ..Default::default()
        };
        let report = run_with(vec![year(2024, dec!(1000000))], &medium);
        assert_eq!(report.anomalies[0].severity, Severity::Medium);
    }

    #[test]
    fn test_implausible_headcount() {
        let mut s = year(2024, dec!(1000000));
        s.headcount = Some(0);
        assert!(run(vec![s.clone()]).has_rule("data_quality.implausible_headcount"));
        s.headcount = Some(12);
        assert!(!run(vec![s]).has_rule("data_quality.implausible_headcount"));
    }

    #[test]
    fn test_negative_equity_and_loss() {
        let mut s = year(2024, dec!(1000000));
        s.net_result = Some(dec!(-10000));
        s.equity = Some(dec!(-5000));
        let report = run(vec![s]);
        assert!(report.has_rule("profitability.net_loss"));
        assert!(report.has_rule("solvency.negative_equity"));
    }
}
