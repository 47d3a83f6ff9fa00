use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use smb_valuation_core::adjustments::{AdjustmentKind, KeyPersonDependence, QualitativeRisk};
use smb_valuation_core::config::LocationTier;
use smb_valuation_core::normalization::{
    AdjustmentCategory, CurrentAccountInput, FinanceLeaseInput, NormalizationInputs,
    OwnerCompensationInput,
};
use smb_valuation_core::scoring::{Grade, Severity};
use smb_valuation_core::sector::{MatchKind, MethodId};
use smb_valuation_core::valuation::MarketStatistics;
use smb_valuation_core::{
    Engine, FinancialStatement, ValuationError, ValuationFlag, ValuationRequest,
};

fn engine() -> Engine {
    Engine::with_defaults().unwrap()
}

fn services_year() -> FinancialStatement {
    FinancialStatement {
        revenue: Some(dec!(1000000)),
        reported_ebitda: Some(dec!(150000)),
        net_result: Some(dec!(90000)),
        ..FinancialStatement::new(2024)
    }
}

fn services_request() -> ValuationRequest {
    ValuationRequest {
        sector_code: "generic_services".into(),
        statements: vec![services_year()],
        ..Default::default()
    }
}

// ===========================================================================
// Generic services, EBITDA multiple only
// ===========================================================================

#[test]
fn test_generic_services_range() {
    let r = engine().valuate_company(&services_request()).unwrap();
    assert_eq!(r.sector.code, "default");
    assert_eq!(r.sector.matched, MatchKind::Exact);
    assert_eq!(r.methods.len(), 1);
    assert_eq!(r.methods[0].method, MethodId::EbitdaMultiple);
    assert_eq!(r.blended.low, dec!(600000));
    assert_eq!(r.blended.high, dec!(900000));
    // No adjustments, no debt: equity equals enterprise value
    assert_eq!(r.equity_price.low, dec!(600000));
    assert_eq!(r.equity_price.high, dec!(900000));
    assert!(r.flags.is_empty());
}

// ===========================================================================
// Owner compensation below benchmark
// ===========================================================================

#[test]
fn test_owner_compensation_shortfall_deducted() {
    let mut req = services_request();
    req.normalization = NormalizationInputs {
        owner_compensation: Some(OwnerCompensationInput {
            actual: dec!(20000),
        }),
        ..Default::default()
    };
    let r = engine().valuate_company(&req).unwrap();
    let n = &r.normalized_ebitda;
    assert_eq!(n.delta_for(AdjustmentCategory::OwnerCompensation), Some(dec!(-40000)));
    assert_eq!(n.adjustments[0].basis, "owner_compensation.shortfall_deducted");
    assert_eq!(n.value, Some(dec!(110000)));
    assert_eq!(r.blended.low, dec!(440000));
    assert_eq!(r.blended.high, dec!(660000));
}

// ===========================================================================
// Net debt bridge
// ===========================================================================

#[test]
fn test_net_debt_bridge() {
    let mut req = services_request();
    req.statements[0].financial_debt = Some(dec!(500000));
    req.statements[0].cash = Some(dec!(120000));
    let r = engine().valuate_company(&req).unwrap();
    assert_eq!(r.net_debt.net_debt, dec!(380000));
    assert_eq!(
        r.equity_price.low,
        r.adjusted_enterprise_value.low - dec!(380000)
    );
    assert_eq!(r.equity_price.low, dec!(220000));
    assert_eq!(r.equity_price.high, dec!(520000));
}

#[test]
fn test_lease_and_current_account_reach_net_debt() {
    let mut req = services_request();
    req.statements[0].financial_debt = Some(dec!(100000));
    req.statements[0].cash = Some(dec!(50000));
    req.normalization = NormalizationInputs {
        finance_lease: Some(FinanceLeaseInput {
            annual_payments: dec!(12000),
            outstanding_principal: dec!(60000),
        }),
        shareholder_current_account: Some(CurrentAccountInput {
            balance: dec!(40000),
            repayable: true,
        }),
        ..Default::default()
    };
    let r = engine().valuate_company(&req).unwrap();
    assert_eq!(r.normalized_ebitda.value, Some(dec!(162000)));
    assert_eq!(r.net_debt.finance_lease_principal, Some(dec!(60000)));
    assert_eq!(r.net_debt.repayable_current_account, Some(dec!(40000)));
    // 100k debt + 60k lease + 40k current account - 50k cash
    assert_eq!(r.net_debt.net_debt, dec!(150000));
    assert_eq!(r.blended.low, dec!(648000));
    assert_eq!(r.equity_price.low, dec!(498000));
    assert_eq!(r.equity_price.high, dec!(822000));
}

// ===========================================================================
// Multiple adjustments
// ===========================================================================

#[test]
fn test_rural_location_lowers_multiple() {
    let mut req = services_request();
    req.location = Some(LocationTier::Rural);
    let r = engine().valuate_company(&req).unwrap();
    // 4x-6x shifted by -5%: the low end clamps back to 4x
    assert_eq!(r.blended.low, dec!(600000));
    assert_eq!(r.blended.high, dec!(855000));
    assert!(r.methods[0].clamped);
    assert!(r.flags.contains(&ValuationFlag::MultipleClamped {
        method: MethodId::EbitdaMultiple,
        unclamped_low: dec!(3.8),
        unclamped_high: dec!(5.7),
    }));
}

#[test]
fn test_market_blend_stays_within_sector_range() {
    let mut req = services_request();
    req.market = Some(MarketStatistics {
        transaction_count: 5,
        average_ebitda_multiple: Some(dec!(8)),
        ..Default::default()
    });
    let r = engine().valuate_company(&req).unwrap();
    assert_eq!(r.blended.low, dec!(780000));
    assert_eq!(r.blended.high, dec!(900000));
    assert!(r.methods[0].clamped);
    assert!(r
        .flags
        .iter()
        .any(|f| matches!(f, ValuationFlag::MarketDataBlended { transactions: 5, .. })));
    assert!(r.flags.contains(&ValuationFlag::MultipleClamped {
        method: MethodId::EbitdaMultiple,
        unclamped_low: dec!(5.2),
        unclamped_high: dec!(6.6),
    }));
}

// ===========================================================================
// Input bounds
// ===========================================================================

#[test]
fn test_oversized_revenue_rejected() {
    let mut req = services_request();
    req.sector_code = "restaurant".into();
    req.statements[0].revenue = Some(dec!(70000000000000000000000000000));
    let err = engine().valuate_company(&req).unwrap_err();
    assert!(matches!(err, ValuationError::InvalidStatement { .. }));
}

#[test]
fn test_non_consecutive_years_rejected() {
    let mut req = services_request();
    req.statements.push(FinancialStatement {
        year: 2015,
        ..services_year()
    });
    let err = engine().valuate_company(&req).unwrap_err();
    assert!(matches!(err, ValuationError::InvalidStatement { .. }));
}

// ===========================================================================
// Minority stake with key-person dependence
// ===========================================================================

#[test]
fn test_minority_stake_key_person() {
    let mut req = services_request();
    req.risk = QualitativeRisk {
        ownership_fraction: dec!(0.30),
        key_person: KeyPersonDependence::High,
        transition_commitment: false,
        ..Default::default()
    };
    let r = engine().valuate_company(&req).unwrap();
    let kinds: Vec<AdjustmentKind> = r.adjustments.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AdjustmentKind::KeyPerson, AdjustmentKind::Minority]);
    assert_eq!(r.factors.discount, dec!(0.36));
    assert!(!r.factors.ceiling_exceeded);
    assert_eq!(r.factors.ceiling, dec!(0.45));
    assert_eq!(r.adjusted_enterprise_value.low, dec!(384000));
    assert_eq!(r.equity_price.low, dec!(115200));
    assert_eq!(r.equity_price.high, dec!(172800));
    assert!(!r
        .flags
        .iter()
        .any(|f| matches!(f, ValuationFlag::DiscountCeilingExceeded { .. })));
}

#[test]
fn test_discount_ceiling_flagged() {
    let mut req = services_request();
    req.risk = QualitativeRisk {
        ownership_fraction: dec!(0.30),
        key_person: KeyPersonDependence::High,
        illiquid_shares: true,
        top_client_share: Some(dec!(0.55)),
        ..Default::default()
    };
    let r = engine().valuate_company(&req).unwrap();
    assert!(r.factors.ceiling_exceeded);
    assert_eq!(r.factors.discount, dec!(0.45));
    assert!(r.factors.uncapped_discount > dec!(0.45));
    assert!(r.flags.iter().any(|f| matches!(
        f,
        ValuationFlag::DiscountCeilingExceeded { computed, .. } if *computed == r.factors.uncapped_discount
    )));
}

// ===========================================================================
// Client concentration
// ===========================================================================

#[test]
fn test_top_client_concentration() {
    let mut req = services_request();
    req.statements = vec![
        FinancialStatement {
            equity: Some(dec!(300000)),
            cash: Some(dec!(80000)),
            financial_debt: Some(dec!(100000)),
            trade_receivables: Some(dec!(90000)),
            operating_result: Some(dec!(120000)),
            ..services_year()
        },
        FinancialStatement {
            year: 2023,
            ..services_year()
        },
        FinancialStatement {
            year: 2022,
            ..services_year()
        },
    ];
    req.risk.top_client_share = Some(dec!(0.55));
    let r = engine().valuate_company(&req).unwrap();

    let concentration = r
        .anomalies
        .iter()
        .find(|a| a.rule == "concentration.top_client")
        .unwrap();
    assert_eq!(concentration.severity, Severity::High);
    assert_ne!(r.confidence.grade, Grade::A);
    assert!(r.confidence.grade >= Grade::B);
    assert!(r
        .adjustments
        .iter()
        .any(|a| a.kind == AdjustmentKind::Concentration && a.rate == dec!(0.15)));
}

// ===========================================================================
// Sector resolution
// ===========================================================================

#[test]
fn test_naf_code_resolution() {
    let e = engine();
    assert_eq!(e.lookup_sector("56.10A").profile.code, "restaurant");
    assert_eq!(e.lookup_sector("56.10C").profile.code, "fast_food");

    let by_prefix = e.lookup_sector("56.21Z");
    assert_eq!(by_prefix.profile.code, "restaurant");
    assert_eq!(
        by_prefix.kind,
        MatchKind::Prefix {
            prefix: "56".into()
        }
    );
}

#[test]
fn test_restaurant_blend_uses_both_methods() {
    let mut req = services_request();
    req.sector_code = "56.10A".into();
    let r = engine().valuate_company(&req).unwrap();
    assert_eq!(r.methods.len(), 2);
    let total: Decimal = r.blended.weights.iter().map(|w| w.weight).sum();
    assert_eq!(total, Decimal::ONE);
    assert!(r.blended.low <= r.blended.medium && r.blended.medium <= r.blended.high);
}

#[test]
fn test_missing_ebitda_falls_back_to_revenue() {
    let mut req = services_request();
    req.sector_code = "restaurant".into();
    req.statements[0].reported_ebitda = None;
    let r = engine().valuate_company(&req).unwrap();
    assert_eq!(r.methods.len(), 1);
    assert_eq!(r.methods[0].method, MethodId::RevenueMultiple);
    assert!(r.flags.contains(&ValuationFlag::InsufficientData {
        method: MethodId::EbitdaMultiple,
        reason: smb_valuation_core::ExclusionReason::MissingEbitda,
    }));
}
