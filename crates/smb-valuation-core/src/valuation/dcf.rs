use rust_decimal::Decimal;

use super::method::{AppliedFactor, MethodResult};
use crate::config::DcfSettings;
use crate::sector::MethodId;
use crate::types::{round_money, round_rate, Money, Rate};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Short-horizon DCF on normalized EBITDA.
///
/// Free cash flow is EBITDA after the reinvestment share and a flat tax
/// haircut. It grows at the trailing revenue growth (bounded by the configured
/// floor and cap, terminal growth when unknown) over the explicit horizon and
/// is closed with a Gordon terminal value. The low estimate discounts at
/// `discount_rate + rate_spread`, the high estimate at `discount_rate - rate_spread`.
///
/// The caller guarantees a positive `ebitda`.
pub fn value_by_dcf(ebitda: Money, trailing_growth: Option<Rate>, settings: &DcfSettings) -> MethodResult {
    let growth = trailing_growth
        .unwrap_or(settings.terminal_growth)
        .max(settings.growth_floor)
        .min(settings.growth_cap);

    let fcf0 = ebitda * (Decimal::ONE - settings.reinvestment_rate) * (Decimal::ONE - settings.tax_rate);

    let low_rate = settings.discount_rate + settings.rate_spread;
    let high_rate = settings.discount_rate - settings.rate_spread;

    let low = present_value(fcf0, growth, low_rate, settings);
    let high = present_value(fcf0, growth, high_rate, settings);

    MethodResult {
        method: MethodId::DiscountedCashFlow,
        low: round_money(low.min(high)),
        high: round_money(low.max(high)),
        weight: Decimal::ZERO,
        basis: round_money(ebitda),
        applied: AppliedFactor::DiscountRate {
            low_estimate_rate: round_rate(low_rate),
            high_estimate_rate: round_rate(high_rate),
            growth: round_rate(growth),
            terminal_growth: round_rate(settings.terminal_growth),
        },
        rationale: "dcf.explicit_horizon_plus_gordon".to_string(),
        clamped: false,
        floor: false,
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// PV of `horizon_years` growing flows plus the discounted terminal value.
fn present_value(fcf0: Money, growth: Rate, rate: Rate, settings: &DcfSettings) -> Money {
    let growth_factor = Decimal::ONE + growth;
    let rate_factor = Decimal::ONE + rate;

    let mut cash_flow = fcf0;
    let mut discount = Decimal::ONE;
    let mut pv = Decimal::ZERO;
    for _ in 0..settings.horizon_years {
        cash_flow *= growth_factor;
        discount *= rate_factor;
        pv += cash_flow / discount;
    }

    let tg = settings.terminal_growth;
    let terminal = cash_flow * (Decimal::ONE + tg) / (rate - tg);
    pv + terminal / discount
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flat_growth_collapses_to_gordon() {
        // g = terminal growth, so the whole stream is one perpetuity:
        // 52,500 * 1.015 / (0.14 - 0.015) = 426,300
        let r = value_by_dcf(dec!(100000), None, &DcfSettings::default());
        assert_eq!(r.low, dec!(426300.00));
        assert!((r.high - dec!(626911.76)).abs() <= dec!(0.01));
    }

    #[test]
    fn test_rates_reported() {
        let r = value_by_dcf(dec!(100000), Some(dec!(0.05)), &DcfSettings::default());
        match r.applied {
            AppliedFactor::DiscountRate {
                low_estimate_rate,
                high_estimate_rate,
                growth,
                ..
            } => {
                assert_eq!(low_estimate_rate, dec!(0.14));
                assert_eq!(high_estimate_rate, dec!(0.10));
                assert_eq!(growth, dec!(0.05));
            }
            other => panic!("unexpected factor {other:?}"),
        }
        assert!(r.low < r.high);
    }

    #[test]
    fn test_growth_is_capped() {
        let settings = DcfSettings::default();
        let capped = value_by_dcf(dec!(100000), Some(dec!(0.60)), &settings);
        let at_cap = value_by_dcf(dec!(100000), Some(settings.growth_cap), &settings);
        assert_eq!(capped.low, at_cap.low);
        assert_eq!(capped.high, at_cap.high);
    }

    #[test]
    fn test_higher_growth_higher_value() {
        let settings = DcfSettings::default();
        let slow = value_by_dcf(dec!(100000), Some(dec!(0.00)), &settings);
        let fast = value_by_dcf(dec!(100000), Some(dec!(0.08)), &settings);
        assert!(fast.low > slow.low);
    }

    #[test]
    fn test_linear_in_ebitda() {
        let settings = DcfSettings::default();
        let a = value_by_dcf(dec!(100000), Some(dec!(0.03)), &settings);
        let b = value_by_dcf(dec!(200000), Some(dec!(0.03)), &settings);
        assert!((b.low - a.low * dec!(2)).abs() <= dec!(0.02));
    }
}
