use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::chain::Adjustment;
use crate::sector::Direction;
use crate::types::{round_rate, Rate};

/// Cumulative effect of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackedFactors {
    /// D = 1 - prod(1 - d_i), after the ceiling
    pub discount: Rate,
    /// D before the ceiling
    pub uncapped_discount: Rate,
    /// P - 1 with P = prod(1 + p_i)
    pub premium: Rate,
    /// (1 - D) * P
    pub factor: Rate,
    pub ceiling: Rate,
    pub ceiling_exceeded: bool,
}

/// Stack discounts and premiums multiplicatively.
///
/// Products commute, so the result does not depend on chain order.
pub fn stack(chain: &[Adjustment], ceiling: Rate) -> StackedFactors {
    let mut kept = Decimal::ONE;
    let mut premium = Decimal::ONE;
    for adj in chain {
        match adj.direction {
            Direction::Discount => kept *= Decimal::ONE - adj.rate,
            Direction::Premium => premium *= Decimal::ONE + adj.rate,
        }
    }

    let uncapped = Decimal::ONE - kept;
    let ceiling_exceeded = uncapped > ceiling;
    let discount = uncapped.min(ceiling);

    StackedFactors {
        discount: round_rate(discount),
        uncapped_discount: round_rate(uncapped),
        premium: round_rate(premium - Decimal::ONE),
        factor: round_rate((Decimal::ONE - discount) * premium),
        ceiling,
        ceiling_exceeded,
    }
}
