//! EBITDA normalization: reverses owner-specific and non-recurring distortions
//! in the latest year's earnings.

pub mod ebitda;
pub mod inputs;

pub use ebitda::{
    normalize, AdjustmentCategory, EbitdaSource, NormalizationAdjustment, NormalizedEbitda,
};
pub use inputs::{
    adjustments_from_inputs, owner_compensation_adjustment, CurrentAccountInput, DebtLikeItems,
    FamilyCompensationInput, FinanceLeaseInput, NonRecurringItem, NormalizationInputs,
    NormalizationPlan, OwnerCompensationInput, RentInput,
};
