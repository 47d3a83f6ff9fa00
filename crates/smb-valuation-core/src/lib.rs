pub mod adjustments;
pub mod config;
pub mod engine;
pub mod error;
pub mod flags;
pub mod normalization;
pub mod scoring;
pub mod sector;
pub mod statements;
pub mod types;
pub mod valuation;

pub use config::EngineConfig;
pub use engine::{
    Engine, NormalizationReport, ResolvedSector, ScanOutcome, ValuationRequest, ValuationResult,
};
pub use error::ValuationError;
pub use flags::{ExclusionReason, ValuationFlag};
pub use statements::{FinancialStatement, StatementSeries};
pub use types::*;

/// Standard result type for all engine operations
pub type EngineResult<T> = Result<T, ValuationError>;
