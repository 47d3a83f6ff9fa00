use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuationError {
    /// Never returned by a valuation request: the registry recovers with the
    /// default profile and records a result flag instead.
    #[error("Unknown sector: {0}")]
    UnknownSector(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid statement: {field}: {reason}")]
    InvalidStatement { field: String, reason: String },

    #[error("Sector '{sector}' method weights sum to {total}, expected 1.0")]
    WeightConfiguration { sector: String, total: Decimal },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ValuationError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValuationError::InvalidStatement {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ValuationError {
    fn from(e: serde_json::Error) -> Self {
        ValuationError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for ValuationError {
    fn from(e: serde_yaml::Error) -> Self {
        ValuationError::Serialization(e.to_string())
    }
}
