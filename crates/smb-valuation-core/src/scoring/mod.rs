//! Rule-based anomaly detection over the statement series and the confidence
//! grade derived from input quality.

pub mod anomalies;
pub mod confidence;

pub use anomalies::{scan, Anomaly, AnomalyCategory, AnomalyKind, ScanReport, Severity};
pub use confidence::{grade, ConfidenceReason, ConfidenceReport, Grade};
