//! Stable DTOs and IDs used across the assessor workspace.
//!
//! This crate is intentionally boring:
//! - the `Outcome` enumeration and its aggregation rule
//! - stable schema identifiers
//! - serializable records of a finished evaluation (the receipt)

#![forbid(unsafe_code)]

pub mod ids;
pub mod outcome;
pub mod receipt;

pub use ids::{EXIT_INTERRUPTED, SCHEMA_CONFIG_V1, SCHEMA_REPORT_V1};
pub use outcome::{Outcome, ParseOutcomeError, aggregate};
pub use receipt::{
    AssessmentRecord, ChangeRecord, ControlEvaluationRecord, EvaluationReport, ReportEnvelope,
    RunSummary, ToolMeta,
};
