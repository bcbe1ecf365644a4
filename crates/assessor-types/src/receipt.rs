use crate::Outcome;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

/// Snapshot of one recorded change after cleanup ran.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeRecord {
    /// Registry key chosen by the step that recorded the change.
    pub name: String,
    pub target_name: String,
    pub description: String,
    pub applied: bool,
    pub reverted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssessmentRecord {
    pub requirement_id: String,
    pub description: String,
    pub applicability: Vec<String>,
    pub result: Outcome,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Symbolic step names in registration order. Executable content is never serialized.
    pub steps: Vec<String>,
    pub steps_executed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_duration_ms: Option<u64>,

    /// Opaque value a step chose to surface (kept open-ended).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub value: JsonValue,

    /// Sorted by change name so receipts are deterministic.
    #[serde(default)]
    pub changes: Vec<ChangeRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ControlEvaluationRecord {
    pub name: String,
    pub control_id: String,
    pub result: Outcome,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub corrupted_state: bool,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_guide: Option<String>,
    pub assessments: Vec<AssessmentRecord>,
}

/// Assessor-specific summary payload for the report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct RunSummary {
    /// `strict` or `tolerant`.
    pub mode: String,
    pub target_applicability: Vec<String>,
    pub controls_evaluated: u32,
    pub assessments_run: u32,
    pub steps_executed: u32,
    pub corrupted: bool,
    pub interrupted: bool,
}

/// A generic receipt/envelope.
///
/// The outer shape stays fixed while `data` carries run-specific summary fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportEnvelope<TData = RunSummary> {
    /// Versioned schema identifier for the envelope shape.
    pub schema: String,
    pub tool: ToolMeta,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    /// Aggregate over every control evaluated in this run.
    pub outcome: Outcome,
    pub evaluations: Vec<ControlEvaluationRecord>,
    pub data: TData,
}

pub type EvaluationReport = ReportEnvelope<RunSummary>;
