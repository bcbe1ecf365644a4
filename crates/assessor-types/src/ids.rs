//! Stable identifiers for schemas and well-known messages.

// Schemas
pub const SCHEMA_REPORT_V1: &str = "assessor.report.v1";
pub const SCHEMA_CONFIG_V1: &str = "assessor.config.v1";

// Tool-level
pub const TOOL_NAME: &str = "assessor";

// Messages recorded by the engine itself (never by steps).
pub const MSG_NOT_APPLICABLE: &str = "assessment is not applicable to the target";
pub const MSG_INTERRUPTED: &str = "evaluation interrupted before completion";
pub const MSG_NO_ASSESSMENTS: &str = "no assessments registered for this control";

// Process exit status after a termination signal (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;
