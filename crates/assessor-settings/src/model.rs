use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `assessor.toml` schema v1.
///
/// This is a *user-facing* config model: every field is optional so an empty file is valid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AssessorConfigV1 {
    /// Optional schema string for tooling (`assessor.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// `strict` (default) halts at the first failure; `tolerant` runs everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Applicability tags describing the target (e.g. `["cloud", "linux"]`).
    #[serde(default)]
    pub applicability: Vec<String>,

    /// Listen for Ctrl-C / SIGTERM while evaluating (default `true`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_signals: Option<bool>,

    /// `tracing` filter directive used when the caller initializes logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}
