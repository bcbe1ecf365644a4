/// How a control evaluation reacts to a failing step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Halt at the first `Failed` outcome, both within an assessment and across assessments.
    #[default]
    Strict,
    /// Run every step of every assessment regardless of intermediate outcomes.
    Tolerant,
}

impl EvaluationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationMode::Strict => "strict",
            EvaluationMode::Tolerant => "tolerant",
        }
    }

    pub fn halts_on_failure(self) -> bool {
        self == EvaluationMode::Strict
    }
}

/// Whether an evaluation arms the termination-signal listener while it runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignalHandling {
    #[default]
    Listen,
    Ignore,
}

#[derive(Clone, Debug)]
pub struct EffectiveConfig {
    pub mode: EvaluationMode,
    /// Target applicability tags every assessment is filtered against.
    pub applicability: Vec<String>,
    pub signal_handling: SignalHandling,
    pub log_filter: String,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            mode: EvaluationMode::Strict,
            applicability: Vec::new(),
            signal_handling: SignalHandling::Listen,
            log_filter: "info".to_string(),
        }
    }
}
