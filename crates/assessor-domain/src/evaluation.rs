//! Orchestration of every assessment belonging to one control.

use crate::assessment::{Assessment, AssessmentError};
use crate::interrupt::{Interrupt, SignalGuard, listen_for_termination};
use crate::policy::{EvaluationMode, SignalHandling};
use crate::step::Step;
use assessor_types::receipt::ControlEvaluationRecord;
use assessor_types::{Outcome, ids};

pub struct ControlEvaluation<T: ?Sized> {
    name: String,
    control_id: String,
    result: Outcome,
    message: String,
    corrupted_state: bool,
    remediation_guide: Option<String>,
    assessments: Vec<Assessment<T>>,

    signal_handling: SignalHandling,
    interrupt: Interrupt,
    interrupted: bool,
}

impl<T: ?Sized> ControlEvaluation<T> {
    pub fn new(name: impl Into<String>, control_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            control_id: control_id.into(),
            result: Outcome::NotRun,
            message: String::new(),
            corrupted_state: false,
            remediation_guide: None,
            assessments: Vec::new(),
            signal_handling: SignalHandling::default(),
            interrupt: Interrupt::new(),
            interrupted: false,
        }
    }

    #[must_use]
    pub fn with_remediation_guide(mut self, url: impl Into<String>) -> Self {
        self.remediation_guide = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_signal_handling(mut self, signal_handling: SignalHandling) -> Self {
        self.signal_handling = signal_handling;
        self
    }

    /// Share an interrupt flag with other evaluations (e.g. one per process).
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn set_signal_handling(&mut self, signal_handling: SignalHandling) {
        self.signal_handling = signal_handling;
    }

    pub fn set_interrupt(&mut self, interrupt: Interrupt) {
        self.interrupt = interrupt;
    }

    /// Build an assessment and register it. Nothing is registered when construction fails.
    pub fn add_assessment<I, S>(
        &mut self,
        requirement_id: impl Into<String>,
        description: impl Into<String>,
        applicability: I,
        steps: Vec<Step<T>>,
    ) -> Result<&mut Assessment<T>, AssessmentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let assessment = Assessment::new(requirement_id, description, applicability, steps)?;
        Ok(self.push_assessment(assessment))
    }

    pub fn push_assessment(&mut self, assessment: Assessment<T>) -> &mut Assessment<T> {
        self.assessments.push(assessment);
        let last = self.assessments.len() - 1;
        &mut self.assessments[last]
    }

    /// Run every assessment strictly, stopping at the first `Failed` result.
    pub fn evaluate<S: AsRef<str>>(&mut self, target: &T, target_applicability: &[S]) -> Outcome {
        self.evaluate_with(EvaluationMode::Strict, target, target_applicability)
    }

    /// Run every step of every assessment regardless of failures.
    pub fn tolerant_evaluate<S: AsRef<str>>(
        &mut self,
        target: &T,
        target_applicability: &[S],
    ) -> Outcome {
        self.evaluate_with(EvaluationMode::Tolerant, target, target_applicability)
    }

    pub fn evaluate_with<S: AsRef<str>>(
        &mut self,
        mode: EvaluationMode,
        target: &T,
        target_applicability: &[S],
    ) -> Outcome {
        if self.assessments.is_empty() {
            self.result = Outcome::NeedsReview;
            self.message = ids::MSG_NO_ASSESSMENTS.to_string();
            return self.result;
        }

        self.result = Outcome::NotRun;
        self.message.clear();
        self.interrupted = false;

        let _listener = self.arm_listener();

        let mut applicable = 0usize;
        for assessment in &mut self.assessments {
            if self.interrupt.is_triggered() {
                break;
            }
            let outcome = assessment.execute(target, target_applicability, mode, &self.interrupt);
            self.message = assessment.message().to_string();
            if outcome == Outcome::NotApplicable {
                continue;
            }
            applicable += 1;
            self.result = self.result.aggregate(outcome);
            if mode.halts_on_failure() && self.result.is_failed() {
                break;
            }
        }

        if self.interrupt.is_triggered() {
            self.interrupted = true;
            self.result = self.result.aggregate(Outcome::Unknown);
            self.message = ids::MSG_INTERRUPTED.to_string();
            tracing::warn!(control_id = %self.control_id, "control evaluation interrupted");
        } else if applicable == 0 {
            self.result = Outcome::NotApplicable;
        }

        self.cleanup();

        tracing::info!(
            control_id = %self.control_id,
            mode = mode.as_str(),
            outcome = %self.result,
            corrupted = self.corrupted_state,
            "control evaluation finished"
        );
        self.result
    }

    /// Revert the changes of every assessment. Safe to call any number of times.
    ///
    /// Returns whether this pass found corruption; `corrupted_state` stays set once raised.
    pub fn cleanup(&mut self) -> bool {
        let mut corrupted = false;
        for assessment in &mut self.assessments {
            if assessment.revert_changes() {
                corrupted = true;
            }
        }
        if corrupted {
            self.corrupted_state = true;
            tracing::warn!(
                control_id = %self.control_id,
                "control evaluation left the target in a corrupted state"
            );
        }
        corrupted
    }

    fn arm_listener(&self) -> Option<SignalGuard> {
        match self.signal_handling {
            SignalHandling::Ignore => None,
            SignalHandling::Listen => match listen_for_termination(self.interrupt.clone()) {
                Ok(guard) => Some(guard),
                Err(err) => {
                    tracing::warn!(error = %err, "could not install termination listener");
                    None
                }
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn control_id(&self) -> &str {
        &self.control_id
    }

    pub fn result(&self) -> Outcome {
        self.result
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn corrupted_state(&self) -> bool {
        self.corrupted_state
    }

    pub fn remediation_guide(&self) -> Option<&str> {
        self.remediation_guide.as_deref()
    }

    pub fn assessments(&self) -> &[Assessment<T>] {
        &self.assessments
    }

    pub fn assessments_mut(&mut self) -> &mut [Assessment<T>] {
        &mut self.assessments
    }

    /// Handle that can be triggered to stop the evaluation at the next step boundary.
    pub fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn record(&self) -> ControlEvaluationRecord {
        ControlEvaluationRecord {
            name: self.name.clone(),
            control_id: self.control_id.clone(),
            result: self.result,
            message: self.message.clone(),
            corrupted_state: self.corrupted_state,
            interrupted: self.interrupted,
            remediation_guide: self.remediation_guide.clone(),
            assessments: self.assessments.iter().map(Assessment::record).collect(),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for ControlEvaluation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlEvaluation")
            .field("control_id", &self.control_id)
            .field("result", &self.result)
            .field("corrupted_state", &self.corrupted_state)
            .field("assessments", &self.assessments)
            .finish_non_exhaustive()
    }
}
