//! Execution of one requirement's ordered steps.

use crate::change::{Change, ChangeRegistry};
use crate::interrupt::Interrupt;
use crate::policy::EvaluationMode;
use crate::step::Step;
use assessor_types::receipt::AssessmentRecord;
use assessor_types::{Outcome, ids};
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};

/// Construction failure: an assessment needs a requirement id, a description, at least one
/// applicability tag and at least one step.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AssessmentError {
    #[error(
        "expected all assessment fields to have a value, but got: requirement_id=len({requirement_id}), description=len({description}), applicability=len({applicability}), steps=len({steps})"
    )]
    Incomplete {
        requirement_id: usize,
        description: usize,
        applicability: usize,
        steps: usize,
    },
}

impl AssessmentError {
    /// The outcome an assessment carries when it fails validation.
    pub fn outcome(&self) -> Outcome {
        Outcome::Unknown
    }
}

pub struct Assessment<T: ?Sized> {
    requirement_id: String,
    description: String,
    applicability: Vec<String>,
    steps: Vec<Step<T>>,

    result: Outcome,
    message: String,
    steps_executed: usize,
    run_duration: Option<Duration>,
    value: JsonValue,
    changes: ChangeRegistry,
}

impl<T: ?Sized> Assessment<T> {
    pub fn new<I, S>(
        requirement_id: impl Into<String>,
        description: impl Into<String>,
        applicability: I,
        steps: Vec<Step<T>>,
    ) -> Result<Self, AssessmentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let assessment = Self {
            requirement_id: requirement_id.into(),
            description: description.into(),
            applicability: applicability.into_iter().map(Into::into).collect(),
            steps,
            result: Outcome::NotRun,
            message: String::new(),
            steps_executed: 0,
            run_duration: None,
            value: JsonValue::Null,
            changes: ChangeRegistry::new(),
        };
        assessment.validate()?;
        Ok(assessment)
    }

    /// Queue another step after the existing ones.
    pub fn add_step(&mut self, step: Step<T>) {
        self.steps.push(step);
    }

    /// Register a change in this assessment's own registry.
    pub fn new_change(&mut self, name: impl Into<String>, change: Change) -> &mut Change {
        self.changes.record(name, change)
    }

    /// Execute every step in order, halting at the first `Failed` outcome.
    pub fn run<S: AsRef<str>>(&mut self, target: &T, target_applicability: &[S]) -> Outcome {
        self.execute(
            target,
            target_applicability,
            EvaluationMode::Strict,
            &Interrupt::new(),
        )
    }

    /// Execute every step in order regardless of intermediate outcomes.
    pub fn run_tolerate_failures<S: AsRef<str>>(
        &mut self,
        target: &T,
        target_applicability: &[S],
    ) -> Outcome {
        self.execute(
            target,
            target_applicability,
            EvaluationMode::Tolerant,
            &Interrupt::new(),
        )
    }

    pub(crate) fn execute<S: AsRef<str>>(
        &mut self,
        target: &T,
        target_applicability: &[S],
        mode: EvaluationMode,
        interrupt: &Interrupt,
    ) -> Outcome {
        self.result = Outcome::NotRun;
        self.message.clear();
        self.steps_executed = 0;
        self.run_duration = None;

        if let Err(err) = self.validate() {
            tracing::warn!(requirement_id = %self.requirement_id, error = %err, "assessment failed precheck");
            self.result = err.outcome();
            self.message = err.to_string();
            return self.result;
        }

        if !self.is_applicable(target_applicability) {
            tracing::debug!(requirement_id = %self.requirement_id, "assessment not applicable");
            self.result = Outcome::NotApplicable;
            self.message = ids::MSG_NOT_APPLICABLE.to_string();
            return self.result;
        }

        let started = Instant::now();
        for step in &self.steps {
            if interrupt.is_triggered() {
                // Unfinished work cannot be called a pass.
                self.result = self.result.aggregate(Outcome::Unknown);
                self.message = ids::MSG_INTERRUPTED.to_string();
                break;
            }

            self.steps_executed += 1;
            let (outcome, message) = step.invoke(target, &mut self.changes);
            tracing::debug!(
                requirement_id = %self.requirement_id,
                step = step.name(),
                outcome = %outcome,
                "step finished"
            );
            self.result = self.result.aggregate(outcome);
            self.message = message;

            if mode.halts_on_failure() && self.result.is_failed() {
                break;
            }
        }
        self.run_duration = Some(started.elapsed());

        tracing::info!(
            requirement_id = %self.requirement_id,
            outcome = %self.result,
            steps_executed = self.steps_executed,
            steps_total = self.steps.len(),
            "assessment finished"
        );
        self.result
    }

    /// Revert this assessment's changes; `true` means something could not be undone.
    pub fn revert_changes(&mut self) -> bool {
        let corrupted = self.changes.revert_all();
        if corrupted {
            tracing::warn!(requirement_id = %self.requirement_id, "assessment left changes unreverted");
        }
        corrupted
    }

    /// Any shared tag between the assessment and the target makes it applicable.
    pub fn is_applicable<S: AsRef<str>>(&self, target_applicability: &[S]) -> bool {
        self.applicability
            .iter()
            .any(|tag| target_applicability.iter().any(|t| t.as_ref() == tag))
    }

    fn validate(&self) -> Result<(), AssessmentError> {
        if self.requirement_id.is_empty()
            || self.description.is_empty()
            || self.applicability.is_empty()
            || self.steps.is_empty()
        {
            return Err(AssessmentError::Incomplete {
                requirement_id: self.requirement_id.len(),
                description: self.description.len(),
                applicability: self.applicability.len(),
                steps: self.steps.len(),
            });
        }
        Ok(())
    }

    pub fn requirement_id(&self) -> &str {
        &self.requirement_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn applicability(&self) -> &[String] {
        &self.applicability
    }

    pub fn steps(&self) -> &[Step<T>] {
        &self.steps
    }

    pub fn result(&self) -> Outcome {
        self.result
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn steps_executed(&self) -> usize {
        self.steps_executed
    }

    /// Wall time of the last run, recorded whether or not it halted early.
    pub fn run_duration(&self) -> Option<Duration> {
        self.run_duration
    }

    pub fn value(&self) -> &JsonValue {
        &self.value
    }

    pub fn set_value(&mut self, value: JsonValue) {
        self.value = value;
    }

    pub fn changes(&self) -> &ChangeRegistry {
        &self.changes
    }

    pub fn changes_mut(&mut self) -> &mut ChangeRegistry {
        &mut self.changes
    }

    pub fn record(&self) -> AssessmentRecord {
        AssessmentRecord {
            requirement_id: self.requirement_id.clone(),
            description: self.description.clone(),
            applicability: self.applicability.clone(),
            result: self.result,
            message: self.message.clone(),
            steps: self.steps.iter().map(|s| s.name().to_string()).collect(),
            steps_executed: u32::try_from(self.steps_executed).unwrap_or(u32::MAX),
            run_duration_ms: self
                .run_duration
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            value: self.value.clone(),
            changes: self.changes.records(),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for Assessment<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assessment")
            .field("requirement_id", &self.requirement_id)
            .field("result", &self.result)
            .field("steps", &self.steps)
            .field("steps_executed", &self.steps_executed)
            .field("changes", &self.changes)
            .finish_non_exhaustive()
    }
}
