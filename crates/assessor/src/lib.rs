//! Public facade for the assessor engine.
//!
//! Build [`Assessment`]s from requirement data, register them on a [`ControlEvaluation`], and
//! evaluate against your target. Changes recorded by steps are reverted before evaluation
//! returns.

#![forbid(unsafe_code)]

pub use assessor_domain::{
    Assessment, AssessmentError, Change, ChangeError, ChangeRegistry, ControlEvaluation,
    EvaluationMode, Interrupt, Outcome, SignalHandling, Step, StepOutput, aggregate,
};
pub use assessor_types::receipt;
