//! Assessment execution engine (no report IO).
//!
//! Input: assessments built from requirement data plus opaque target data.
//! Output: aggregated outcomes, recorded changes (reverted on the way out), and receipt records.

#![forbid(unsafe_code)]

pub mod assessment;
pub mod change;
pub mod evaluation;
pub mod interrupt;
pub mod policy;
pub mod step;

#[cfg(test)]
mod proptest;
#[cfg(test)]
mod test_support;

pub use assessment::{Assessment, AssessmentError};
pub use assessor_types::{Outcome, aggregate};
pub use change::{Change, ChangeError, ChangeRegistry};
pub use evaluation::ControlEvaluation;
pub use interrupt::{
    EXIT_INTERRUPTED, Interrupt, SignalGuard, is_listening, listen_for_termination,
};
pub use policy::{EffectiveConfig, EvaluationMode, SignalHandling};
pub use step::{Step, StepOutput};
