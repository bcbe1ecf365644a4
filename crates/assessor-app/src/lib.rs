//! Use case orchestration for assessor.
//!
//! This crate provides the application layer: it resolves configuration, drives control
//! evaluations through the domain engine, and turns their state into a versioned receipt. It is
//! intentionally thin and delegates the run semantics to `assessor-domain`.

#![forbid(unsafe_code)]

mod logging;
mod render;
mod run;

pub use logging::init_logging;
pub use render::{serialize_report, write_report};
pub use run::{RunInput, RunOutput, exit_code, run_evaluations};
