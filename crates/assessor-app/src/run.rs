//! The `run` use case: evaluate controls against a target and produce a receipt.

use anyhow::Context;
use assessor_domain::{ControlEvaluation, EXIT_INTERRUPTED, Interrupt, SignalHandling};
use assessor_settings::{AssessorConfigV1, Overrides, ResolvedConfig};
use assessor_types::{
    EvaluationReport, Outcome, ReportEnvelope, RunSummary, SCHEMA_REPORT_V1, ToolMeta, ids,
};
use time::OffsetDateTime;

/// Input for the run use case.
pub struct RunInput<'a, T: ?Sized> {
    /// Opaque data handed to every step.
    pub target: &'a T,
    /// Controls to evaluate, in order.
    pub controls: &'a mut [ControlEvaluation<T>],
    /// Config file contents (empty string if not found).
    pub config_text: &'a str,
    /// Caller overrides.
    pub overrides: Overrides,
    /// Shared by every control in this run; trigger it to stop at the next step boundary.
    pub interrupt: Interrupt,
}

impl<'a, T: ?Sized> RunInput<'a, T> {
    pub fn new(target: &'a T, controls: &'a mut [ControlEvaluation<T>]) -> Self {
        Self {
            target,
            controls,
            config_text: "",
            overrides: Overrides::default(),
            interrupt: Interrupt::new(),
        }
    }
}

/// Output from the run use case.
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub report: EvaluationReport,
    pub resolved_config: ResolvedConfig,
}

/// Resolve config, evaluate each control in order, and build the report.
///
/// With signal handling on, one termination listener covers the whole run, including the gaps
/// between controls. Once an interrupt is observed no further control is started. Every control
/// that did run has already reverted its changes by the time this returns.
pub fn run_evaluations<T: ?Sized>(input: RunInput<'_, T>) -> anyhow::Result<RunOutput> {
    let started_at = OffsetDateTime::now_utc();

    let cfg = if input.config_text.trim().is_empty() {
        AssessorConfigV1::default()
    } else {
        assessor_settings::parse_config_toml(input.config_text).context("parse config")?
    };
    let resolved =
        assessor_settings::resolve_config(cfg, input.overrides).context("resolve config")?;
    let effective = &resolved.effective;

    tracing::info!(
        mode = effective.mode.as_str(),
        applicability = ?effective.applicability,
        controls = input.controls.len(),
        "starting evaluation run"
    );

    let _listener = match effective.signal_handling {
        SignalHandling::Listen => {
            match assessor_domain::listen_for_termination(input.interrupt.clone()) {
                Ok(guard) => Some(guard),
                Err(err) => {
                    tracing::warn!(error = %err, "could not install termination listener");
                    None
                }
            }
        }
        SignalHandling::Ignore => None,
    };

    let mut evaluations = Vec::new();
    let mut summary = RunSummary {
        mode: effective.mode.as_str().to_string(),
        target_applicability: effective.applicability.clone(),
        ..RunSummary::default()
    };
    let mut outcome = Outcome::NotRun;
    let mut any_applicable = false;

    for control in input.controls.iter_mut() {
        if input.interrupt.is_triggered() {
            tracing::warn!(
                control_id = control.control_id(),
                "skipping control after interrupt"
            );
            continue;
        }

        control.set_signal_handling(SignalHandling::Ignore);
        control.set_interrupt(input.interrupt.clone());
        let result = control.evaluate_with(
            effective.mode,
            input.target,
            effective.applicability.as_slice(),
        );

        summary.controls_evaluated += 1;
        for assessment in control.assessments() {
            if !matches!(assessment.result(), Outcome::NotRun | Outcome::NotApplicable) {
                summary.assessments_run += 1;
            }
            let steps = u32::try_from(assessment.steps_executed()).unwrap_or(u32::MAX);
            summary.steps_executed = summary.steps_executed.saturating_add(steps);
        }
        summary.corrupted |= control.corrupted_state();
        summary.interrupted |= control.was_interrupted();

        if result != Outcome::NotApplicable {
            any_applicable = true;
            outcome = outcome.aggregate(result);
        }
        evaluations.push(control.record());
    }

    if summary.controls_evaluated > 0 && !any_applicable {
        outcome = Outcome::NotApplicable;
    }

    let finished_at = OffsetDateTime::now_utc();

    let report = ReportEnvelope {
        schema: SCHEMA_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: ids::TOOL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        started_at,
        finished_at,
        outcome,
        evaluations,
        data: summary,
    };

    tracing::info!(
        outcome = %report.outcome,
        corrupted = report.data.corrupted,
        interrupted = report.data.interrupted,
        "evaluation run finished"
    );

    Ok(RunOutput {
        report,
        resolved_config: resolved,
    })
}

/// Map a report to a process exit code.
///
/// Interrupted (130) wins over corrupted (3), which wins over the outcome itself.
pub fn exit_code(report: &EvaluationReport) -> i32 {
    if report.data.interrupted {
        return EXIT_INTERRUPTED;
    }
    if report.data.corrupted {
        return 3;
    }
    match report.outcome {
        Outcome::Passed | Outcome::NotApplicable => 0,
        Outcome::NeedsReview | Outcome::Unknown | Outcome::NotRun => 1,
        Outcome::Failed => 2,
    }
}
