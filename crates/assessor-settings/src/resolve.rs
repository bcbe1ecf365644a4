use crate::model::AssessorConfigV1;
use anyhow::Context;
use assessor_domain::policy::{EffectiveConfig, EvaluationMode, SignalHandling};
use assessor_types::SCHEMA_CONFIG_V1;

#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub mode: Option<String>,
    pub applicability: Option<Vec<String>>,
    pub handle_signals: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub effective: EffectiveConfig,
}

pub fn resolve_config(
    cfg: AssessorConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    if let Some(schema) = cfg.schema.as_deref()
        && schema != SCHEMA_CONFIG_V1
    {
        anyhow::bail!("unsupported config schema: {schema} (expected {SCHEMA_CONFIG_V1})");
    }

    let mut effective = EffectiveConfig::default();

    if let Some(mode_s) = overrides.mode.clone().or(cfg.mode.clone()) {
        effective.mode = parse_mode(&mode_s).context("invalid mode")?;
    }

    effective.applicability = overrides
        .applicability
        .clone()
        .unwrap_or_else(|| cfg.applicability.clone());
    validate_applicability(&effective.applicability)?;

    if let Some(handle) = overrides.handle_signals.or(cfg.handle_signals) {
        effective.signal_handling = if handle {
            SignalHandling::Listen
        } else {
            SignalHandling::Ignore
        };
    }

    if let Some(filter) = cfg.log_filter {
        effective.log_filter = filter;
    }

    Ok(ResolvedConfig { effective })
}

fn validate_applicability(tags: &[String]) -> anyhow::Result<()> {
    for tag in tags {
        if tag.trim().is_empty() {
            anyhow::bail!("applicability tags must not be empty");
        }
    }
    Ok(())
}

fn parse_mode(v: &str) -> anyhow::Result<EvaluationMode> {
    match v {
        "strict" => Ok(EvaluationMode::Strict),
        "tolerant" => Ok(EvaluationMode::Tolerant),
        other => anyhow::bail!("unknown mode: {other} (expected 'strict' or 'tolerant')"),
    }
}
