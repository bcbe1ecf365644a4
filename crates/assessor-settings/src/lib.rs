//! Config parsing and run policy resolution.
//!
//! This crate is intentionally IO-free: it parses and resolves configuration provided as strings.

#![forbid(unsafe_code)]

mod model;
mod resolve;

pub use model::AssessorConfigV1;
pub use resolve::{Overrides, ResolvedConfig};

/// Parse `assessor.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<AssessorConfigV1> {
    let cfg: AssessorConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the effective run policy (config file + caller overrides).
pub fn resolve_config(
    cfg: AssessorConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}
