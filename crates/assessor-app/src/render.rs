//! Report serialization and file output.

use anyhow::Context;
use assessor_types::EvaluationReport;
use camino::Utf8Path;

/// Pretty JSON with a trailing newline.
pub fn serialize_report(report: &EvaluationReport) -> anyhow::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(report).context("serialize report")?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write the report to `path`, creating parent directories as needed.
pub fn write_report(path: &Utf8Path, report: &EvaluationReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("create directory {parent}"))?;
    }
    let bytes = serialize_report(report)?;
    std::fs::write(path, bytes).with_context(|| format!("write report {path}"))?;
    tracing::debug!(%path, "report written");
    Ok(())
}
