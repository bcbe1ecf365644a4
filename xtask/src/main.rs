//! Developer tasks (schema generation, receipt conformance).
//!
//! Keeping this separate avoids bloating the library crates.

use anyhow::{Context, bail};
use assessor_domain::{Change, ControlEvaluation, Outcome, Step};
use assessor_settings::Overrides;
use schemars::schema_for;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Get the project root (parent of xtask directory).
fn project_root() -> anyhow::Result<PathBuf> {
    let manifest_dir = match std::env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => std::env::current_dir().context("Cannot determine current directory")?,
    };

    if manifest_dir.ends_with("xtask") {
        let parent = manifest_dir.parent().context("xtask has no parent")?;
        Ok(parent.to_path_buf())
    } else {
        Ok(manifest_dir)
    }
}

fn schemas_dir() -> anyhow::Result<PathBuf> {
    Ok(project_root()?.join("schemas"))
}

/// Schema definition with its target filename.
struct SchemaSpec {
    filename: &'static str,
    generate: fn() -> schemars::Schema,
}

fn generate_report_schema() -> schemars::Schema {
    schema_for!(assessor_types::EvaluationReport)
}

fn generate_config_schema() -> schemars::Schema {
    schema_for!(assessor_settings::AssessorConfigV1)
}

fn schema_specs() -> Vec<SchemaSpec> {
    vec![
        SchemaSpec {
            filename: "assessor.report.v1.json",
            generate: generate_report_schema,
        },
        SchemaSpec {
            filename: "assessor.config.v1.json",
            generate: generate_config_schema,
        },
    ]
}

/// Serialize a schema to pretty-printed JSON with trailing newline.
fn serialize_schema(schema: &schemars::Schema) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(schema).context("Failed to serialize schema")?;
    json.push('\n');
    Ok(json)
}

/// Emit schemas to the schemas/ directory.
fn emit_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir()?;
    fs::create_dir_all(&dir).context("Failed to create schemas directory")?;

    for spec in schema_specs() {
        let json = serialize_schema(&(spec.generate)())?;
        let path = dir.join(spec.filename);
        fs::write(&path, &json)
            .with_context(|| format!("Failed to write schema to {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!("\nSchemas emitted successfully.");
    Ok(())
}

/// Validate that schemas in the repo match what would be generated.
fn validate_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir()?;
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for spec in schema_specs() {
        let path = dir.join(spec.filename);
        if !path.exists() {
            missing.push(spec.filename);
            continue;
        }

        let expected = serialize_schema(&(spec.generate)())?;
        let actual = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if expected != actual {
            mismatched.push(spec.filename);
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        println!("All schemas are up to date.");
        return Ok(());
    }

    if !missing.is_empty() {
        eprintln!("Missing schemas:");
        for name in &missing {
            eprintln!("  - {name}");
        }
    }
    if !mismatched.is_empty() {
        eprintln!("Schemas out of date:");
        for name in &mismatched {
            eprintln!("  - {name}");
        }
    }
    eprintln!("\nRun `cargo xtask emit-schemas` to regenerate.");
    bail!("Schema validation failed")
}

type ScratchHost = Arc<Mutex<BTreeMap<String, String>>>;

/// A small run over an in-memory host covering every receipt section.
fn sample_controls() -> anyhow::Result<Vec<ControlEvaluation<ScratchHost>>> {
    let mut access = ControlEvaluation::new("Access control", "SAMPLE-AC")
        .with_remediation_guide("https://example.com/remediation/sample-ac");
    access
        .add_assessment(
            "SAMPLE-AC-01",
            "temporary setting is applied and reverted",
            ["sample"],
            vec![Step::new(
                "toggle_setting",
                |host: &ScratchHost, changes| {
                    let apply_host = host.clone();
                    let revert_host = host.clone();
                    let change = changes.record(
                        "toggle_setting",
                        Change::new(
                            "scratch",
                            "set sample=on",
                            move || {
                                if let Ok(mut map) = apply_host.lock() {
                                    map.insert("sample".to_string(), "on".to_string());
                                }
                                Ok(())
                            },
                            move || {
                                if let Ok(mut map) = revert_host.lock() {
                                    map.remove("sample");
                                }
                                Ok(())
                            },
                        )
                        .with_target_object(host),
                    );
                    match change.apply() {
                        Ok(()) => (Outcome::Passed, "sample setting applied".to_string()),
                        Err(err) => (Outcome::Unknown, err.to_string()),
                    }
                },
            )],
        )
        .context("build sample assessment")?;
    access
        .add_assessment(
            "SAMPLE-AC-02",
            "only applies on-prem",
            ["on-prem"],
            vec![Step::new("never_runs", |_: &ScratchHost, _| {
                (Outcome::Failed, String::new())
            })],
        )
        .context("build sample assessment")?;

    let mut review = ControlEvaluation::new("Manual review", "SAMPLE-MR");
    review
        .add_assessment(
            "SAMPLE-MR-01",
            "needs a human",
            ["sample"],
            vec![Step::new("ask", |_: &ScratchHost, _| {
                (Outcome::NeedsReview, "confirm with owner".to_string())
            })],
        )
        .context("build sample assessment")?;

    Ok(vec![access, review])
}

/// Run a sample evaluation, write the receipt, and validate it against the report schema.
fn conform() -> anyhow::Result<()> {
    let schema_value = serde_json::to_value(generate_report_schema())?;
    let compiled = jsonschema::draft202012::new(&schema_value)
        .map_err(|e| anyhow::anyhow!("Failed to compile schema: {e}"))?;
    println!("✓ assessor.report.v1 schema compiles");

    let host: ScratchHost = Arc::new(Mutex::new(BTreeMap::new()));
    let mut controls = sample_controls()?;
    let mut input = assessor_app::RunInput::new(&host, &mut controls);
    input.overrides = Overrides {
        applicability: Some(vec!["sample".to_string()]),
        handle_signals: Some(false),
        ..Overrides::default()
    };
    let output = assessor_app::run_evaluations(input).context("run sample evaluation")?;

    let temp_dir = tempfile::tempdir().context("Failed to create temp dir")?;
    let report_out = camino::Utf8PathBuf::from_path_buf(temp_dir.path().join("report.json"))
        .map_err(|p| anyhow::anyhow!("temp path is not UTF-8: {}", p.display()))?;
    assessor_app::write_report(&report_out, &output.report)?;

    let report_value: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(&report_out).with_context(|| format!("Failed to read {report_out}"))?,
    )?;

    let mut errors: Vec<String> = compiled
        .iter_errors(&report_value)
        .map(|err| format!("schema validation: {err}"))
        .collect();

    if report_value["outcome"] != "Needs Review" {
        errors.push(format!("unexpected outcome {}", report_value["outcome"]));
    }
    let leftover = host.lock().map(|map| map.len()).unwrap_or(usize::MAX);
    if leftover != 0 {
        errors.push("sample change was not reverted".to_string());
    }

    if !errors.is_empty() {
        eprintln!("\nConformance errors:");
        for err in &errors {
            eprintln!("  - {err}");
        }
        bail!("Conformance validation failed with {} errors", errors.len());
    }

    println!("✓ sample receipt validates against assessor.report.v1");
    println!("\n✓ Conformance checks passed!");
    Ok(())
}

fn print_help() {
    eprintln!("xtask commands:");
    eprintln!("  help              Show this message");
    eprintln!("  emit-schemas      Generate JSON schemas from Rust types to schemas/");
    eprintln!("  validate-schemas  Check if schemas/ matches generated output (for CI)");
    eprintln!("  print-schema-ids  Print known schema IDs");
    eprintln!("  conform           Validate a sample receipt against the report schema");
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "emit-schemas" => emit_schemas(),
        "validate-schemas" => validate_schemas(),
        "conform" => conform(),
        "print-schema-ids" => {
            for spec in schema_specs() {
                println!("{}", spec.filename.trim_end_matches(".json"));
            }
            Ok(())
        }
        other => bail!("unknown xtask command: {other}\n\nRun `cargo xtask help` for usage."),
    }
    .context("xtask failed")
}
