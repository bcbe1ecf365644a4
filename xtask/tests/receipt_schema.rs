//! Receipts produced by the app layer must validate against the generated report schema.

use assessor_domain::{ControlEvaluation, Outcome, Step};
use assessor_settings::Overrides;

fn compiled_report_schema() -> jsonschema::Validator {
    let schema = schemars::schema_for!(assessor_types::EvaluationReport);
    let value = serde_json::to_value(schema).expect("schema to json");
    jsonschema::draft202012::new(&value).expect("compile schema")
}

#[test]
fn failed_receipt_validates() {
    let validator = compiled_report_schema();

    let mut control = ControlEvaluation::new("Crypto", "CR-1");
    control
        .add_assessment(
            "CR-1.1",
            "tls everywhere",
            ["cloud"],
            vec![
                Step::new("tls_check", |_: &(), _| (Outcome::Failed, "plain http".to_string())),
                Step::new("skipped", |_: &(), _| (Outcome::Passed, String::new())),
            ],
        )
        .expect("valid assessment");
    let mut controls = vec![control];

    let mut input = assessor_app::RunInput::new(&(), &mut controls);
    input.overrides = Overrides {
        applicability: Some(vec!["cloud".to_string()]),
        handle_signals: Some(false),
        ..Overrides::default()
    };
    let output = assessor_app::run_evaluations(input).expect("run");
    let value = serde_json::to_value(&output.report).expect("report to json");
    let errors: Vec<String> = validator.iter_errors(&value).map(|e| e.to_string()).collect();
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(output.report.outcome, Outcome::Failed);
    assert_eq!(output.report.data.steps_executed, 1);
}

#[test]
fn config_schema_accepts_documented_keys() {
    let schema = schemars::schema_for!(assessor_settings::AssessorConfigV1);
    let value = serde_json::to_value(schema).expect("schema to json");
    let validator = jsonschema::draft202012::new(&value).expect("compile schema");

    let config = serde_json::json!({
        "schema": "assessor.config.v1",
        "mode": "tolerant",
        "applicability": ["cloud"],
        "handle_signals": false,
        "log_filter": "debug"
    });
    assert!(validator.is_valid(&config));
    assert!(!validator.is_valid(&serde_json::json!({ "profile": "strict" })));
}
