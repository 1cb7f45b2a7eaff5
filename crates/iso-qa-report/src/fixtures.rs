//! Shared run summaries for report tests

use iso_qa_gen::{plan_for, Schema};
use iso_qa_runner::{MockReply, MockTransport, Orchestrator, RunConfig, RunSummary, SimulatedTransport};

pub const SCHEMA: &str = r#"{
    "2": {
        "name": "Primary Account Number", "format": "lllvar", "type": "numeric",
        "validExample": "16,4111111111111111", "validExampleRaw": "4111111111111111",
        "invalid_length_exceed_max_value": "41111111111111119999",
        "invalid_length_exceed_max_description": "Exceeds maximum length of 19 characters",
        "validationRules": {"maxLength": 19, "allowedChars": "0-9"}
    },
    "3": {
        "name": "Processing Code", "format": "fixed", "type": "numeric",
        "validExample": "000000",
        "invalid_type_value": "ABCDEF",
        "invalid_type_description": "Letters in a <numeric> field",
        "validationRules": {"exactLength": 6}
    },
    "41": {
        "name": "Terminal ID", "format": "fixed", "type": "ans", "SampleData": "TERM0001"
    },
    "52": {
        "name": "PIN Data", "format": "fixed", "type": "b",
        "invalid_length_short_value": "00"
    }
}"#;

fn quiet() -> RunConfig {
    RunConfig {
        progress: false,
        ..Default::default()
    }
}

pub fn schema() -> Schema {
    Schema::from_json_str(SCHEMA).expect("parse fixture schema")
}

/// Every leg passes
pub fn passing_summary() -> RunSummary {
    let schema = schema();
    let plan = plan_for(&schema);
    let transport = SimulatedTransport::new(schema.clone());
    Orchestrator::new(&schema, &transport).with_config(quiet()).run(&plan)
}

/// An echoing SUT: every reject leg fails, every recovery passes
pub fn echoing_summary() -> RunSummary {
    let schema = schema();
    let plan = plan_for(&schema);
    let transport = MockTransport::with_fallback(MockReply::Echo);
    Orchestrator::new(&schema, &transport).with_config(quiet()).run(&plan)
}
