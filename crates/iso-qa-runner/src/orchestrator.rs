//! Run orchestrator
//!
//! Drives a test plan against a transport: the all-valid baseline first, then
//! for every case a mutate/reject leg followed by a restore/accept leg. Each
//! leg is scored by the response oracle and recorded as evidence.
//!
//! The case loop always works from the in-memory baseline map, so a baseline
//! that the SUT failed (or never received) does not stop the field loop.

use crate::encoder::{FieldListEncoder, MessageEncoder};
use crate::evidence::{Evidence, EvidenceCollector, HostInfo};
use crate::transport::{SutTransport, TransportFailure};
use chrono::{DateTime, Utc};
use iso_qa_gen::{
    ConfigError, Expectation, FieldValueMap, Leg, OracleOutcome, ResponseOracle, Schema,
    StructuralValidator, TestCase, TestPlan, Verdict, Violation,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Run configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Print the plan without contacting the SUT
    pub dry_run: bool,
    /// Structurally check the baseline before the first submission
    pub preflight: bool,
    /// Print per-case progress lines to stdout
    pub progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            preflight: false,
            progress: true,
        }
    }
}

/// Both legs of one test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    /// The case
    pub case: TestCase,
    /// Expect-reject leg
    pub reject: Evidence,
    /// Expect-accept leg after restoring the field
    pub recovery: Evidence,
}

impl CaseRecord {
    /// Number of passing legs
    #[must_use]
    pub fn passed_legs(&self) -> usize {
        usize::from(self.reject.outcome.is_pass()) + usize::from(self.recovery.outcome.is_pass())
    }
}

/// Per-field results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldReport {
    /// Field id
    pub field_id: String,
    /// Display name
    pub field_name: String,
    /// Executed cases in category order
    pub cases: Vec<CaseRecord>,
    /// Scored submissions for this field
    pub total_tests: usize,
    /// Passing submissions for this field
    pub passed_tests: usize,
    /// Why the field's categories were not run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

impl FieldReport {
    /// Whether any case ran
    #[must_use]
    pub fn has_tests(&self) -> bool {
        self.total_tests > 0
    }

    /// Pass rate as percentage
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        percentage(self.passed_tests, self.total_tests)
    }
}

/// Aggregated results of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// SHA-256 of the schema
    pub schema_fingerprint: String,
    /// Transport the run used
    pub transport: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Host information
    pub host: HostInfo,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Baseline result (not counted in the totals)
    pub baseline: Option<Evidence>,
    /// Per-field results in schema order
    pub fields: Vec<FieldReport>,
    /// Scored submissions
    pub total_tests: usize,
    /// Passing submissions
    pub passed_tests: usize,
    /// Schema and baseline problems
    pub config_errors: Vec<ConfigError>,
    /// Preflight findings on the baseline
    #[serde(default)]
    pub preflight: Vec<Violation>,
}

impl RunSummary {
    /// Pass rate as percentage (0 when nothing ran)
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        percentage(self.passed_tests, self.total_tests)
    }

    /// Failing submissions
    #[must_use]
    pub fn failed_tests(&self) -> usize {
        self.total_tests - self.passed_tests
    }

    /// Whether the baseline and every scored submission passed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.baseline.as_ref().map_or(true, |b| b.outcome.is_pass()) && self.failed_tests() == 0
    }

    /// All evidence in execution order
    #[must_use]
    pub fn evidence(&self) -> EvidenceCollector {
        let mut collector = EvidenceCollector::new();
        if let Some(baseline) = &self.baseline {
            collector.add(baseline.clone());
        }
        for record in self.fields.iter().flat_map(|f| f.cases.iter()) {
            collector.add(record.reject.clone());
            collector.add(record.recovery.clone());
        }
        collector
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed as f64 / total as f64) * 100.0
}

/// Executes test plans against a SUT
pub struct Orchestrator<'a> {
    schema: &'a Schema,
    transport: &'a dyn SutTransport,
    encoder: Box<dyn MessageEncoder>,
    config: RunConfig,
}

impl std::fmt::Debug for Orchestrator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("transport", &self.transport.name())
            .field("encoder", &self.encoder.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator with the default encoder and config
    #[must_use]
    pub fn new(schema: &'a Schema, transport: &'a dyn SutTransport) -> Self {
        Self {
            schema,
            transport,
            encoder: Box::new(FieldListEncoder::new()),
            config: RunConfig::default(),
        }
    }

    /// Use a custom config
    #[must_use]
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom encoder
    #[must_use]
    pub fn with_encoder(mut self, encoder: Box<dyn MessageEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Execute a plan
    #[must_use]
    pub fn run(&self, plan: &TestPlan) -> RunSummary {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut summary = RunSummary {
            schema_fingerprint: plan.schema_fingerprint.clone(),
            transport: self.transport.name().to_string(),
            started_at,
            duration_ms: 0,
            host: HostInfo::default(),
            dry_run: self.config.dry_run,
            baseline: None,
            fields: Vec::with_capacity(plan.fields.len()),
            total_tests: 0,
            passed_tests: 0,
            config_errors: plan.config_errors.clone(),
            preflight: Vec::new(),
        };

        for error in &plan.config_errors {
            tracing::warn!(target: "iso_qa::run", field_id = %error.field_id, "{}", error.message);
        }

        if self.config.dry_run {
            self.print_dry_run(plan);
            summary.fields = plan
                .fields
                .iter()
                .map(|f| FieldReport {
                    field_id: f.field_id.clone(),
                    field_name: f.field_name.clone(),
                    cases: Vec::new(),
                    total_tests: 0,
                    passed_tests: 0,
                    skipped_reason: f.skipped_reason.clone(),
                })
                .collect();
            return summary;
        }

        if self.config.preflight {
            summary.preflight = StructuralValidator::new(self.schema).check(&plan.baseline);
            for violation in &summary.preflight {
                tracing::warn!(target: "iso_qa::preflight", field_id = %violation.field_id, rule = %violation.rule, "{}", violation.message);
                self.progress(format_args!("[PREFLIGHT] {violation}"));
            }
        }

        let oracle = ResponseOracle::new(self.schema);

        self.progress(format_args!("Running test with all valid data..."));
        let baseline = self.submit(&oracle, &plan.baseline, Leg::Baseline, Evidence::baseline);
        self.progress(format_args!(
            "All valid data test result: {}",
            if baseline.outcome.is_pass() { "SUCCESS" } else { "FAILURE" }
        ));
        if baseline.outcome.is_fail() {
            tracing::warn!(target: "iso_qa::run", diagnostic = %baseline.diagnostic, "baseline submission failed");
        }
        summary.baseline = Some(baseline);

        for field_plan in &plan.fields {
            self.progress(format_args!(
                "\nTesting field {}: {}",
                field_plan.field_id, field_plan.field_name
            ));
            let mut report = FieldReport {
                field_id: field_plan.field_id.clone(),
                field_name: field_plan.field_name.clone(),
                cases: Vec::with_capacity(field_plan.cases.len()),
                total_tests: 0,
                passed_tests: 0,
                skipped_reason: field_plan.skipped_reason.clone(),
            };
            if let Some(reason) = &field_plan.skipped_reason {
                self.progress(format_args!("  Skipped: {reason}"));
            }

            for case in &field_plan.cases {
                let record = self.run_case(&oracle, &plan.baseline, case);
                report.total_tests += 2;
                report.passed_tests += record.passed_legs();
                report.cases.push(record);
            }

            summary.total_tests += report.total_tests;
            summary.passed_tests += report.passed_tests;
            summary.fields.push(report);
        }

        summary.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            target: "iso_qa::run",
            total = summary.total_tests,
            passed = summary.passed_tests,
            duration_ms = summary.duration_ms,
            "run complete"
        );
        summary
    }

    fn run_case(&self, oracle: &ResponseOracle<'_>, baseline: &FieldValueMap, case: &TestCase) -> CaseRecord {
        self.progress(format_args!("  Testing {}: {}", case.category, case.description));

        let mutated = case.mutate(baseline);
        let reject = self.submit(oracle, &mutated, Leg::Reject, |verdict, ms| {
            Evidence::for_case(case, Leg::Reject, verdict, ms)
        });
        self.progress(format_args!(
            "  Result: {}",
            if reject.outcome.is_pass() {
                "PASSED (validation correctly failed)"
            } else {
                "FAILED (validation incorrectly passed)"
            }
        ));

        let restored = case.restore(&mutated);
        let recovery = self.submit(oracle, &restored, Leg::Recovery, |verdict, ms| {
            Evidence::for_case(case, Leg::Recovery, verdict, ms)
        });
        self.progress(format_args!("  Recovery test: {}", recovery.outcome.label()));

        CaseRecord {
            case: case.clone(),
            reject,
            recovery,
        }
    }

    /// Encode, send and score one submission
    fn submit(
        &self,
        oracle: &ResponseOracle<'_>,
        values: &FieldValueMap,
        leg: Leg,
        record: impl FnOnce(Verdict, u64) -> Evidence,
    ) -> Evidence {
        let expectation = leg.expectation();
        let payload = self.encoder.encode(values);
        let start = Instant::now();
        let sent = self.transport.send(&payload);
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (verdict, failure) = match sent {
            Ok(response) => (oracle.judge(expectation, &response, values), None),
            Err(failure) => (failure_verdict(expectation, &failure), Some(failure)),
        };

        let mut evidence = record(verdict, duration_ms);
        tracing::info!(
            target: "iso_qa::run",
            id = %evidence.id,
            leg = %leg,
            expected = %expectation,
            passed = evidence.outcome.is_pass(),
            duration_ms,
            "{}",
            evidence.diagnostic
        );
        if let Some(failure) = failure {
            tracing::warn!(target: "iso_qa::transport", id = %evidence.id, "{failure}");
            evidence = evidence.with_transport_failure(failure);
        }
        evidence
    }

    fn print_dry_run(&self, plan: &TestPlan) {
        println!("[DRY RUN] baseline: {} field(s)", plan.baseline.len());
        for case in plan.cases() {
            println!(
                "[DRY RUN] {}: reject `{}`, then restore `{}`",
                case.id, case.invalid_value, case.restore_value
            );
        }
        println!("[DRY RUN] {} scored submission(s)", plan.total_tests());
    }

    fn progress(&self, line: std::fmt::Arguments<'_>) {
        if self.config.progress {
            println!("{line}");
        }
    }
}

/// A transport failure is a rejection: expect-reject passes, expect-accept fails
fn failure_verdict(expectation: Expectation, failure: &TransportFailure) -> Verdict {
    let outcome = OracleOutcome::Rejected {
        reason: format!("transport failure: {failure}"),
    };
    Verdict {
        passed: expectation.is_satisfied_by(&outcome),
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockReply, MockTransport, SimulatedTransport};
    use iso_qa_gen::plan_for;

    const SCHEMA: &str = r#"{
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
            "invalid_length_short_value": "00000",
            "validationRules": {"exactLength": 6}
        },
        "41": {
            "name": "Terminal ID", "format": "fixed", "type": "ans", "SampleData": "TERM0001"
        }
    }"#;

    const REJECT: &str = r#"{"error":"ISOParserException: rejected"}"#;

    fn quiet() -> RunConfig {
        RunConfig {
            progress: false,
            ..Default::default()
        }
    }

    fn setup() -> (Schema, TestPlan) {
        let schema = Schema::from_json_str(SCHEMA).expect("parse");
        let plan = plan_for(&schema);
        (schema, plan)
    }

    #[test]
    fn test_simulated_sut_passes_everything() {
        let (schema, plan) = setup();
        let transport = SimulatedTransport::new(schema.clone());
        let summary = Orchestrator::new(&schema, &transport).with_config(quiet()).run(&plan);
        assert_eq!(summary.total_tests, 6);
        assert_eq!(summary.passed_tests, 6);
        assert!(summary.is_success());
        assert!((summary.pass_rate() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_submission_order_and_payloads() {
        let (schema, plan) = setup();
        let mock = MockTransport::new();
        let _ = Orchestrator::new(&schema, &mock).with_config(quiet()).run(&plan);
        let sent = mock.sent();
        assert_eq!(sent.len(), 1 + 6);
        assert_eq!(
            sent[0].message,
            "ISO8583_MSG:2=4111111111111111;3=000000;41=TERM0001;"
        );
        assert_eq!(
            sent[1].message,
            "ISO8583_MSG:2=41111111111111119999;3=000000;41=TERM0001;"
        );
        assert_eq!(sent[2].message, sent[0].message);
    }

    #[test]
    fn test_rejecting_sut_passes_every_leg() {
        let (schema, plan) = setup();
        // baseline accepted, then reject / accept pairs
        let mock = MockTransport::new()
            .then(MockReply::Echo)
            .then_body(REJECT)
            .then(MockReply::Echo)
            .then_body(REJECT)
            .then(MockReply::Echo)
            .then_body(REJECT)
            .then(MockReply::Echo);
        let summary = Orchestrator::new(&schema, &mock).with_config(quiet()).run(&plan);
        assert_eq!(summary.passed_tests, 6);
        let field2 = &summary.fields[0];
        assert!(field2.cases[0].reject.outcome.is_pass());
    }

    #[test]
    fn test_echoing_sut_fails_reject_legs() {
        let (schema, plan) = setup();
        let mock = MockTransport::new();
        let summary = Orchestrator::new(&schema, &mock).with_config(quiet()).run(&plan);
        assert_eq!(summary.total_tests, 6);
        assert_eq!(summary.passed_tests, 3);
        let record = &summary.fields[0].cases[0];
        assert!(record.reject.outcome.is_fail());
        assert!(record.reject.diagnostic.contains("validation incorrectly passed"));
        assert!(record.recovery.outcome.is_pass());
        assert!(!summary.is_success());
    }

    #[test]
    fn test_field_without_categories_has_no_tests() {
        let (schema, plan) = setup();
        let transport = SimulatedTransport::new(schema.clone());
        let summary = Orchestrator::new(&schema, &transport).with_config(quiet()).run(&plan);
        let terminal = summary.fields.iter().find(|f| f.field_id == "41").expect("field 41");
        assert!(!terminal.has_tests());
        assert!(terminal.cases.is_empty());
    }

    #[test]
    fn test_baseline_connection_error_does_not_stop_run() {
        let (schema, plan) = setup();
        let mock = MockTransport::new().then_failure(TransportFailure::Connect {
            message: "connection refused".to_string(),
        });
        let summary = Orchestrator::new(&schema, &mock).with_config(quiet()).run(&plan);
        let baseline = summary.baseline.as_ref().expect("baseline");
        assert!(baseline.outcome.is_fail());
        assert!(baseline.transport_failure.is_some());
        assert_eq!(summary.total_tests, 6);
        assert_eq!(mock.sent().len(), 7);
    }

    #[test]
    fn test_transport_failure_counts_as_rejection() {
        let (schema, plan) = setup();
        let mock = MockTransport::with_fallback(MockReply::Failure(TransportFailure::Timeout {
            timeout_ms: 10,
        }));
        let summary = Orchestrator::new(&schema, &mock).with_config(quiet()).run(&plan);
        for record in summary.fields.iter().flat_map(|f| f.cases.iter()) {
            assert!(record.reject.outcome.is_pass());
            assert!(record.recovery.outcome.is_fail());
            assert!(record.reject.observed.is_rejected());
        }
        assert_eq!(summary.passed_tests, 3);
    }

    #[test]
    fn test_dry_run_sends_nothing() {
        let (schema, plan) = setup();
        let mock = MockTransport::new();
        let config = RunConfig {
            dry_run: true,
            ..quiet()
        };
        let summary = Orchestrator::new(&schema, &mock).with_config(config).run(&plan);
        assert!(mock.sent().is_empty());
        assert!(summary.dry_run);
        assert!(summary.baseline.is_none());
        assert_eq!(summary.total_tests, 0);
        assert_eq!(summary.fields.len(), 3);
    }

    #[test]
    fn test_preflight_records_but_does_not_change_verdicts() {
        let schema = Schema::from_json_str(
            r#"{"3": {"name": "Processing Code", "format": "fixed", "type": "numeric",
                      "validExample": "00000", "invalid_type_value": "ABCDE",
                      "validationRules": {"exactLength": 6}}}"#,
        )
        .expect("parse");
        let plan = plan_for(&schema);
        let mock = MockTransport::new().then(MockReply::Echo).then_body(REJECT);
        let config = RunConfig {
            preflight: true,
            ..quiet()
        };
        let summary = Orchestrator::new(&schema, &mock).with_config(config).run(&plan);
        assert_eq!(summary.preflight.len(), 1);
        assert_eq!(summary.passed_tests, 2);
    }

    #[test]
    fn test_evidence_flattening() {
        let (schema, plan) = setup();
        let transport = SimulatedTransport::new(schema.clone());
        let summary = Orchestrator::new(&schema, &transport).with_config(quiet()).run(&plan);
        let evidence = summary.evidence();
        assert_eq!(evidence.total(), 7);
        assert_eq!(evidence.all()[0].id, "baseline");
        assert_eq!(evidence.all()[1].id, "2/invalid_length_exceed_max/reject");
    }

    #[test]
    fn test_summary_serialization() {
        let (schema, plan) = setup();
        let transport = SimulatedTransport::new(schema.clone());
        let summary = Orchestrator::new(&schema, &transport).with_config(quiet()).run(&plan);
        let json = serde_json::to_string(&summary).expect("serialize");
        let parsed: RunSummary = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.total_tests, summary.total_tests);
        assert_eq!(parsed.schema_fingerprint, schema.fingerprint());
    }

    #[test]
    fn test_pass_rate_zero_when_empty() {
        assert!(percentage(0, 0).abs() < f64::EPSILON);
        assert!((percentage(1, 4) - 25.0).abs() < f64::EPSILON);
    }
}
