//! Plain-text summary
//!
//! The layout operators already read from the parser test harness: a title,
//! the valid-data result, one block per field and an overall footer.

use iso_qa_runner::{FieldReport, RunSummary};

/// Title line of the text report
pub const TITLE: &str = "ISO8583 Parser Test Results";

/// Render the text summary
#[must_use]
pub fn generate_text_report(summary: &RunSummary) -> String {
    let mut out = String::with_capacity(4096);

    out.push_str(TITLE);
    out.push('\n');
    out.push_str("==========================\n");
    out.push_str(&format!("Schema: {}\n\n", summary.schema_fingerprint));

    let baseline = match &summary.baseline {
        Some(evidence) => evidence.outcome.label(),
        None => "NOT RUN",
    };
    out.push_str(&format!("Valid Data Test: {baseline}\n\n"));

    for field in &summary.fields {
        push_field(&mut out, field);
    }

    if !summary.config_errors.is_empty() {
        out.push_str("Configuration Errors\n");
        out.push_str("--------------------\n");
        for error in &summary.config_errors {
            out.push_str(&format!("  - {error}\n"));
        }
        out.push('\n');
    }

    if !summary.preflight.is_empty() {
        out.push_str("Preflight Warnings\n");
        out.push_str("------------------\n");
        for violation in &summary.preflight {
            out.push_str(&format!("  - {violation}\n"));
        }
        out.push('\n');
    }

    out.push_str("\nOverall Summary\n");
    out.push_str("--------------\n");
    out.push_str(&format!("Total Tests: {}\n", summary.total_tests));
    out.push_str(&format!("Passed Tests: {}\n", summary.passed_tests));
    out.push_str(&format!("Pass Rate: {:.1}%\n", summary.pass_rate()));
    out
}

fn push_field(out: &mut String, field: &FieldReport) {
    out.push_str(&format!("Field {}: {}\n", field.field_id, field.field_name));

    for record in &field.cases {
        out.push_str(&format!(
            "  - {}: {} ({})\n",
            record.case.category,
            record.reject.outcome.label(),
            record.case.description
        ));
        out.push_str(&format!("    Recovery: {}\n", record.recovery.outcome.label()));
    }

    if field.has_tests() {
        out.push_str(&format!(
            "  Summary: {}/{} tests passed ({:.1}%)\n\n",
            field.passed_tests,
            field.total_tests,
            field.pass_rate()
        ));
    } else if let Some(reason) = &field.skipped_reason {
        out.push_str(&format!("  Skipped: {reason}\n\n"));
    } else {
        out.push_str("  No tests available for this field\n\n");
    }
}
