//! Markdown export
//!
//! One `## ` section per concern and one `### ` section per field, with the
//! per-category results in a table so the report chunks cleanly when indexed.

use iso_qa_runner::{Evidence, FieldReport, RunSummary};

/// Generate the Markdown report for a run
#[must_use]
pub fn generate_markdown(summary: &RunSummary) -> String {
    let mut md = String::with_capacity(8192);

    md.push_str("# ISO 8583 Conformance Run\n\n");

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- **Schema**: `{}`\n", summary.schema_fingerprint));
    md.push_str(&format!("- **Transport**: {}\n", summary.transport));
    md.push_str(&format!(
        "- **Started**: {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!("- **Duration**: {} ms\n", summary.duration_ms));
    md.push_str(&format!(
        "- **Host**: {} ({}, iso-qa {})\n",
        summary.host.hostname, summary.host.os, summary.host.tool_version
    ));
    md.push_str(&format!("- **Status**: {}\n", run_status(summary)));
    md.push_str(&format!(
        "- **Tests**: {} passed / {} failed / {} total\n",
        summary.passed_tests,
        summary.failed_tests(),
        summary.total_tests
    ));
    md.push_str(&format!("- **Pass Rate**: {:.1}%\n\n", summary.pass_rate()));

    md.push_str("## Valid Data Test\n\n");
    match &summary.baseline {
        Some(evidence) => {
            md.push_str(&format!(
                "{} {}: {}\n\n",
                status_icon(evidence),
                evidence.outcome.label(),
                escape_cell(&evidence.diagnostic)
            ));
        }
        None => md.push_str("Not run.\n\n"),
    }

    md.push_str("## Field Results\n\n");
    for field in &summary.fields {
        push_field(&mut md, field);
    }

    let evidence = summary.evidence();
    let failures = evidence.failures();
    if !failures.is_empty() {
        md.push_str("## Failures\n\n");
        for evidence in failures {
            md.push_str(&format!("### {}\n\n", evidence.id));
            md.push_str(&format!("- **Expected**: {}\n", evidence.expected));
            md.push_str(&format!("- **Observed**: {}\n", evidence.diagnostic));
            if let Some(failure) = &evidence.transport_failure {
                md.push_str(&format!("- **Transport**: {failure}\n"));
            }
            md.push('\n');
        }
    }

    if !summary.config_errors.is_empty() {
        md.push_str("## Configuration Errors\n\n");
        for error in &summary.config_errors {
            md.push_str(&format!("- **Field {}**: {}\n", error.field_id, error.message));
        }
        md.push('\n');
    }

    if !summary.preflight.is_empty() {
        md.push_str("## Preflight Warnings\n\n");
        for violation in &summary.preflight {
            md.push_str(&format!(
                "- **Field {}** `{}`: {}\n",
                violation.field_id, violation.rule, violation.message
            ));
        }
        md.push('\n');
    }

    md
}

fn push_field(md: &mut String, field: &FieldReport) {
    md.push_str(&format!("### Field {}: {}\n\n", field.field_id, field.field_name));

    if !field.has_tests() {
        match &field.skipped_reason {
            Some(reason) => md.push_str(&format!("No tests available ({reason}).\n\n")),
            None => md.push_str("No tests available for this field.\n\n"),
        }
        return;
    }

    md.push_str("| Category | Reject | Recovery | Description |\n");
    md.push_str("|----------|--------|----------|-------------|\n");
    for record in &field.cases {
        md.push_str(&format!(
            "| {} | {} {} | {} {} | {} |\n",
            record.case.category,
            status_icon(&record.reject),
            record.reject.outcome.label(),
            status_icon(&record.recovery),
            record.recovery.outcome.label(),
            escape_cell(&record.case.description)
        ));
    }
    md.push_str(&format!(
        "\n{}/{} tests passed ({:.1}%)\n\n",
        field.passed_tests,
        field.total_tests,
        field.pass_rate()
    ));
}

fn status_icon(evidence: &Evidence) -> &'static str {
    if evidence.outcome.is_pass() {
        "✓"
    } else {
        "✗"
    }
}

fn run_status(summary: &RunSummary) -> &'static str {
    if summary.dry_run {
        "DRY RUN"
    } else if summary.is_success() {
        "PASSED"
    } else {
        "FAILED"
    }
}

/// Keep table rows intact when text contains pipes or newlines
fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
