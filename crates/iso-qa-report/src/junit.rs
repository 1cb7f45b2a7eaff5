//! JUnit XML Report Generator
//!
//! Generates JUnit-compatible XML for CI. Every scored submission, baseline
//! included, becomes one `<testcase>`; failed legs caused by a transport
//! failure are reported as errors rather than assertion failures.

use iso_qa_runner::{Evidence, RunSummary};
use std::io::Write;

use crate::error::Result;

/// JUnit XML report generator
#[derive(Debug)]
pub struct JunitReport {
    /// Test suite name
    suite_name: String,
    /// Prefix for per-field class names
    class_prefix: String,
}

impl JunitReport {
    /// Create a new JUnit report generator
    #[must_use]
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            class_prefix: "iso8583".to_string(),
        }
    }

    /// Set the class name prefix for test cases
    #[must_use]
    pub fn with_class_prefix(mut self, class_prefix: impl Into<String>) -> Self {
        self.class_prefix = class_prefix.into();
        self
    }

    /// Generate JUnit XML for a run
    ///
    /// # Errors
    ///
    /// Returns an error if XML generation fails.
    pub fn generate(&self, summary: &RunSummary) -> Result<String> {
        let mut output = Vec::new();
        self.write_xml(&mut output, summary)?;
        Ok(String::from_utf8_lossy(&output).to_string())
    }

    /// Write JUnit XML to a writer
    fn write_xml<W: Write>(&self, writer: &mut W, summary: &RunSummary) -> Result<()> {
        let evidence = summary.evidence();
        let all_evidence = evidence.all();
        let tests = all_evidence.len();
        let errors = all_evidence.iter().filter(|e| is_error(e)).count();
        let failures = evidence.fail_count().saturating_sub(errors);
        let time: f64 = all_evidence
            .iter()
            .map(|e| e.duration_ms as f64 / 1000.0)
            .sum();

        writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            writer,
            r#"<testsuite name="{}" tests="{}" failures="{}" errors="{}" skipped="0" time="{:.3}" timestamp="{}" hostname="{}">"#,
            Self::escape_xml(&self.suite_name),
            tests,
            failures,
            errors,
            time,
            summary.started_at.format("%Y-%m-%dT%H:%M:%S"),
            Self::escape_xml(&summary.host.hostname)
        )?;

        writeln!(writer, "  <properties>")?;
        self.write_property(writer, "schema.fingerprint", &summary.schema_fingerprint)?;
        self.write_property(writer, "transport", &summary.transport)?;
        self.write_property(writer, "tests.total", &summary.total_tests.to_string())?;
        self.write_property(writer, "tests.passed", &summary.passed_tests.to_string())?;
        self.write_property(writer, "pass_rate", &format!("{:.1}", summary.pass_rate()))?;
        for (i, error) in summary.config_errors.iter().enumerate() {
            self.write_property(writer, &format!("config_error.{i}"), &error.to_string())?;
        }
        writeln!(writer, "  </properties>")?;

        for e in all_evidence {
            self.write_testcase(writer, e)?;
        }

        writeln!(writer, "</testsuite>")?;
        Ok(())
    }

    fn write_property<W: Write>(&self, writer: &mut W, name: &str, value: &str) -> Result<()> {
        writeln!(
            writer,
            r#"    <property name="{}" value="{}"/>"#,
            Self::escape_xml(name),
            Self::escape_xml(value)
        )?;
        Ok(())
    }

    /// Write a single test case
    fn write_testcase<W: Write>(&self, writer: &mut W, evidence: &Evidence) -> Result<()> {
        let class_name = match &evidence.field_id {
            Some(field_id) => format!("{}.field{}", self.class_prefix, field_id),
            None => format!("{}.baseline", self.class_prefix),
        };
        let time = evidence.duration_ms as f64 / 1000.0;

        writeln!(
            writer,
            r#"  <testcase classname="{}" name="{}" time="{:.3}">"#,
            Self::escape_xml(&class_name),
            Self::escape_xml(&evidence.id),
            time
        )?;

        if evidence.outcome.is_fail() {
            match &evidence.transport_failure {
                Some(failure) => {
                    writeln!(
                        writer,
                        r#"    <error message="{}" type="TransportError"/>"#,
                        Self::escape_xml(&failure.to_string())
                    )?;
                }
                None => {
                    writeln!(
                        writer,
                        r#"    <failure message="{}" type="AssertionError">"#,
                        Self::escape_xml(&evidence.diagnostic)
                    )?;
                    writeln!(writer, "Expected: {}", evidence.expected)?;
                    if let Some(description) = &evidence.description {
                        writeln!(writer, "Case: {}", Self::escape_xml(description))?;
                    }
                    writeln!(writer, "    </failure>")?;
                }
            }
        }

        writeln!(writer, "  </testcase>")?;
        Ok(())
    }

    /// Escape XML special characters
    fn escape_xml(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;")
    }
}

fn is_error(evidence: &Evidence) -> bool {
    evidence.outcome.is_fail() && evidence.transport_failure.is_some()
}

impl Default for JunitReport {
    fn default() -> Self {
        Self::new("iso-qa")
    }
}
