//! Evidence collection for test results
//!
//! Every scored submission produces evidence that is recorded regardless of
//! outcome.

use crate::transport::TransportFailure;
use chrono::{DateTime, Utc};
use iso_qa_gen::{Category, Expectation, Leg, OracleOutcome, TestCase, Verdict};
use serde::{Deserialize, Serialize};

/// Outcome of a scored submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The SUT behaved as expected
    Corroborated,
    /// The SUT did not behave as expected
    Falsified,
}

impl Outcome {
    /// Check if this is a passing outcome
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Corroborated)
    }

    /// Check if this is a failing outcome
    #[must_use]
    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Falsified)
    }

    /// Report label, `PASSED` or `FAILED`
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Corroborated => "PASSED",
            Self::Falsified => "FAILED",
        }
    }

    /// Outcome for a pass/fail flag
    #[must_use]
    pub const fn from_passed(passed: bool) -> Self {
        if passed {
            Self::Corroborated
        } else {
            Self::Falsified
        }
    }
}

/// Host information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfo {
    /// Hostname
    pub hostname: String,
    /// Operating system
    pub os: String,
    /// iso-qa version
    pub tool_version: String,
}

impl Default for HostInfo {
    fn default() -> Self {
        Self {
            hostname: hostname::get().map_or_else(
                |_| "unknown".to_string(),
                |h| h.to_string_lossy().to_string(),
            ),
            os: std::env::consts::OS.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Evidence from a single scored submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Evidence id, `<field>/<category>/<leg>` or `baseline`
    pub id: String,
    /// Field under test (none for the baseline)
    pub field_id: Option<String>,
    /// Category under test (none for the baseline)
    pub category: Option<Category>,
    /// Exemplar description (none for the baseline)
    pub description: Option<String>,
    /// Which submission this was
    pub leg: Leg,
    /// What the SUT should have done
    pub expected: Expectation,
    /// What the oracle saw
    pub observed: OracleOutcome,
    /// Pass/fail
    pub outcome: Outcome,
    /// Human-readable diagnostic
    pub diagnostic: String,
    /// Transport failure behind a rejection, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_failure: Option<TransportFailure>,
    /// Round trip in milliseconds
    pub duration_ms: u64,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Evidence {
    /// Evidence for the baseline submission
    #[must_use]
    pub fn baseline(verdict: Verdict, duration_ms: u64) -> Self {
        Self::build("baseline".to_string(), None, Leg::Baseline, verdict, duration_ms)
    }

    /// Evidence for one leg of a test case
    #[must_use]
    pub fn for_case(case: &TestCase, leg: Leg, verdict: Verdict, duration_ms: u64) -> Self {
        Self::build(format!("{}/{leg}", case.id), Some(case), leg, verdict, duration_ms)
    }

    fn build(
        id: String,
        case: Option<&TestCase>,
        leg: Leg,
        verdict: Verdict,
        duration_ms: u64,
    ) -> Self {
        let outcome = Outcome::from_passed(verdict.passed);
        let diagnostic = match (leg, outcome) {
            (Leg::Reject, Outcome::Falsified) => match &verdict.outcome {
                OracleOutcome::AcceptedInvalid { .. } => verdict.outcome.describe(),
                other => format!("validation incorrectly passed ({})", other.describe()),
            },
            _ => verdict.outcome.describe(),
        };
        Self {
            id,
            field_id: case.map(|c| c.field_id.clone()),
            category: case.map(|c| c.category),
            description: case.map(|c| c.description.clone()),
            leg,
            expected: leg.expectation(),
            observed: verdict.outcome,
            outcome,
            diagnostic,
            transport_failure: None,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    /// Attach the transport failure that produced this result
    #[must_use]
    pub fn with_transport_failure(mut self, failure: TransportFailure) -> Self {
        self.transport_failure = Some(failure);
        self
    }
}

/// Collector for evidence from multiple submissions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceCollector {
    evidence: Vec<Evidence>,
}

impl EvidenceCollector {
    /// Create a new collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add evidence
    pub fn add(&mut self, evidence: Evidence) {
        self.evidence.push(evidence);
    }

    /// Get all evidence
    #[must_use]
    pub fn all(&self) -> &[Evidence] {
        &self.evidence
    }

    /// Get fail count
    #[must_use]
    pub fn fail_count(&self) -> usize {
        self.evidence.iter().filter(|e| e.outcome.is_fail()).count()
    }

    /// Get total count
    #[must_use]
    pub fn total(&self) -> usize {
        self.evidence.len()
    }

    /// Get failed evidence
    #[must_use]
    pub fn failures(&self) -> Vec<&Evidence> {
        self.evidence
            .iter()
            .filter(|e| e.outcome.is_fail())
            .collect()
    }

    /// Export to JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.evidence)
    }
}
