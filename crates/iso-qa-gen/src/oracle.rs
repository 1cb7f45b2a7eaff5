//! Response oracle
//!
//! Decides what the SUT did with a submission. The oracle trusts the SUT's
//! own verdict: an explicit error marker or an unreadable reply is a
//! rejection, a list of parsed elements is an acceptance whose values are then
//! checked against what was submitted.
//!
//! # Design
//!
//! The oracle never fails. Every response shape, including garbage, maps to
//! an [`OracleOutcome`], and [`Expectation::is_satisfied_by`] turns that into
//! a pass/fail verdict for the leg being scored.

use crate::baseline::FieldValueMap;
use crate::plan::Expectation;
use crate::schema::{Category, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Substrings that mark a reply as an explicit parser rejection
pub const ERROR_MARKERS: [&str; 2] = ["ISOParserException", "Error"];

/// One parsed data element returned by the SUT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedElement {
    /// Field id
    pub data_element_id: String,
    /// Parsed value
    pub value: String,
}

impl ParsedElement {
    /// Create a parsed element
    #[must_use]
    pub fn new(data_element_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            data_element_id: data_element_id.into(),
            value: value.into(),
        }
    }
}

/// A structured SUT reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    /// Explicit error/exception indicator
    Error {
        /// Marker that was found
        marker: String,
        /// Raw reply
        body: String,
    },
    /// Sequence of parsed elements
    Elements {
        /// Parsed elements in reply order
        elements: Vec<ParsedElement>,
    },
    /// Anything else
    Malformed {
        /// Raw reply
        body: String,
    },
}

impl Response {
    /// Build an element response
    #[must_use]
    pub fn elements(elements: Vec<ParsedElement>) -> Self {
        Self::Elements { elements }
    }

    /// Classify a raw reply body
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        if let Some(marker) = ERROR_MARKERS.iter().find(|m| body.contains(**m)) {
            return Self::Error {
                marker: (*marker).to_string(),
                body: body.to_string(),
            };
        }

        let malformed = || Self::Malformed {
            body: body.to_string(),
        };
        let Ok(Value::Array(items)) = serde_json::from_str::<Value>(body) else {
            return malformed();
        };

        let mut elements = Vec::with_capacity(items.len());
        for item in &items {
            let id = item.get("dataElementId").and_then(scalar_text);
            let value = item.get("value").and_then(scalar_text);
            match (id, value) {
                (Some(id), Some(value)) => elements.push(ParsedElement::new(id, value)),
                _ => return malformed(),
            }
        }
        Self::Elements { elements }
    }

    /// One-line summary for reports
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Error { marker, body } => format!("error marker `{marker}`: {}", truncate(body, 120)),
            Self::Elements { elements } => format!("{} parsed element(s)", elements.len()),
            Self::Malformed { body } => format!("malformed reply: {}", truncate(body, 120)),
        }
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// What the oracle concluded about a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OracleOutcome {
    /// The SUT rejected the submission (or could not be reached)
    Rejected {
        /// Why the reply counts as a rejection
        reason: String,
    },
    /// The SUT accepted a field carrying a declared invalid exemplar
    AcceptedInvalid {
        /// Mutated field
        field_id: String,
        /// Category the exemplar belongs to
        category: Category,
        /// The exemplar
        value: String,
    },
    /// The SUT accepted but returned a wrong value
    AcceptedWrong {
        /// Field with the wrong value
        field_id: String,
        /// Acceptable values (empty if the field was never submitted)
        expected: Vec<String>,
        /// Value the SUT returned
        observed: String,
    },
    /// The SUT accepted and every scored value matched
    AcceptedCorrect,
}

impl OracleOutcome {
    /// Whether this is a rejection
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Whether this is a fully correct acceptance
    #[must_use]
    pub const fn is_accepted_correct(&self) -> bool {
        matches!(self, Self::AcceptedCorrect)
    }

    /// Diagnostic line
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Rejected { reason } => format!("rejected: {reason}"),
            Self::AcceptedInvalid {
                field_id,
                category,
                value,
            } => format!(
                "validation incorrectly passed: field {field_id} accepted {category} value `{value}`"
            ),
            Self::AcceptedWrong {
                field_id,
                expected,
                observed,
            } if expected.is_empty() => {
                format!("field {field_id} was not submitted but came back as `{observed}`")
            }
            Self::AcceptedWrong {
                field_id,
                expected,
                observed,
            } => format!(
                "field {field_id} value mismatch: expected {}, got `{observed}`",
                expected
                    .iter()
                    .map(|v| format!("`{v}`"))
                    .collect::<Vec<_>>()
                    .join(" or ")
            ),
            Self::AcceptedCorrect => "accepted with correct values".to_string(),
        }
    }
}

impl Expectation {
    /// Whether `outcome` satisfies this expectation
    #[must_use]
    pub const fn is_satisfied_by(&self, outcome: &OracleOutcome) -> bool {
        match self {
            Self::Reject => outcome.is_rejected(),
            Self::Accept => outcome.is_accepted_correct(),
        }
    }
}

/// Verdict for one scored submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the expectation was met
    pub passed: bool,
    /// What the oracle saw
    pub outcome: OracleOutcome,
}

/// Oracle over a schema
#[derive(Debug, Clone, Copy)]
pub struct ResponseOracle<'a> {
    schema: &'a Schema,
}

impl<'a> ResponseOracle<'a> {
    /// Create an oracle
    #[must_use]
    pub const fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Classify a reply against the submitted values
    #[must_use]
    pub fn evaluate(&self, response: &Response, submitted: &FieldValueMap) -> OracleOutcome {
        let elements = match response {
            Response::Error { marker, .. } => {
                return OracleOutcome::Rejected {
                    reason: format!("parser returned error marker `{marker}`"),
                };
            }
            Response::Malformed { .. } => {
                return OracleOutcome::Rejected {
                    reason: "unexpected response format".to_string(),
                };
            }
            Response::Elements { elements } => elements,
        };

        for element in elements {
            let Some(field) = self.schema.lookup(&element.data_element_id) else {
                continue;
            };

            let Some(submitted_value) = submitted.get(&field.id) else {
                return OracleOutcome::AcceptedWrong {
                    field_id: field.id.clone(),
                    expected: Vec::new(),
                    observed: element.value.clone(),
                };
            };

            if let Some(category) = field.invalid_category_of(submitted_value) {
                return OracleOutcome::AcceptedInvalid {
                    field_id: field.id.clone(),
                    category,
                    value: submitted_value.to_string(),
                };
            }

            let expected: Vec<&str> = match (
                field.format.is_variable(),
                field.valid_example_raw.as_deref(),
                field.valid_example.as_deref(),
            ) {
                (true, Some(raw), Some(formatted)) => vec![raw, formatted],
                _ => vec![submitted_value],
            };

            if !expected.contains(&element.value.as_str()) {
                tracing::debug!(
                    target: "iso_qa::oracle",
                    field_id = %field.id,
                    observed = %element.value,
                    "value mismatch"
                );
                return OracleOutcome::AcceptedWrong {
                    field_id: field.id.clone(),
                    expected: expected.into_iter().map(str::to_string).collect(),
                    observed: element.value.clone(),
                };
            }
        }

        OracleOutcome::AcceptedCorrect
    }

    /// Score a reply for a leg with the given expectation
    #[must_use]
    pub fn judge(
        &self,
        expectation: Expectation,
        response: &Response,
        submitted: &FieldValueMap,
    ) -> Verdict {
        let outcome = self.evaluate(response, submitted);
        Verdict {
            passed: expectation.is_satisfied_by(&outcome),
            outcome,
        }
    }
}

/// Truncate a string to at most `max` characters
#[must_use]
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
