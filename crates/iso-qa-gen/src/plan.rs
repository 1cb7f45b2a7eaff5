//! Test plan generation
//!
//! Enumerates field × category into single-fault test cases. Only one field
//! ever differs from the baseline, so a failing case points at exactly one
//! field and one category.

use crate::baseline::{Baseline, FieldValueMap};
use crate::error::ConfigError;
use crate::schema::{Category, Schema};
use serde::{Deserialize, Serialize};

/// What the SUT is expected to do with a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    /// The submission must be rejected
    Reject,
    /// The submission must be accepted with correct values
    Accept,
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Accept => write!(f, "accept"),
        }
    }
}

/// Which submission of a test case is being made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    /// The all-valid baseline submission
    Baseline,
    /// The mutated submission
    Reject,
    /// The restored submission after a mutation
    Recovery,
}

impl Leg {
    /// Expected SUT behaviour for this leg
    #[must_use]
    pub const fn expectation(&self) -> Expectation {
        match self {
            Self::Reject => Expectation::Reject,
            Self::Baseline | Self::Recovery => Expectation::Accept,
        }
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Reject => write!(f, "reject"),
            Self::Recovery => write!(f, "recovery"),
        }
    }
}

/// A single mutation test case.
///
/// The expect-reject submission replaces one field with an invalid exemplar;
/// the paired expect-accept submission restores the baseline value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Stable id, `<field>/<category>`
    pub id: String,
    /// Mutated field
    pub field_id: String,
    /// Mutated field's display name
    pub field_name: String,
    /// Invalid-value category
    pub category: Category,
    /// The invalid exemplar
    pub invalid_value: String,
    /// Exemplar description
    pub description: String,
    /// Baseline value restored for the recovery leg
    pub restore_value: String,
}

impl TestCase {
    /// Expected outcome of the mutated submission
    #[must_use]
    pub const fn expected_outcome(&self) -> Expectation {
        Expectation::Reject
    }

    /// Expected outcome of the recovery submission
    #[must_use]
    pub const fn recovery_expectation(&self) -> Expectation {
        Expectation::Accept
    }

    /// Baseline clone with this case's field replaced by the invalid exemplar
    #[must_use]
    pub fn mutate(&self, baseline: &FieldValueMap) -> FieldValueMap {
        baseline.with_override(&self.field_id, &self.invalid_value)
    }

    /// `mutated` with this case's field put back to its baseline value
    #[must_use]
    pub fn restore(&self, mutated: &FieldValueMap) -> FieldValueMap {
        mutated.with_override(&self.field_id, &self.restore_value)
    }
}

/// All cases for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPlan {
    /// Field id
    pub field_id: String,
    /// Display name
    pub field_name: String,
    /// Cases in category order
    pub cases: Vec<TestCase>,
    /// Why the field's categories could not be planned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

impl FieldPlan {
    /// Whether any case was planned
    #[must_use]
    pub fn has_tests(&self) -> bool {
        !self.cases.is_empty()
    }
}

/// The complete, ordered test plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPlan {
    /// SHA-256 of the schema the plan was built from
    pub schema_fingerprint: String,
    /// The all-valid baseline
    pub baseline: FieldValueMap,
    /// Per-field plans, schema order
    pub fields: Vec<FieldPlan>,
    /// Schema and baseline problems
    pub config_errors: Vec<ConfigError>,
}

impl TestPlan {
    /// All cases in execution order
    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.fields.iter().flat_map(|f| f.cases.iter())
    }

    /// Number of mutation cases
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.fields.iter().map(|f| f.cases.len()).sum()
    }

    /// Number of scored submissions (reject and recovery legs, baseline excluded)
    #[must_use]
    pub fn total_tests(&self) -> usize {
        self.case_count() * 2
    }
}

/// Enumerates the test plan from a schema and its baseline
#[derive(Debug, Clone, Copy)]
pub struct TestPlanGenerator<'a> {
    schema: &'a Schema,
}

impl<'a> TestPlanGenerator<'a> {
    /// Create a generator
    #[must_use]
    pub const fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Generate the plan
    #[must_use]
    pub fn generate(&self, baseline: &Baseline) -> TestPlan {
        let mut fields = Vec::with_capacity(self.schema.len());

        for field in self.schema.fields() {
            let mut plan = FieldPlan {
                field_id: field.id.clone(),
                field_name: field.name.clone(),
                cases: Vec::new(),
                skipped_reason: None,
            };

            match baseline.values.get(&field.id) {
                Some(restore_value) => {
                    for category in Category::all() {
                        let Some(example) = field.categories.get(&category) else {
                            continue;
                        };
                        plan.cases.push(TestCase {
                            id: format!("{}/{}", field.id, category),
                            field_id: field.id.clone(),
                            field_name: field.name.clone(),
                            category,
                            invalid_value: example.value.clone(),
                            description: example.description.clone(),
                            restore_value: restore_value.to_string(),
                        });
                    }
                }
                None if !field.categories.is_empty() => {
                    plan.skipped_reason = Some("no valid candidate value for baseline".to_string());
                }
                None => {}
            }

            fields.push(plan);
        }

        let mut config_errors = self.schema.config_errors().to_vec();
        config_errors.extend(baseline.config_errors.iter().cloned());

        TestPlan {
            schema_fingerprint: self.schema.fingerprint().to_string(),
            baseline: baseline.values.clone(),
            fields,
            config_errors,
        }
    }
}

/// Synthesize the baseline and generate the plan in one step
#[must_use]
pub fn plan_for(schema: &Schema) -> TestPlan {
    let baseline = crate::baseline::BaselineSynthesizer::new(schema).synthesize();
    TestPlanGenerator::new(schema).generate(&baseline)
}
