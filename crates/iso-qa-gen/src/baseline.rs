//! Baseline synthesis
//!
//! Picks exactly one valid candidate per field and assembles the all-valid
//! [`FieldValueMap`] that every mutation starts from.

use crate::error::ConfigError;
use crate::schema::{CandidateSource, FieldFormat, FieldSpec, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field id to submitted text value.
///
/// Iteration is sorted by id so every consumer sees the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValueMap(BTreeMap<String, String>);

impl FieldValueMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value
    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(id.into(), value.into());
    }

    /// Get a value
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    /// Whether `id` has a value
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Clone with exactly one entry overwritten
    #[must_use]
    pub fn with_override(&self, id: &str, value: &str) -> Self {
        let mut copy = self.clone();
        copy.insert(id, value);
        copy
    }

    /// Ids whose value differs from (or is missing in) `other`
    #[must_use]
    pub fn differing_ids(&self, other: &Self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .0
            .iter()
            .filter(|(k, v)| other.0.get(*k) != Some(*v))
            .map(|(k, _)| k.clone())
            .collect();
        ids.extend(
            other
                .0
                .keys()
                .filter(|k| !self.0.contains_key(*k))
                .cloned(),
        );
        ids.sort();
        ids
    }

    /// Entries in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for FieldValueMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl CandidateSource {
    /// Preference order for a format.
    ///
    /// Variable-length fields are submitted raw, everything else uses the
    /// formatted example first.
    #[must_use]
    pub const fn chain_for(format: FieldFormat) -> [Self; 3] {
        if format.is_variable() {
            [Self::ValidExampleRaw, Self::ValidExample, Self::SampleData]
        } else {
            [Self::ValidExample, Self::ValidExampleRaw, Self::SampleData]
        }
    }
}

/// Select a field's baseline value following its format's candidate chain
#[must_use]
pub fn select_candidate(field: &FieldSpec) -> Option<(CandidateSource, &str)> {
    CandidateSource::chain_for(field.format)
        .into_iter()
        .find_map(|source| field.candidate(source).map(|v| (source, v)))
}

/// Result of baseline synthesis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Baseline {
    /// The all-valid values
    pub values: FieldValueMap,
    /// Which source each value came from
    pub sources: BTreeMap<String, CandidateSource>,
    /// Fields omitted from the baseline that declare invalid categories
    pub config_errors: Vec<ConfigError>,
}

/// Builds the all-valid baseline from a schema
#[derive(Debug, Clone, Copy)]
pub struct BaselineSynthesizer<'a> {
    schema: &'a Schema,
}

impl<'a> BaselineSynthesizer<'a> {
    /// Create a synthesizer over a schema
    #[must_use]
    pub const fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Build the baseline
    #[must_use]
    pub fn synthesize(&self) -> Baseline {
        let mut baseline = Baseline::default();
        for field in self.schema.fields() {
            match select_candidate(field) {
                Some((source, value)) => {
                    baseline.values.insert(field.id.clone(), value);
                    baseline.sources.insert(field.id.clone(), source);
                }
                None if !field.categories.is_empty() => {
                    tracing::warn!(target: "iso_qa::baseline", field_id = %field.id, "field declares invalid categories but has no valid candidate");
                    baseline.config_errors.push(ConfigError::new(
                        &field.id,
                        "declares invalid categories but has no validExample, validExampleRaw or SampleData",
                    ));
                }
                None => {
                    tracing::debug!(target: "iso_qa::baseline", field_id = %field.id, "field has no candidate; omitted");
                }
            }
        }
        baseline
    }
}
