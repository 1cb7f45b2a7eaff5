//! Structural validator
//!
//! Local, schema-only checks of field values: declared-invalid membership,
//! length, character class and date/time ranges. The SUT's own verdict is
//! always what the oracle scores; this validator backs the in-process
//! reference SUT, the optional preflight and the `validate` subcommand.

use crate::baseline::FieldValueMap;
use crate::schema::{FieldSpec, FieldType, Schema, ValidationRules};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which rule a value broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Value is one of the field's declared invalid exemplars
    KnownInvalid,
    /// Fixed field of the wrong length
    ExactLength,
    /// Variable field over its maximum
    MaxLength,
    /// Character outside the allowed class
    AllowedChars,
    /// Date/time component out of range
    DateTime,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::KnownInvalid => "known_invalid",
            Self::ExactLength => "exact_length",
            Self::MaxLength => "max_length",
            Self::AllowedChars => "allowed_chars",
            Self::DateTime => "date_time",
        };
        f.write_str(s)
    }
}

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Offending field
    pub field_id: String,
    /// Broken rule
    pub rule: Rule,
    /// Details
    pub message: String,
}

impl Violation {
    fn new(field_id: &str, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            field_id: field_id.to_string(),
            rule,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field {} [{}]: {}", self.field_id, self.rule, self.message)
    }
}

/// Checks values against the schema's structural rules
#[derive(Debug, Clone, Copy)]
pub struct StructuralValidator<'a> {
    schema: &'a Schema,
}

impl<'a> StructuralValidator<'a> {
    /// Create a validator
    #[must_use]
    pub const fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Check every known field in `values`; unknown ids are ignored
    #[must_use]
    pub fn check(&self, values: &FieldValueMap) -> Vec<Violation> {
        values
            .iter()
            .filter_map(|(id, value)| self.schema.lookup(id).map(|field| (field, value)))
            .flat_map(|(field, value)| check_field(field, value))
            .collect()
    }
}

/// Check one value against one field
#[must_use]
pub fn check_field(field: &FieldSpec, value: &str) -> Vec<Violation> {
    let mut violations = Vec::new();

    if let Some(category) = field.invalid_category_of(value) {
        violations.push(Violation::new(
            &field.id,
            Rule::KnownInvalid,
            format!("value is the declared {category} exemplar"),
        ));
    }

    // Only fields that declare rules get the structural checks.
    let Some(rules) = field.validation_rules.as_ref() else {
        return violations;
    };

    let len = value.chars().count();
    if field.format.is_variable() {
        if let Some(max) = rules.max_length {
            if len > max {
                violations.push(Violation::new(
                    &field.id,
                    Rule::MaxLength,
                    format!("length {len} exceeds maximum {max}"),
                ));
            }
        }
    } else if let Some(exact) = rules.exact_length {
        if len != exact {
            violations.push(Violation::new(
                &field.id,
                Rule::ExactLength,
                format!("length {len} is not {exact}"),
            ));
        }
    }

    if let Some(class) = char_class(&field.field_type, rules) {
        match Regex::new(&format!("^[{class}]+$")) {
            Ok(re) if !re.is_match(value) => violations.push(Violation::new(
                &field.id,
                Rule::AllowedChars,
                format!("value contains characters outside [{class}]"),
            )),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(target: "iso_qa::validator", field_id = %field.id, error = %e, "unusable allowedChars");
            }
        }
    }

    if rules.is_date_time {
        if let Some(message) = rules.format.as_deref().and_then(|f| date_time_problem(f, value)) {
            violations.push(Violation::new(&field.id, Rule::DateTime, message));
        }
    }

    violations
}

fn char_class(field_type: &FieldType, rules: &ValidationRules) -> Option<String> {
    let allowed = rules.allowed_chars.as_deref();
    if *field_type == FieldType::Numeric || allowed == Some("0-9") {
        Some("0-9".to_string())
    } else if *field_type == FieldType::Binary || allowed == Some("0-1") {
        Some("01".to_string())
    } else if *field_type == FieldType::Hex {
        Some("0-9A-Fa-f".to_string())
    } else {
        allowed.map(str::to_string)
    }
}

/// Range-check a date/time value. Only values of the layout's exact length
/// are inspected; length is the length rules' concern.
fn date_time_problem(layout: &str, value: &str) -> Option<String> {
    let (expected_len, ranges): (usize, &[(&str, u32, u32)]) = match layout {
        "MMDDhhmmss" => (
            10,
            &[("month", 1, 12), ("day", 1, 31), ("hour", 0, 23), ("minute", 0, 59), ("second", 0, 59)],
        ),
        "hhmmss" => (6, &[("hour", 0, 23), ("minute", 0, 59), ("second", 0, 59)]),
        "MMDD" => (4, &[("month", 1, 12), ("day", 1, 31)]),
        _ => return None,
    };
    if value.len() != expected_len {
        return None;
    }

    for (i, (name, lo, hi)) in ranges.iter().enumerate() {
        let part = value.get(i * 2..i * 2 + 2)?;
        let Ok(n) = part.parse::<u32>() else {
            return Some(format!("{name} `{part}` is not numeric"));
        };
        if n < *lo || n > *hi {
            return Some(format!("{name} {n} outside {lo}..={hi}"));
        }
    }
    None
}
