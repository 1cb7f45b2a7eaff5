//! Exemplar catalog extender
//!
//! Fills a bare field catalog with invalid exemplars, a valid example and
//! structural rules derived from each field's `format`, `type`, `length` and
//! `maxLength`. Output is deterministic (fixed, cycled alphabets) and never
//! overwrites a key the author already wrote.

use crate::schema::{Category, FieldFormat, FieldType};
use serde_json::{json, Map, Value};

const DIGITS: &str = "0123456789";
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &str = "A1B2C3D4E5F6G7H8J9K0";
const PUNCTUATION: &str = "!@#$%^&*()";
const NON_HEX: &str = "GHIJKLMNOPQRSTUVWXYZ";
const NON_BINARY: &str = "23456789AB";
const HEX: &str = "0123456789ABCDEF";
const BINARY: &str = "10";

/// Result of extending a catalog
#[derive(Debug, Clone)]
pub struct Extension {
    /// The extended document, input field order preserved
    pub document: Map<String, Value>,
    /// Dotted paths of every key that was added, e.g. `2.testCases.invalid_type`
    pub added: Vec<String>,
}

/// Derives missing exemplars for a field catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogExtender;

impl CatalogExtender {
    /// Create an extender
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Extend every entry that has a recognised `format` and `type`
    #[must_use]
    pub fn extend(&self, document: &Map<String, Value>) -> Extension {
        let mut out = Map::with_capacity(document.len());
        let mut added = Vec::new();

        for (id, entry) in document {
            let mut entry = entry.clone();
            if let Value::Object(obj) = &mut entry {
                extend_entry(id, obj, &mut added);
            }
            out.insert(id.clone(), entry);
        }

        tracing::info!(target: "iso_qa::extend", added = added.len(), "catalog extended");
        Extension {
            document: out,
            added,
        }
    }
}

fn extend_entry(id: &str, entry: &mut Map<String, Value>, added: &mut Vec<String>) {
    let format = entry.get("format").and_then(Value::as_str).and_then(FieldFormat::parse);
    let field_type = entry.get("type").and_then(Value::as_str).and_then(FieldType::parse);
    let (Some(format), Some(field_type)) = (format, field_type) else {
        tracing::debug!(target: "iso_qa::extend", field_id = %id, "no recognised format/type; left as is");
        return;
    };
    let length = entry.get("length").and_then(Value::as_u64).and_then(|n| usize::try_from(n).ok());
    let max_length = entry.get("maxLength").and_then(Value::as_u64).and_then(|n| usize::try_from(n).ok());

    for (category, value, description) in exemplars(format, &field_type, length, max_length) {
        if has_category(entry, category) {
            continue;
        }
        let cases = entry
            .entry("testCases")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(cases) = cases {
            cases.insert(
                category.tag().to_string(),
                json!({ "value": value, "description": description }),
            );
            added.push(format!("{id}.testCases.{category}"));
        }
    }

    if !entry.contains_key("validExample") {
        if let Some(example) = valid_example(format, &field_type, length, max_length) {
            if format.is_variable() && !entry.contains_key("validExampleRaw") {
                entry.insert("validExampleRaw".to_string(), Value::String(example.raw));
                added.push(format!("{id}.validExampleRaw"));
            }
            entry.insert("validExample".to_string(), Value::String(example.formatted));
            added.push(format!("{id}.validExample"));
        }
    }

    if !entry.contains_key("validationRules") {
        if let Some(rules) = validation_rules(format, &field_type, length, max_length) {
            entry.insert("validationRules".to_string(), rules);
            added.push(format!("{id}.validationRules"));
        }
    }
}

fn has_category(entry: &Map<String, Value>, category: Category) -> bool {
    entry.contains_key(&category.value_key())
        || entry
            .get("testCases")
            .and_then(|c| c.get(category.tag()))
            .is_some()
}

fn cycled(alphabet: &str, n: usize) -> String {
    alphabet.chars().cycle().take(n).collect()
}

/// Alphabet a valid value of `field_type` is drawn from
fn valid_alphabet(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::Numeric | FieldType::Datetime | FieldType::Date | FieldType::Time => DIGITS,
        FieldType::Alpha => LETTERS,
        FieldType::Alphanumeric | FieldType::AlphanumericSpecial | FieldType::Other(_) => {
            ALPHANUMERIC
        }
        FieldType::Binary => BINARY,
        FieldType::Hex => HEX,
    }
}

fn allowed_chars(field_type: &FieldType) -> Option<&'static str> {
    match field_type {
        FieldType::Numeric | FieldType::Datetime | FieldType::Date | FieldType::Time => Some("0-9"),
        FieldType::Alpha => Some("a-zA-Z"),
        FieldType::Alphanumeric => Some("a-zA-Z0-9"),
        FieldType::Binary => Some("0-1"),
        FieldType::Hex => Some("0-9A-F"),
        FieldType::AlphanumericSpecial | FieldType::Other(_) => None,
    }
}

fn exemplars(
    format: FieldFormat,
    field_type: &FieldType,
    length: Option<usize>,
    max_length: Option<usize>,
) -> Vec<(Category, String, String)> {
    let n = length.or(max_length).unwrap_or(1).max(1);
    let mut out = Vec::new();

    match field_type {
        FieldType::Numeric => {
            out.push((
                Category::InvalidType,
                cycled(LETTERS, n),
                "Contains non-numeric characters".to_string(),
            ));
            out.push((
                Category::InvalidSpecialChars,
                cycled(PUNCTUATION, n),
                "Contains special characters".to_string(),
            ));
        }
        FieldType::Alphanumeric => out.push((
            Category::InvalidSpecialChars,
            cycled(PUNCTUATION, n),
            "Contains invalid special characters".to_string(),
        )),
        FieldType::Binary => out.push((
            Category::InvalidBinaryChars,
            cycled(NON_BINARY, n),
            "Contains non-binary characters".to_string(),
        )),
        FieldType::Hex => out.push((
            Category::InvalidType,
            cycled(NON_HEX, n),
            "Contains non-hexadecimal characters".to_string(),
        )),
        _ => {}
    }

    let alphabet = valid_alphabet(field_type);
    match format {
        FieldFormat::Fixed => {
            if let Some(len) = length.filter(|l| *l > 0) {
                out.push((
                    Category::InvalidLengthShort,
                    cycled(alphabet, len - 1),
                    format!("Length shorter than required {len} characters"),
                ));
                out.push((
                    Category::InvalidLengthLong,
                    cycled(alphabet, len + 1),
                    format!("Length longer than required {len} characters"),
                ));
            }
        }
        FieldFormat::Llvar | FieldFormat::Lllvar => {
            if let Some(max) = max_length {
                out.push((
                    Category::InvalidLengthExceedMax,
                    cycled(alphabet, max + 1),
                    format!("Exceeds maximum length of {max} characters"),
                ));
            }
        }
        FieldFormat::Bitmap => {}
    }

    out.push((Category::InvalidEmpty, String::new(), "Empty value".to_string()));
    out
}

struct ValidExample {
    raw: String,
    formatted: String,
}

fn valid_example(
    format: FieldFormat,
    field_type: &FieldType,
    length: Option<usize>,
    max_length: Option<usize>,
) -> Option<ValidExample> {
    let alphabet = valid_alphabet(field_type);
    match format {
        FieldFormat::Fixed | FieldFormat::Bitmap => {
            let raw = cycled(alphabet, length.filter(|l| *l > 0)?);
            Some(ValidExample {
                formatted: raw.clone(),
                raw,
            })
        }
        FieldFormat::Llvar | FieldFormat::Lllvar => {
            let max = max_length.filter(|m| *m > 0)?;
            let data_len = max.div_ceil(2);
            let raw = cycled(alphabet, data_len);
            let width = format.length_indicator_size().unwrap_or(2);
            Some(ValidExample {
                formatted: format!("{data_len:0width$}{raw}"),
                raw,
            })
        }
    }
}

fn validation_rules(
    format: FieldFormat,
    field_type: &FieldType,
    length: Option<usize>,
    max_length: Option<usize>,
) -> Option<Value> {
    let mut rules = Map::new();
    match format {
        FieldFormat::Fixed => {
            let len = length?;
            rules.insert("exactLength".to_string(), json!(len));
            rules.insert(
                "description".to_string(),
                json!(format!("Must be exactly {len} characters long with {field_type} characters")),
            );
        }
        FieldFormat::Llvar | FieldFormat::Lllvar => {
            let max = max_length?;
            rules.insert("maxLength".to_string(), json!(max));
            rules.insert(
                "lengthIndicatorSize".to_string(),
                json!(format.length_indicator_size()),
            );
            rules.insert(
                "description".to_string(),
                json!(format!("Variable length up to {max} characters with {format} length indicator")),
            );
        }
        FieldFormat::Bitmap => return None,
    }
    if let Some(chars) = allowed_chars(field_type) {
        rules.insert("allowedChars".to_string(), json!(chars));
    }
    Some(Value::Object(rules))
}
