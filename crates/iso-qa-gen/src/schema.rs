//! Field schema model
//!
//! A typed, read-only view over the field catalog. The catalog is a keyed
//! document (JSON or YAML) with one entry per data element; entry order is
//! preserved so that plans and reports come out in the order the schema
//! author wrote them.
//!
//! Loading is split in two layers: a document that cannot be parsed at all is
//! an [`Error::SchemaParse`], while a single malformed entry only produces a
//! [`ConfigError`] and is left out of the model.

use crate::error::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Description used when a category declares a value but no description
pub const UNKNOWN_DESCRIPTION: &str = "Unknown error";

/// Invalid-value category.
///
/// Closed set, declared in the order categories are tried. Adding a category
/// means adding a variant here and to [`Category::all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Characters of the wrong class for the field type
    InvalidType,
    /// Punctuation / special characters
    InvalidSpecialChars,
    /// Shorter than the fixed length
    InvalidLengthShort,
    /// Longer than the fixed length
    InvalidLengthLong,
    /// Empty value
    InvalidEmpty,
    /// Longer than the variable-length maximum
    InvalidLengthExceedMax,
    /// Malformed combined date/time
    InvalidDatetime,
    /// Malformed time
    InvalidTime,
    /// Malformed date
    InvalidDate,
    /// Non-binary characters in a binary field
    InvalidBinaryChars,
}

impl Category {
    /// All categories in declared order
    #[must_use]
    pub const fn all() -> [Self; 10] {
        [
            Self::InvalidType,
            Self::InvalidSpecialChars,
            Self::InvalidLengthShort,
            Self::InvalidLengthLong,
            Self::InvalidEmpty,
            Self::InvalidLengthExceedMax,
            Self::InvalidDatetime,
            Self::InvalidTime,
            Self::InvalidDate,
            Self::InvalidBinaryChars,
        ]
    }

    /// Schema tag for this category
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::InvalidType => "invalid_type",
            Self::InvalidSpecialChars => "invalid_special_chars",
            Self::InvalidLengthShort => "invalid_length_short",
            Self::InvalidLengthLong => "invalid_length_long",
            Self::InvalidEmpty => "invalid_empty",
            Self::InvalidLengthExceedMax => "invalid_length_exceed_max",
            Self::InvalidDatetime => "invalid_datetime",
            Self::InvalidTime => "invalid_time",
            Self::InvalidDate => "invalid_date",
            Self::InvalidBinaryChars => "invalid_binary_chars",
        }
    }

    /// Schema key holding the invalid exemplar, e.g. `invalid_type_value`
    #[must_use]
    pub fn value_key(&self) -> String {
        format!("{}_value", self.tag())
    }

    /// Schema key holding the exemplar description
    #[must_use]
    pub fn description_key(&self) -> String {
        format!("{}_description", self.tag())
    }

    /// Parse a schema tag
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::all().into_iter().find(|c| c.tag() == tag)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Field encoding format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    /// Fixed length
    Fixed,
    /// Variable length, two-digit length indicator
    Llvar,
    /// Variable length, three-digit length indicator
    Lllvar,
    /// Bitmap
    Bitmap,
}

impl FieldFormat {
    /// Parse a format name (case-insensitive)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Some(Self::Fixed),
            "llvar" => Some(Self::Llvar),
            "lllvar" => Some(Self::Lllvar),
            "bitmap" => Some(Self::Bitmap),
            _ => None,
        }
    }

    /// Whether the field carries a length prefix
    #[must_use]
    pub const fn is_variable(&self) -> bool {
        matches!(self, Self::Llvar | Self::Lllvar)
    }

    /// Digits in the length indicator, for variable formats
    #[must_use]
    pub const fn length_indicator_size(&self) -> Option<usize> {
        match self {
            Self::Llvar => Some(2),
            Self::Lllvar => Some(3),
            Self::Fixed | Self::Bitmap => None,
        }
    }
}

impl std::fmt::Display for FieldFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Llvar => write!(f, "llvar"),
            Self::Lllvar => write!(f, "lllvar"),
            Self::Bitmap => write!(f, "bitmap"),
        }
    }
}

/// Field data type
///
/// Labels outside the known set are kept as [`FieldType::Other`]; such a field
/// is still part of the baseline and the plan, it only gets no type-based
/// character check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Digits only
    Numeric,
    /// Letters only
    Alpha,
    /// Letters and digits
    Alphanumeric,
    /// Letters, digits and special characters
    AlphanumericSpecial,
    /// `0`/`1` characters
    Binary,
    /// Hexadecimal characters
    Hex,
    /// Combined date and time
    Datetime,
    /// Date
    Date,
    /// Time
    Time,
    /// Any other label, e.g. `z` (track 2) or `ns`
    Other(String),
}

impl FieldType {
    /// Parse a known type name (case-insensitive, accepts ISO shorthand)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "numeric" | "n" => Some(Self::Numeric),
            "alpha" | "a" => Some(Self::Alpha),
            "alphanumeric" | "an" => Some(Self::Alphanumeric),
            "alphanumeric_special" | "ans" => Some(Self::AlphanumericSpecial),
            "binary" | "b" => Some(Self::Binary),
            "hex" => Some(Self::Hex),
            "datetime" => Some(Self::Datetime),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            _ => None,
        }
    }

    /// Parse any label, falling back to [`FieldType::Other`]
    #[must_use]
    pub fn from_label(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| Self::Other(s.trim().to_string()))
    }

    /// Whether the label is one of the known types
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for FieldType {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.to_string()
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Numeric => "numeric",
            Self::Alpha => "alpha",
            Self::Alphanumeric => "alphanumeric",
            Self::AlphanumericSpecial => "alphanumeric_special",
            Self::Binary => "binary",
            Self::Hex => "hex",
            Self::Datetime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
            Self::Other(label) => label.as_str(),
        };
        f.write_str(s)
    }
}

/// An invalid exemplar declared for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidExample {
    /// The invalid value submitted in place of the valid one
    pub value: String,
    /// Human-readable description
    pub description: String,
}

/// Structural constraints used by the local validator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    /// Exact length for fixed fields
    #[serde(default)]
    pub exact_length: Option<usize>,
    /// Maximum length for variable fields
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Length indicator digits
    #[serde(default)]
    pub length_indicator_size: Option<usize>,
    /// Allowed character class, e.g. `0-9`
    #[serde(default)]
    pub allowed_chars: Option<String>,
    /// Whether `format` names a date/time layout
    #[serde(default)]
    pub is_date_time: bool,
    /// Date/time layout (`MMDDhhmmss`, `hhmmss`, `MMDD`)
    #[serde(default)]
    pub format: Option<String>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Valid example nested under the rules
    #[serde(default)]
    pub valid_example: Option<String>,
}

/// Source of a candidate valid value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateSource {
    /// `validExample` (formatted)
    ValidExample,
    /// `validExampleRaw` (unformatted)
    ValidExampleRaw,
    /// `SampleData`
    SampleData,
}

/// One entry of the field catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Field identifier (document key)
    pub id: String,
    /// Display label
    pub name: String,
    /// Encoding format
    pub format: FieldFormat,
    /// Data type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Fixed length
    pub length: Option<usize>,
    /// Variable-length maximum
    pub max_length: Option<usize>,
    /// Formatted valid example
    pub valid_example: Option<String>,
    /// Raw valid example
    pub valid_example_raw: Option<String>,
    /// Sample data
    pub sample_data: Option<String>,
    /// Declared invalid exemplars
    pub categories: BTreeMap<Category, InvalidExample>,
    /// Optional structural rules
    pub validation_rules: Option<ValidationRules>,
}

impl FieldSpec {
    /// Whether the category is declared
    #[must_use]
    pub fn has_category(&self, category: Category) -> bool {
        self.categories.contains_key(&category)
    }

    /// Declared categories in declared order
    pub fn declared_categories(&self) -> impl Iterator<Item = (Category, &InvalidExample)> {
        self.categories.iter().map(|(c, e)| (*c, e))
    }

    /// If `value` is one of this field's invalid exemplars, the first matching category
    #[must_use]
    pub fn invalid_category_of(&self, value: &str) -> Option<Category> {
        self.declared_categories()
            .find(|(_, e)| e.value == value)
            .map(|(c, _)| c)
    }

    /// Candidate value from a given source
    #[must_use]
    pub fn candidate(&self, source: CandidateSource) -> Option<&str> {
        match source {
            CandidateSource::ValidExample => self.valid_example.as_deref(),
            CandidateSource::ValidExampleRaw => self.valid_example_raw.as_deref(),
            CandidateSource::SampleData => self.sample_data.as_deref(),
        }
    }

    /// Whether any candidate valid value exists
    #[must_use]
    pub fn has_candidate(&self) -> bool {
        self.valid_example.is_some() || self.valid_example_raw.is_some() || self.sample_data.is_some()
    }

    /// Parse one catalog entry
    fn from_entry(id: &str, entry: &Map<String, Value>) -> std::result::Result<Self, ConfigError> {
        let name = required_text(id, entry, "name")?;
        let format_text = required_text(id, entry, "format")?;
        let format = FieldFormat::parse(&format_text)
            .ok_or_else(|| ConfigError::new(id, format!("unknown format `{format_text}`")))?;
        let field_type = FieldType::from_label(&required_text(id, entry, "type")?);
        if !field_type.is_known() {
            tracing::debug!(target: "iso_qa::schema", field_id = %id, field_type = %field_type, "unrecognised type; no character class check");
        }

        let length = optional_usize(id, entry, "length")?;
        let max_length = optional_usize(id, entry, "maxLength")?;
        let valid_example = optional_text(id, entry, "validExample")?;
        let valid_example_raw = optional_text(id, entry, "validExampleRaw")?;
        let sample_data = match optional_text(id, entry, "SampleData")? {
            Some(v) => Some(v),
            None => optional_text(id, entry, "sampleData")?,
        };

        let mut categories = BTreeMap::new();
        let nested = entry.get("testCases").and_then(Value::as_object);
        for category in Category::all() {
            if let Some(example) = parse_category(id, entry, nested, category)? {
                categories.insert(category, example);
            }
        }

        let validation_rules = match entry.get("validationRules") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                serde_json::from_value::<ValidationRules>(v.clone()).map_err(|e| {
                    ConfigError::new(id, format!("malformed validationRules: {e}"))
                })?,
            ),
        };

        let spec = Self {
            id: id.to_string(),
            name,
            format,
            field_type,
            length,
            max_length,
            valid_example,
            valid_example_raw,
            sample_data,
            categories,
            validation_rules,
        };

        for source in [
            CandidateSource::ValidExample,
            CandidateSource::ValidExampleRaw,
            CandidateSource::SampleData,
        ] {
            if let Some(candidate) = spec.candidate(source) {
                if let Some(category) = spec.invalid_category_of(candidate) {
                    return Err(ConfigError::new(
                        id,
                        format!("invalid exemplar for {category} equals a valid candidate `{candidate}`"),
                    ));
                }
            }
        }

        Ok(spec)
    }
}

fn parse_category(
    id: &str,
    entry: &Map<String, Value>,
    nested: Option<&Map<String, Value>>,
    category: Category,
) -> std::result::Result<Option<InvalidExample>, ConfigError> {
    let flat_value = optional_text(id, entry, &category.value_key())?;
    let flat_description = optional_text(id, entry, &category.description_key())?;

    let nested_entry = nested
        .and_then(|n| n.get(category.tag()))
        .map(|v| {
            v.as_object().ok_or_else(|| {
                ConfigError::new(id, format!("testCases.{} must be an object", category.tag()))
            })
        })
        .transpose()?;
    let (nested_value, nested_description) = match nested_entry {
        Some(obj) => (
            optional_text(id, obj, "value")?,
            optional_text(id, obj, "description")?,
        ),
        None => (None, None),
    };

    let Some(value) = flat_value.or(nested_value) else {
        return Ok(None);
    };
    let description = flat_description
        .or(nested_description)
        .unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string());
    Ok(Some(InvalidExample { value, description }))
}

fn value_as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_text(
    id: &str,
    entry: &Map<String, Value>,
    key: &str,
) -> std::result::Result<Option<String>, ConfigError> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => value_as_text(v)
            .map(Some)
            .ok_or_else(|| ConfigError::new(id, format!("attribute `{key}` must be text"))),
    }
}

fn required_text(
    id: &str,
    entry: &Map<String, Value>,
    key: &str,
) -> std::result::Result<String, ConfigError> {
    optional_text(id, entry, key)?
        .ok_or_else(|| ConfigError::new(id, format!("missing required attribute `{key}`")))
}

fn optional_usize(
    id: &str,
    entry: &Map<String, Value>,
    key: &str,
) -> std::result::Result<Option<usize>, ConfigError> {
    let invalid = || ConfigError::new(id, format!("attribute `{key}` must be a non-negative integer"));
    match entry.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// The loaded field catalog
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
    document: Map<String, Value>,
    config_errors: Vec<ConfigError>,
    fingerprint: String,
}

impl Schema {
    /// Load a schema file; `.yaml`/`.yml` are parsed as YAML, anything else as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the document cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parse a JSON schema document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::SchemaParse(e.to_string()))?;
        Self::from_value(value, fingerprint_of(json.as_bytes()))
    }

    /// Parse a YAML schema document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a YAML mapping.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(yaml).map_err(|e| Error::SchemaParse(e.to_string()))?;
        Self::from_value(value, fingerprint_of(yaml.as_bytes()))
    }

    fn from_value(value: Value, fingerprint: String) -> Result<Self> {
        let Value::Object(document) = value else {
            return Err(Error::SchemaParse(
                "schema root must be a mapping of field id to field entry".to_string(),
            ));
        };

        let mut fields = Vec::with_capacity(document.len());
        let mut index = HashMap::with_capacity(document.len());
        let mut config_errors = Vec::new();

        for (id, entry) in &document {
            let parsed = entry
                .as_object()
                .ok_or_else(|| ConfigError::new(id, "field entry must be a mapping"))
                .and_then(|obj| FieldSpec::from_entry(id, obj));
            match parsed {
                Ok(spec) => {
                    index.insert(id.clone(), fields.len());
                    fields.push(spec);
                }
                Err(e) => {
                    tracing::warn!(target: "iso_qa::schema", field_id = %id, error = %e.message, "field excluded from schema");
                    config_errors.push(e);
                }
            }
        }

        Ok(Self {
            fields,
            index,
            document,
            config_errors,
            fingerprint,
        })
    }

    /// The raw document the schema was parsed from, input order preserved
    #[must_use]
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Field identifiers in input order
    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.id.as_str())
    }

    /// All parsed fields in input order
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of parsed fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no parsed fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if the id is not in the schema.
    pub fn get(&self, id: &str) -> Result<&FieldSpec> {
        self.lookup(id)
            .ok_or_else(|| Error::UnknownField(id.to_string()))
    }

    /// Look up a field without an error
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&FieldSpec> {
        self.index.get(id).map(|&i| &self.fields[i])
    }

    /// Whether `id` declares `category`
    #[must_use]
    pub fn has_category(&self, id: &str, category: Category) -> bool {
        self.lookup(id).is_some_and(|f| f.has_category(category))
    }

    /// Invalid exemplar for `id`/`category`
    #[must_use]
    pub fn category_value(&self, id: &str, category: Category) -> Option<&str> {
        self.lookup(id)
            .and_then(|f| f.categories.get(&category))
            .map(|e| e.value.as_str())
    }

    /// Exemplar description for `id`/`category`
    #[must_use]
    pub fn category_description(&self, id: &str, category: Category) -> Option<&str> {
        self.lookup(id)
            .and_then(|f| f.categories.get(&category))
            .map(|e| e.description.as_str())
    }

    /// Resolve a dotted path like `2.validationRules.maxLength` against the raw document
    #[must_use]
    pub fn value_at_path(&self, path: &str) -> Option<String> {
        let mut parts = path.split('.');
        let mut node = self.document.get(parts.next()?)?;
        for part in parts {
            node = node.get(part)?;
        }
        match node {
            Value::Null => None,
            Value::Object(_) | Value::Array(_) => Some(node.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            scalar => value_as_text(scalar),
        }
    }

    /// `validExample` (or `validationRules.validExample`) of the first field named `name`
    #[must_use]
    pub fn valid_example_by_name(&self, name: &str) -> Option<&str> {
        let field = self.fields.iter().find(|f| f.name == name)?;
        field.valid_example.as_deref().or_else(|| {
            field
                .validation_rules
                .as_ref()
                .and_then(|r| r.valid_example.as_deref())
        })
    }

    /// Per-field problems found while loading
    #[must_use]
    pub fn config_errors(&self) -> &[ConfigError] {
        &self.config_errors
    }

    /// SHA-256 of the raw schema bytes
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint_of(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAN_SCHEMA: &str = r#"{
        "2": {
            "name": "Primary Account Number",
            "format": "lllvar",
            "type": "numeric",
            "maxLength": 19,
            "validExample": "16,4111111111111111",
            "validExampleRaw": "4111111111111111",
            "invalid_length_exceed_max_value": "41111111111111119999",
            "invalid_length_exceed_max_description": "Exceeds maximum length of 19 characters",
            "invalid_type_value": "ABCDEFGHIJKLMNOP"
        },
        "3": {
            "name": "Processing Code",
            "format": "fixed",
            "type": "numeric",
            "length": 6,
            "validExample": "000000",
            "invalid_length_short_value": "00000",
            "invalid_length_short_description": "Length shorter than required 6 characters"
        },
        "1": {
            "name": "Bitmap",
            "format": "bitmap",
            "type": "binary",
            "SampleData": "1111000000000000"
        }
    }"#;

    #[test]
    fn test_field_ids_preserve_input_order() {
        let schema = Schema::from_json_str(PAN_SCHEMA).expect("parse");
        let ids: Vec<&str> = schema.field_ids().collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
        assert!(schema.config_errors().is_empty());
    }

    #[test]
    fn test_get_unknown_field() {
        let schema = Schema::from_json_str(PAN_SCHEMA).expect("parse");
        let err = schema.get("99").unwrap_err();
        assert!(matches!(err, Error::UnknownField(ref id) if id == "99"));
    }

    #[test]
    fn test_category_lookups() {
        let schema = Schema::from_json_str(PAN_SCHEMA).expect("parse");
        assert!(schema.has_category("2", Category::InvalidLengthExceedMax));
        assert!(!schema.has_category("2", Category::InvalidEmpty));
        assert!(!schema.has_category("99", Category::InvalidType));
        assert_eq!(
            schema.category_value("2", Category::InvalidLengthExceedMax),
            Some("41111111111111119999")
        );
        assert_eq!(
            schema.category_description("2", Category::InvalidType),
            Some(UNKNOWN_DESCRIPTION)
        );
    }

    #[test]
    fn test_declared_categories_follow_declared_order() {
        let schema = Schema::from_json_str(PAN_SCHEMA).expect("parse");
        let field = schema.get("2").expect("field");
        let cats: Vec<Category> = field.declared_categories().map(|(c, _)| c).collect();
        assert_eq!(cats, vec![Category::InvalidType, Category::InvalidLengthExceedMax]);
    }

    #[test]
    fn test_sample_data_alias() {
        let schema = Schema::from_json_str(PAN_SCHEMA).expect("parse");
        let bitmap = schema.get("1").expect("field");
        assert_eq!(bitmap.sample_data.as_deref(), Some("1111000000000000"));
        assert_eq!(bitmap.format, FieldFormat::Bitmap);
    }

    #[test]
    fn test_root_must_be_object() {
        let err = Schema::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, Error::SchemaParse(_)));
    }

    #[test]
    fn test_unparseable_document() {
        let err = Schema::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::SchemaParse(_)));
    }

    #[test]
    fn test_missing_name_is_config_error() {
        let schema = Schema::from_json_str(
            r#"{"4": {"format": "fixed", "type": "numeric"}, "3": {"name": "x", "format": "fixed", "type": "n"}}"#,
        )
        .expect("parse");
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.config_errors().len(), 1);
        assert_eq!(schema.config_errors()[0].field_id, "4");
        assert!(schema.config_errors()[0].message.contains("`name`"));
    }

    #[test]
    fn test_unknown_format_is_config_error() {
        let schema =
            Schema::from_json_str(r#"{"4": {"name": "x", "format": "llllvar", "type": "numeric"}}"#)
                .expect("parse");
        assert!(schema.is_empty());
        assert!(schema.config_errors()[0].message.contains("llllvar"));
    }

    #[test]
    fn test_non_text_category_value_is_config_error() {
        let schema = Schema::from_json_str(
            r#"{"4": {"name": "x", "format": "fixed", "type": "numeric", "invalid_type_value": {"a": 1}}}"#,
        )
        .expect("parse");
        assert!(schema.is_empty());
        assert!(schema.config_errors()[0].message.contains("invalid_type_value"));
    }

    #[test]
    fn test_numeric_category_value_rendered_as_text() {
        let schema = Schema::from_json_str(
            r#"{"4": {"name": "x", "format": "fixed", "type": "an", "validExample": "AB12", "invalid_type_value": 1234}}"#,
        )
        .expect("parse");
        assert_eq!(schema.category_value("4", Category::InvalidType), Some("1234"));
    }

    #[test]
    fn test_exemplar_equal_to_candidate_is_config_error() {
        let schema = Schema::from_json_str(
            r#"{"4": {"name": "x", "format": "fixed", "type": "numeric", "validExample": "12", "invalid_empty_value": "12"}}"#,
        )
        .expect("parse");
        assert!(schema.is_empty());
        assert!(schema.config_errors()[0].message.contains("invalid_empty"));
    }

    #[test]
    fn test_nested_test_cases_and_flat_precedence() {
        let schema = Schema::from_json_str(
            r#"{"4": {
                "name": "Amount", "format": "fixed", "type": "numeric", "length": 12,
                "validExample": "000000001000",
                "invalid_type_value": "ABCDEFGHIJKL",
                "testCases": {
                    "invalid_type": {"value": "ZZZZZZZZZZZZ", "description": "nested"},
                    "invalid_length_short": {"value": "00000000100", "description": "short"}
                }
            }}"#,
        )
        .expect("parse");
        assert_eq!(schema.category_value("4", Category::InvalidType), Some("ABCDEFGHIJKL"));
        assert_eq!(schema.category_description("4", Category::InvalidType), Some("nested"));
        assert_eq!(schema.category_value("4", Category::InvalidLengthShort), Some("00000000100"));
    }

    #[test]
    fn test_validation_rules_parse() {
        let schema = Schema::from_json_str(
            r#"{"7": {
                "name": "Transmission Date & Time", "format": "fixed", "type": "numeric", "length": 10,
                "validExample": "0131235959",
                "validationRules": {"exactLength": 10, "allowedChars": "0-9", "isDateTime": true, "format": "MMDDhhmmss"}
            }}"#,
        )
        .expect("parse");
        let rules = schema.get("7").expect("field").validation_rules.clone().expect("rules");
        assert_eq!(rules.exact_length, Some(10));
        assert!(rules.is_date_time);
        assert_eq!(rules.format.as_deref(), Some("MMDDhhmmss"));
    }

    #[test]
    fn test_malformed_validation_rules() {
        let schema = Schema::from_json_str(
            r#"{"7": {"name": "x", "format": "fixed", "type": "numeric", "validationRules": {"exactLength": "ten"}}}"#,
        )
        .expect("parse");
        assert!(schema.config_errors()[0].message.contains("validationRules"));
    }

    #[test]
    fn test_value_at_path() {
        let schema = Schema::from_json_str(PAN_SCHEMA).expect("parse");
        assert_eq!(schema.value_at_path("2.validExampleRaw").as_deref(), Some("4111111111111111"));
        assert_eq!(schema.value_at_path("2.maxLength").as_deref(), Some("19"));
        assert_eq!(schema.value_at_path("2.nope"), None);
        assert_eq!(schema.value_at_path("99"), None);
    }

    #[test]
    fn test_valid_example_by_name() {
        let schema = Schema::from_json_str(PAN_SCHEMA).expect("parse");
        assert_eq!(schema.valid_example_by_name("Processing Code"), Some("000000"));
        assert_eq!(schema.valid_example_by_name("Bitmap"), None);
        assert_eq!(schema.valid_example_by_name("Missing"), None);
    }

    #[test]
    fn test_yaml_schema_preserves_order() {
        let yaml = r#"
"11":
  name: STAN
  format: fixed
  type: numeric
  validExample: "123456"
"4":
  name: Amount
  format: fixed
  type: numeric
  validExample: "000000001000"
"#;
        let schema = Schema::from_yaml_str(yaml).expect("parse");
        let ids: Vec<&str> = schema.field_ids().collect();
        assert_eq!(ids, vec!["11", "4"]);
    }

    #[test]
    fn test_from_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fields.json");
        std::fs::write(&path, PAN_SCHEMA).expect("write");
        let schema = Schema::from_file(&path).expect("load");
        assert_eq!(schema.len(), 3);

        let missing = Schema::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(missing, Error::IoError(_)));
    }

    #[test]
    fn test_fingerprint_is_stable_sha256() {
        let a = Schema::from_json_str(PAN_SCHEMA).expect("parse");
        let b = Schema::from_json_str(PAN_SCHEMA).expect("parse");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_category_tags_roundtrip() {
        for category in Category::all() {
            assert_eq!(Category::from_tag(category.tag()), Some(category));
            assert!(category.value_key().ends_with("_value"));
        }
        assert_eq!(Category::from_tag("invalid_hex_chars"), None);
    }

    #[test]
    fn test_format_and_type_parse() {
        assert_eq!(FieldFormat::parse("LLLVAR"), Some(FieldFormat::Lllvar));
        assert_eq!(FieldFormat::Llvar.length_indicator_size(), Some(2));
        assert!(!FieldFormat::Fixed.is_variable());
        assert_eq!(FieldType::parse("ans"), Some(FieldType::AlphanumericSpecial));
        assert_eq!(FieldType::parse("Numeric"), Some(FieldType::Numeric));
        assert_eq!(FieldType::parse("float"), None);
        assert_eq!(FieldType::from_label(" z "), FieldType::Other("z".to_string()));
        assert!(!FieldType::from_label("ns").is_known());
        assert!(FieldType::from_label("an").is_known());
    }

    #[test]
    fn test_unrecognised_type_keeps_field() {
        let schema = Schema::from_json_str(
            r#"{"35": {"name": "Track 2 Data", "format": "llvar", "type": "z", "maxLength": 37,
                       "validExampleRaw": "4111111111111111=2512", "invalid_empty_value": ""}}"#,
        )
        .expect("parse");
        assert!(schema.config_errors().is_empty());
        let field = schema.get("35").expect("field");
        assert_eq!(field.field_type, FieldType::Other("z".to_string()));
        assert!(field.has_category(Category::InvalidEmpty));
    }

    #[test]
    fn test_missing_type_is_config_error() {
        let schema =
            Schema::from_json_str(r#"{"35": {"name": "x", "format": "llvar", "validExampleRaw": "41"}}"#)
                .expect("parse");
        assert!(schema.is_empty());
        assert!(schema.config_errors()[0].message.contains("`type`"));
    }

    #[test]
    fn test_boolean_category_value_is_config_error() {
        let schema = Schema::from_json_str(
            r#"{"4": {"name": "x", "format": "fixed", "type": "numeric", "validExample": "12", "invalid_type_value": true}}"#,
        )
        .expect("parse");
        assert!(schema.is_empty());
        assert!(schema.config_errors()[0].message.contains("invalid_type_value"));
    }

    #[test]
    fn test_value_at_path_renders_booleans() {
        let schema = Schema::from_json_str(
            r#"{"7": {"name": "x", "format": "fixed", "type": "numeric", "validExample": "0131235959",
                      "validationRules": {"isDateTime": true}}}"#,
        )
        .expect("parse");
        assert_eq!(schema.value_at_path("7.validationRules.isDateTime").as_deref(), Some("true"));
    }
}
