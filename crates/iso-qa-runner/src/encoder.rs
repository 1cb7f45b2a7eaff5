//! Message encoding
//!
//! Renders a [`FieldValueMap`] into the payload the SUT consumes. The default
//! [`FieldListEncoder`] produces `ISO8583_MSG:<id>=<value>;...`, ids in
//! numeric order, with `\`, `=` and `;` escaped so the rendering is reversible.

use crate::error::{Error, Result};
use iso_qa_gen::FieldValueMap;
use serde::{Deserialize, Serialize};

/// Prefix of every field-list message
pub const MESSAGE_PREFIX: &str = "ISO8583_MSG:";

/// An encoded message ready for transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Encoded message text
    pub message: String,
}

impl Payload {
    /// JSON request body, `{"isoMessage": "<message>"}`
    #[must_use]
    pub fn request_body(&self) -> serde_json::Value {
        serde_json::json!({ "isoMessage": self.message })
    }
}

/// Converts field values into SUT payloads
pub trait MessageEncoder: Send + Sync {
    /// Encode a full field map
    fn encode(&self, values: &FieldValueMap) -> Payload;

    /// Recover the field map from an encoded message
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the message is not in this encoder's format.
    fn decode(&self, message: &str) -> Result<FieldValueMap>;

    /// Encoder name for logs
    fn name(&self) -> &'static str;
}

/// `ISO8583_MSG:id=value;` field-list encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldListEncoder;

impl FieldListEncoder {
    /// Create an encoder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn id_order(id: &str) -> (u8, u64, &str) {
    id.parse::<u64>().map_or((1, 0, id), |n| (0, n, id))
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        if matches!(c, '\\' | '=' | ';') {
            out.push('\\');
        }
        out.push(c);
    }
}

impl MessageEncoder for FieldListEncoder {
    fn encode(&self, values: &FieldValueMap) -> Payload {
        let mut entries: Vec<(&str, &str)> = values.iter().collect();
        entries.sort_by_key(|(id, _)| id_order(id));

        let mut message = String::from(MESSAGE_PREFIX);
        for (id, value) in entries {
            escape_into(&mut message, id);
            message.push('=');
            escape_into(&mut message, value);
            message.push(';');
        }
        Payload { message }
    }

    fn decode(&self, message: &str) -> Result<FieldValueMap> {
        let body = message
            .strip_prefix(MESSAGE_PREFIX)
            .ok_or_else(|| Error::Decode(format!("missing {MESSAGE_PREFIX} prefix")))?;

        let mut values = FieldValueMap::new();
        let mut key = String::new();
        let mut value = String::new();
        let mut in_value = false;
        let mut chars = body.chars();

        while let Some(c) = chars.next() {
            let target = if in_value { &mut value } else { &mut key };
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => target.push(escaped),
                    None => return Err(Error::Decode("dangling escape".to_string())),
                },
                '=' if !in_value => in_value = true,
                ';' if in_value => {
                    values.insert(std::mem::take(&mut key), std::mem::take(&mut value));
                    in_value = false;
                }
                '=' | ';' => {
                    return Err(Error::Decode(format!("unexpected `{c}` in entry `{key}`")));
                }
                other => target.push(other),
            }
        }

        if in_value || !key.is_empty() {
            return Err(Error::Decode(format!("unterminated entry `{key}`")));
        }
        Ok(values)
    }

    fn name(&self) -> &'static str {
        "field-list"
    }
}
