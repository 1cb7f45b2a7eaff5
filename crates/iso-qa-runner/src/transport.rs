//! SUT transports
//!
//! A transport delivers one encoded payload to the system under test and
//! returns its classified [`Response`]. Connection problems, timeouts and
//! non-2xx statuses come back as a [`TransportFailure`], which the
//! orchestrator scores as a rejection. Nothing is retried.

use crate::encoder::{FieldListEncoder, MessageEncoder, Payload};
use crate::error::{Error, Result};
use iso_qa_gen::{truncate, FieldValueMap, Response, Schema, StructuralValidator};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Default SUT endpoint
pub const DEFAULT_URL: &str = "http://127.0.0.1:8080/iso8583/parse";

/// Default per-request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Why a submission never produced a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportFailure {
    /// Could not connect or the request failed in flight
    #[error("connection failed: {message}")]
    Connect {
        /// Underlying error
        message: String,
    },
    /// No reply within the timeout
    #[error("timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout
        timeout_ms: u64,
    },
    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code
        status: u16,
        /// Truncated reply body
        body: String,
    },
    /// Reply body could not be read
    #[error("unreadable response body: {message}")]
    Body {
        /// Underlying error
        message: String,
    },
    /// Payload could not be turned into a request
    #[error("request encoding failed: {message}")]
    Encoding {
        /// Underlying error
        message: String,
    },
}

/// Delivers payloads to the SUT
pub trait SutTransport: Send + Sync {
    /// Submit one payload
    ///
    /// # Errors
    ///
    /// Returns a [`TransportFailure`] if no response could be obtained.
    fn send(&self, payload: &Payload) -> std::result::Result<Response, TransportFailure>;

    /// Transport name for logs and reports
    fn name(&self) -> &str;
}

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    /// Endpoint receiving `{"isoMessage": ...}` POSTs
    pub url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Blocking HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Build a transport
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportSetup`] if the HTTP client cannot be built.
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::TransportSetup(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn classify(&self, e: &reqwest::Error) -> TransportFailure {
        if e.is_timeout() {
            TransportFailure::Timeout {
                timeout_ms: self.config.timeout_ms,
            }
        } else if e.is_builder() {
            TransportFailure::Encoding {
                message: e.to_string(),
            }
        } else {
            TransportFailure::Connect {
                message: e.to_string(),
            }
        }
    }
}

impl SutTransport for HttpTransport {
    fn send(&self, payload: &Payload) -> std::result::Result<Response, TransportFailure> {
        let reply = self
            .client
            .post(&self.config.url)
            .json(&payload.request_body())
            .send()
            .map_err(|e| self.classify(&e))?;

        let status = reply.status();
        let body = reply.text().map_err(|e| {
            if e.is_timeout() {
                self.classify(&e)
            } else {
                TransportFailure::Body {
                    message: e.to_string(),
                }
            }
        })?;

        if !status.is_success() {
            return Err(TransportFailure::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        tracing::trace!(target: "iso_qa::transport", status = status.as_u16(), bytes = body.len(), "reply received");
        Ok(Response::from_body(&body))
    }

    fn name(&self) -> &str {
        &self.config.url
    }
}

/// In-process reference SUT.
///
/// Decodes the field-list payload and applies the schema's structural rules.
/// The first violation is answered with an `ISOParserException` marker,
/// otherwise the decoded fields are echoed back as parsed elements.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    schema: Schema,
    encoder: FieldListEncoder,
}

impl SimulatedTransport {
    /// Create a simulated SUT for a schema
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            encoder: FieldListEncoder::new(),
        }
    }

    fn reply_body(&self, payload: &Payload) -> String {
        let values = match self.encoder.decode(&payload.message) {
            Ok(values) => values,
            Err(e) => return serde_json::json!({ "error": format!("ISOParserException: {e}") }).to_string(),
        };

        let violations = StructuralValidator::new(&self.schema).check(&values);
        if let Some(first) = violations.first() {
            return serde_json::json!({ "error": format!("ISOParserException: {first}") }).to_string();
        }

        elements_body(&values)
    }
}

/// Reply body listing every field as a parsed element
fn elements_body(values: &FieldValueMap) -> String {
    let elements: Vec<serde_json::Value> = values
        .iter()
        .map(|(id, value)| serde_json::json!({ "dataElementId": id, "value": value }))
        .collect();
    serde_json::Value::Array(elements).to_string()
}

impl SutTransport for SimulatedTransport {
    fn send(&self, payload: &Payload) -> std::result::Result<Response, TransportFailure> {
        Ok(Response::from_body(&self.reply_body(payload)))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// Scripted reply for [`MockTransport`]
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw reply body, classified like an HTTP body
    Body(String),
    /// Transport failure
    Failure(TransportFailure),
    /// Decode the payload and echo every field as accepted
    Echo,
}

/// Scripted transport for tests
#[derive(Debug)]
pub struct MockTransport {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    sent: Mutex<Vec<Payload>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A mock that echoes every submission once its script runs out
    #[must_use]
    pub fn new() -> Self {
        Self::with_fallback(MockReply::Echo)
    }

    /// A mock with a custom reply once its script runs out
    #[must_use]
    pub fn with_fallback(fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply
    #[must_use]
    pub fn then(self, reply: MockReply) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    /// Queue a raw reply body
    #[must_use]
    pub fn then_body(self, body: impl Into<String>) -> Self {
        self.then(MockReply::Body(body.into()))
    }

    /// Queue a transport failure
    #[must_use]
    pub fn then_failure(self, failure: TransportFailure) -> Self {
        self.then(MockReply::Failure(failure))
    }

    /// Every payload submitted so far
    #[must_use]
    pub fn sent(&self) -> Vec<Payload> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn echo_body(payload: &Payload) -> String {
    match FieldListEncoder::new().decode(&payload.message) {
        Ok(values) => elements_body(&values),
        Err(e) => format!("ISOParserException: {e}"),
    }
}

impl SutTransport for MockTransport {
    fn send(&self, payload: &Payload) -> std::result::Result<Response, TransportFailure> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());

        let reply = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            MockReply::Body(body) => Ok(Response::from_body(&body)),
            MockReply::Failure(failure) => Err(failure),
            MockReply::Echo => Ok(Response::from_body(&echo_body(payload))),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
