//! ISO 8583 QA Runner
//!
//! Encodes field maps, delivers them to the system under test and drives the
//! mutate/reject/restore/accept loop over a test plan.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
// Allow common patterns
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::unused_self)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::module_name_repetitions)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::redundant_closure_for_method_calls))]
#![cfg_attr(test, allow(clippy::redundant_clone))]
#![cfg_attr(test, allow(clippy::uninlined_format_args))]

pub mod encoder;
pub mod error;
pub mod evidence;
pub mod orchestrator;
pub mod transport;

pub use encoder::{FieldListEncoder, MessageEncoder, Payload, MESSAGE_PREFIX};
pub use error::{Error, Result};
pub use evidence::{Evidence, EvidenceCollector, HostInfo, Outcome};
pub use orchestrator::{CaseRecord, FieldReport, Orchestrator, RunConfig, RunSummary};
pub use transport::{
    HttpTransport, HttpTransportConfig, MockReply, MockTransport, SimulatedTransport,
    SutTransport, TransportFailure, DEFAULT_TIMEOUT_MS, DEFAULT_URL,
};
