//! ISO 8583 QA Report Generator
//!
//! Renders a [`iso_qa_runner::RunSummary`] as the plain-text summary,
//! Markdown and JUnit XML, and persists them atomically alongside JSON
//! exports of the evidence and the summary itself.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
// Allow common patterns
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::format_push_string)]
#![allow(clippy::needless_raw_string_hashes)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::option_if_let_else)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::redundant_closure_for_method_calls))]
#![cfg_attr(test, allow(clippy::redundant_clone))]

pub mod error;
pub mod junit;
pub mod markdown;
pub mod persist;
pub mod text;

#[cfg(test)]
mod fixtures;

pub use error::{Error, Result};
pub use junit::JunitReport;
pub use markdown::generate_markdown;
pub use persist::{
    load_summary, write_atomic, ReportFormat, ReportWriter, EVIDENCE_FILE, JUNIT_FILE,
    MARKDOWN_FILE, SUMMARY_FILE, TEXT_FILE,
};
pub use text::{generate_text_report, TITLE};
