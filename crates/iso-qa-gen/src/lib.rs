//! ISO 8583 QA Plan Generator
//!
//! Schema-driven, single-fault mutation planning for message-field parsers.
//! Loads a field catalog, synthesizes an all-valid baseline, enumerates one
//! test case per declared invalid-value category, and judges SUT replies.
//!
//! # Design Philosophy
//!
//! Every test case is a falsifiable claim about the parser: "this invalid
//! value is rejected, and the parser recovers once it is restored". Exactly
//! one field differs from the baseline per submission, so a failure points
//! at one field and one category.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
// Allow common patterns
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::needless_raw_string_hashes)]
#![allow(clippy::module_name_repetitions)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::redundant_closure_for_method_calls))]
#![cfg_attr(test, allow(clippy::redundant_clone))]

pub mod baseline;
pub mod error;
pub mod extend;
pub mod oracle;
pub mod plan;
pub mod schema;
pub mod validator;

#[cfg(test)]
mod proptest_impl;

pub use baseline::{select_candidate, Baseline, BaselineSynthesizer, FieldValueMap};
pub use error::{ConfigError, Error, Result};
pub use extend::{CatalogExtender, Extension};
pub use oracle::{
    truncate, OracleOutcome, ParsedElement, Response, ResponseOracle, Verdict, ERROR_MARKERS,
};
pub use plan::{plan_for, Expectation, FieldPlan, Leg, TestCase, TestPlan, TestPlanGenerator};
pub use schema::{
    CandidateSource, Category, FieldFormat, FieldSpec, FieldType, InvalidExample, Schema,
    ValidationRules, UNKNOWN_DESCRIPTION,
};
pub use validator::{check_field, Rule, StructuralValidator, Violation};
