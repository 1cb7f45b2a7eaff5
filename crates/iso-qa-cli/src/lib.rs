//! ISO 8583 QA CLI Library
//!
//! Library functions for the `iso-qa` command-line tool. Errors are returned
//! as display strings; `main` decides the exit code.

#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::fn_params_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
// Allow common patterns in test code
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

use iso_qa_gen::{
    plan_for, Baseline, BaselineSynthesizer, CatalogExtender, Extension, Schema,
    StructuralValidator, TestPlan, Violation,
};
use iso_qa_report::{ReportFormat, ReportWriter};
use iso_qa_runner::{
    HttpTransport, HttpTransportConfig, Orchestrator, RunConfig, RunSummary, SimulatedTransport,
    SutTransport,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

/// Environment variable consulted when `--log-level` is not given
pub const LOG_LEVEL_ENV: &str = "ISO_QA_LOG_LEVEL";

/// Exit code when `--fail-on-error` is set and a scored submission failed
pub const EXIT_TEST_FAILURES: i32 = 2;

/// Serialization format for documents written by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// YAML
    Yaml,
    /// Pretty-printed JSON
    Json,
}

impl DocumentFormat {
    /// Parse `yaml`/`yml` or `json`
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown format: {other}")),
        }
    }

    /// Format implied by a file extension, JSON unless `.yaml`/`.yml`
    pub fn for_path(path: &Path) -> Self {
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::Yaml
        } else {
            Self::Json
        }
    }

    /// Serialize a value in this format
    pub fn render<T: serde::Serialize>(self, value: &T) -> Result<String, String> {
        match self {
            Self::Yaml => serde_yaml::to_string(value).map_err(|e| format!("Error serializing YAML: {e}")),
            Self::Json => {
                serde_json::to_string_pretty(value).map_err(|e| format!("Error serializing JSON: {e}"))
            }
        }
    }
}

/// Resolve the log level from the flag, then the environment, default `warn`
pub fn resolve_log_level(flag: Option<&str>, env: Option<&str>) -> Result<LevelFilter, String> {
    let Some(level) = flag.or(env).map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(LevelFilter::WARN);
    };
    level
        .parse::<LevelFilter>()
        .map_err(|_| format!("Unknown log level: {level}"))
}

/// Install the stderr `fmt` subscriber
pub fn init_logging(level: LevelFilter) {
    if let Err(e) = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
    {
        eprintln!("Warning: Failed to install log subscriber: {e}");
    }
}

/// Load a schema from a file path
pub fn load_schema(path: &Path) -> Result<Schema, String> {
    let schema = Schema::from_file(path).map_err(|e| format!("Error loading schema: {e}"))?;
    tracing::info!(
        target: "iso_qa::schema",
        path = %path.display(),
        fields = schema.len(),
        fingerprint = %schema.fingerprint(),
        "schema loaded"
    );
    Ok(schema)
}

/// Options of the `run` subcommand that shape the run itself
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// SUT endpoint
    pub url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Use the in-process simulated SUT
    pub simulate: bool,
    /// Print the plan without contacting the SUT
    pub dry_run: bool,
    /// Structurally check the baseline first
    pub preflight: bool,
    /// Suppress per-case progress lines
    pub quiet: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        let http = HttpTransportConfig::default();
        Self {
            url: http.url,
            timeout_ms: http.timeout_ms,
            simulate: false,
            dry_run: false,
            preflight: false,
            quiet: false,
        }
    }
}

/// Map CLI options onto the runner configuration
pub fn build_run_config(options: &RunOptions) -> RunConfig {
    RunConfig {
        dry_run: options.dry_run,
        preflight: options.preflight,
        progress: !options.quiet,
    }
}

/// Build the transport selected by the options
pub fn build_transport(options: &RunOptions, schema: &Schema) -> Result<Box<dyn SutTransport>, String> {
    if options.simulate {
        return Ok(Box::new(SimulatedTransport::new(schema.clone())));
    }
    let config = HttpTransportConfig {
        url: options.url.clone(),
        timeout_ms: options.timeout_ms,
    };
    let transport = HttpTransport::new(config).map_err(|e| format!("Error creating transport: {e}"))?;
    Ok(Box::new(transport))
}

/// Run every case of a schema's plan against a transport
pub fn execute_run(schema: &Schema, transport: &dyn SutTransport, config: RunConfig) -> RunSummary {
    let plan = plan_for(schema);
    Orchestrator::new(schema, transport).with_config(config).run(&plan)
}

/// Build the test plan for a schema
pub fn generate_plan(schema: &Schema) -> TestPlan {
    plan_for(schema)
}

/// Build the all-valid baseline for a schema
pub fn synthesize_baseline(schema: &Schema) -> Baseline {
    BaselineSynthesizer::new(schema).synthesize()
}

/// Structurally check a schema's baseline
pub fn validate_baseline(schema: &Schema) -> Vec<Violation> {
    let baseline = synthesize_baseline(schema);
    StructuralValidator::new(schema).check(&baseline.values)
}

/// Extend the catalog a schema was loaded from
pub fn extend_schema(schema: &Schema) -> Extension {
    CatalogExtender::new().extend(schema.document())
}

/// Render an extended catalog for writing
pub fn render_document(document: &Map<String, Value>, format: DocumentFormat) -> Result<String, String> {
    format.render(document)
}

/// Persist the report set for a run
pub fn write_reports(summary: &RunSummary, output_dir: &Path, formats: &str) -> Result<Vec<PathBuf>, String> {
    let formats = ReportFormat::parse_list(formats).map_err(|e| e.to_string())?;
    ReportWriter::new(output_dir)
        .with_formats(formats)
        .write(summary)
        .map_err(|e| format!("Error writing reports: {e}"))
}

/// Re-render reports from a saved `summary.json`
pub fn rerender_reports(summary_path: &Path, output_dir: &Path, formats: &str) -> Result<Vec<PathBuf>, String> {
    let summary = iso_qa_report::load_summary(summary_path)
        .map_err(|e| format!("Error reading run summary: {e}"))?;
    write_reports(&summary, output_dir, formats)
}

/// Process exit code for a finished run
pub fn run_exit_code(summary: &RunSummary, fail_on_error: bool) -> i32 {
    if fail_on_error && !summary.dry_run && !summary.is_success() {
        EXIT_TEST_FAILURES
    } else {
        0
    }
}

/// Write text to a file atomically, creating parent directories
pub fn write_text_file(path: &Path, contents: &str) -> Result<(), String> {
    iso_qa_report::write_atomic(path, contents)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))
}
