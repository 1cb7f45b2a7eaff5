//! ISO 8583 QA CLI
//!
//! Command-line interface for running field mutation conformance tests
//! against an ISO 8583 parser.

#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]

use clap::{Parser, Subcommand};
use iso_qa_cli::{
    build_run_config, build_transport, execute_run, extend_schema, generate_plan, init_logging,
    load_schema, render_document, rerender_reports, resolve_log_level, run_exit_code,
    synthesize_baseline, validate_baseline, write_reports, write_text_file, DocumentFormat,
    RunOptions, LOG_LEVEL_ENV,
};
use iso_qa_report::generate_text_report;
use iso_qa_runner::{DEFAULT_TIMEOUT_MS, DEFAULT_URL};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "iso-qa")]
#[command(about = "ISO 8583 field mutation conformance runner", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace, off); falls back to ISO_QA_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every test case of a schema against the parser
    Run {
        /// Path to the field schema (JSON or YAML)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Parser endpoint
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,

        /// Timeout per request in milliseconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
        timeout: u64,

        /// Use the in-process simulated parser instead of HTTP
        #[arg(long)]
        simulate: bool,

        /// Dry run (print the plan, send nothing)
        #[arg(long)]
        dry_run: bool,

        /// Structurally check the baseline before the first submission
        #[arg(long)]
        preflight: bool,

        /// Output directory for reports
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Report formats (comma-separated: text, markdown, junit, all)
        #[arg(long, default_value = "all")]
        formats: String,

        /// Suppress per-case progress lines
        #[arg(short, long)]
        quiet: bool,

        /// Exit with status 2 if the baseline or any test case failed
        #[arg(long)]
        fail_on_error: bool,
    },

    /// Print the test plan for a schema
    Plan {
        /// Path to the field schema
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Output format (yaml, json)
        #[arg(long, default_value = "yaml")]
        format: String,
    },

    /// Print the all-valid baseline for a schema
    Baseline {
        /// Path to the field schema
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,
    },

    /// Structurally check the baseline against the schema's validation rules
    Validate {
        /// Path to the field schema
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,
    },

    /// Add derived exemplars and validation rules to a field catalog
    Extend {
        /// Path to the field catalog
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Output file (printed to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-render reports from a saved summary.json
    Report {
        /// Path to summary.json
        #[arg(value_name = "SUMMARY")]
        summary: PathBuf,

        /// Output directory for reports
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Report formats (comma-separated: text, markdown, junit, all)
        #[arg(long, default_value = "all")]
        formats: String,
    },
}

/// Exit with 130 on SIGINT without writing a report
fn setup_signal_handler() {
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nSIGINT received, aborting run. No report written.");
        std::process::exit(130); // 128 + SIGINT(2)
    }) {
        eprintln!("Warning: Failed to set signal handler: {e}");
    }
}

fn main() {
    let cli = Cli::parse();

    let env_level = std::env::var(LOG_LEVEL_ENV).ok();
    match resolve_log_level(cli.log_level.as_deref(), env_level.as_deref()) {
        Ok(level) => init_logging(level),
        Err(e) => fail(&e),
    }
    setup_signal_handler();

    match cli.command {
        Commands::Run {
            schema,
            url,
            timeout,
            simulate,
            dry_run,
            preflight,
            output,
            formats,
            quiet,
            fail_on_error,
        } => {
            let options = RunOptions {
                url,
                timeout_ms: timeout,
                simulate,
                dry_run,
                preflight,
                quiet,
            };
            run_schema(&schema, &options, &output, &formats, fail_on_error);
        }
        Commands::Plan { schema, format } => print_plan(&schema, &format),
        Commands::Baseline { schema } => print_baseline(&schema),
        Commands::Validate { schema } => validate(&schema),
        Commands::Extend { schema, output } => extend(&schema, output.as_deref()),
        Commands::Report {
            summary,
            output,
            formats,
        } => match rerender_reports(&summary, &output, &formats) {
            Ok(paths) => print_written(&output, &paths),
            Err(e) => fail(&e),
        },
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn run_schema(
    schema_path: &Path,
    options: &RunOptions,
    output_dir: &Path,
    formats: &str,
    fail_on_error: bool,
) {
    let schema = load_schema(schema_path).unwrap_or_else(|e| fail(&e));
    let transport = build_transport(options, &schema).unwrap_or_else(|e| fail(&e));

    println!("Schema: {} ({} field(s))", schema_path.display(), schema.len());
    println!("Transport: {}", transport.name());
    if options.dry_run {
        println!("[DRY RUN] Nothing will be sent");
    }
    println!();

    let summary = execute_run(&schema, transport.as_ref(), build_run_config(options));

    if options.dry_run {
        return;
    }

    println!();
    print!("{}", generate_text_report(&summary));

    match write_reports(&summary, output_dir, formats) {
        Ok(paths) => print_written(output_dir, &paths),
        Err(e) => fail(&e),
    }

    std::process::exit(run_exit_code(&summary, fail_on_error));
}

fn print_written(output_dir: &Path, paths: &[PathBuf]) {
    println!("\nReports written to {}:", output_dir.display());
    for path in paths {
        println!("  {}", path.display());
    }
}

fn print_plan(schema_path: &Path, format: &str) {
    let schema = load_schema(schema_path).unwrap_or_else(|e| fail(&e));
    let format = DocumentFormat::parse(format).unwrap_or_else(|e| fail(&e));
    let plan = generate_plan(&schema);
    match format.render(&plan) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(&e),
    }
}

fn print_baseline(schema_path: &Path) {
    let schema = load_schema(schema_path).unwrap_or_else(|e| fail(&e));
    let baseline = synthesize_baseline(&schema);
    for error in &baseline.config_errors {
        eprintln!("Warning: {error}");
    }
    match DocumentFormat::Json.render(&baseline.values) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(&e),
    }
}

fn validate(schema_path: &Path) {
    let schema = load_schema(schema_path).unwrap_or_else(|e| fail(&e));
    for error in schema.config_errors() {
        eprintln!("Warning: {error}");
    }
    let violations = validate_baseline(&schema);
    if violations.is_empty() {
        println!("Baseline passes all validation rules ({} field(s))", schema.len());
        return;
    }
    for violation in &violations {
        println!("{violation}");
    }
    eprintln!("{} violation(s)", violations.len());
    std::process::exit(1);
}

fn extend(schema_path: &Path, output: Option<&Path>) {
    let schema = load_schema(schema_path).unwrap_or_else(|e| fail(&e));
    let extension = extend_schema(&schema);
    let format = DocumentFormat::for_path(output.unwrap_or(schema_path));
    let text = render_document(&extension.document, format).unwrap_or_else(|e| fail(&e));

    match output {
        Some(path) => {
            write_text_file(path, &text).unwrap_or_else(|e| fail(&e));
            println!("Added {} entr(ies), written to {}", extension.added.len(), path.display());
        }
        None => {
            println!("{text}");
            eprintln!("Added {} entr(ies)", extension.added.len());
        }
    }
}
