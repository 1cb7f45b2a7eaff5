//! Report persistence
//!
//! Every artifact is written to a temporary file in the destination directory
//! and then renamed into place, so a reader never sees a partial report.

use crate::error::{Error, Result};
use crate::junit::JunitReport;
use crate::markdown::generate_markdown;
use crate::text::generate_text_report;
use iso_qa_runner::RunSummary;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Plain-text summary file name
pub const TEXT_FILE: &str = "report.txt";
/// Markdown report file name
pub const MARKDOWN_FILE: &str = "report.md";
/// JUnit XML file name
pub const JUNIT_FILE: &str = "junit.xml";
/// Flat evidence export file name
pub const EVIDENCE_FILE: &str = "evidence.json";
/// Full run summary file name, the input of a re-render
pub const SUMMARY_FILE: &str = "summary.json";

/// Rendered report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// `report.txt`
    Text,
    /// `report.md`
    Markdown,
    /// `junit.xml`
    Junit,
}

impl ReportFormat {
    /// All formats in write order
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Text, Self::Markdown, Self::Junit]
    }

    /// Output file name
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Text => TEXT_FILE,
            Self::Markdown => MARKDOWN_FILE,
            Self::Junit => JUNIT_FILE,
        }
    }

    /// Parse a comma-separated list such as `text,junit` or `all`
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFormat`] for an unrecognized name.
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        let mut formats = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let expanded = if name.eq_ignore_ascii_case("all") {
                Self::all().to_vec()
            } else {
                vec![name.parse()?]
            };
            for format in expanded {
                if !formats.contains(&format) {
                    formats.push(format);
                }
            }
        }
        Ok(formats)
    }
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "junit" | "xml" => Ok(Self::Junit),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Junit => "junit",
        };
        write!(f, "{name}")
    }
}

/// Writes the report set for a run into one directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    formats: Vec<ReportFormat>,
}

impl ReportWriter {
    /// Writer for every format
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            formats: ReportFormat::all().to_vec(),
        }
    }

    /// Restrict the rendered formats (the JSON exports are always written)
    #[must_use]
    pub fn with_formats(mut self, formats: Vec<ReportFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Output directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render and persist the reports, returning the written paths
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or any artifact
    /// cannot be rendered or persisted.
    pub fn write(&self, summary: &RunSummary) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)?;
        let mut written = Vec::with_capacity(self.formats.len() + 2);

        for format in &self.formats {
            let contents = match format {
                ReportFormat::Text => generate_text_report(summary),
                ReportFormat::Markdown => generate_markdown(summary),
                ReportFormat::Junit => JunitReport::default().generate(summary)?,
            };
            written.push(self.persist(format.file_name(), &contents)?);
        }

        let evidence = summary.evidence().to_json()?;
        written.push(self.persist(EVIDENCE_FILE, &evidence)?);
        let json = serde_json::to_string_pretty(summary)?;
        written.push(self.persist(SUMMARY_FILE, &json)?);

        tracing::info!(
            target: "iso_qa::report",
            dir = %self.output_dir.display(),
            files = written.len(),
            "reports written"
        );
        Ok(written)
    }

    fn persist(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        write_atomic(&path, contents)?;
        Ok(path)
    }
}

/// Write `contents` to `path` through a temporary file in the same directory,
/// creating the directory if needed
///
/// # Errors
///
/// Returns an error if the directory or temporary file cannot be created or
/// the rename fails.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    tracing::debug!(target: "iso_qa::report", path = %path.display(), "persisted");
    Ok(())
}

/// Load a run summary previously written as `summary.json`
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a run summary.
pub fn load_summary(path: &Path) -> Result<RunSummary> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{echoing_summary, passing_summary};
    use tempfile::TempDir;

    #[test]
    fn test_parse_format_list() {
        assert_eq!(
            ReportFormat::parse_list("text, junit").expect("parse"),
            vec![ReportFormat::Text, ReportFormat::Junit]
        );
        assert_eq!(
            ReportFormat::parse_list("all,text").expect("parse"),
            ReportFormat::all().to_vec()
        );
        assert!(ReportFormat::parse_list("").expect("parse").is_empty());
        assert!(matches!(
            ReportFormat::parse_list("text,pdf"),
            Err(Error::UnknownFormat(name)) if name == "pdf"
        ));
    }

    #[test]
    fn test_format_display_round_trips() {
        for format in ReportFormat::all() {
            assert_eq!(format.to_string().parse::<ReportFormat>().expect("parse"), format);
        }
    }

    #[test]
    fn test_write_all_formats() {
        let dir = TempDir::new().expect("temp dir");
        let out = dir.path().join("output");
        let written = ReportWriter::new(&out).write(&passing_summary()).expect("write");

        assert_eq!(written.len(), 5);
        for name in [TEXT_FILE, MARKDOWN_FILE, JUNIT_FILE, EVIDENCE_FILE, SUMMARY_FILE] {
            assert!(out.join(name).is_file(), "missing {name}");
        }
        let text = std::fs::read_to_string(out.join(TEXT_FILE)).expect("read");
        assert!(text.contains("Valid Data Test: PASSED"));
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = TempDir::new().expect("temp dir");
        ReportWriter::new(dir.path())
            .with_formats(vec![ReportFormat::Text])
            .write(&passing_summary())
            .expect("write");

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec![EVIDENCE_FILE, TEXT_FILE, SUMMARY_FILE]);
    }

    #[test]
    fn test_overwrite_existing_report() {
        let dir = TempDir::new().expect("temp dir");
        let writer = ReportWriter::new(dir.path()).with_formats(vec![ReportFormat::Text]);
        writer.write(&passing_summary()).expect("first write");
        writer.write(&echoing_summary()).expect("second write");

        let text = std::fs::read_to_string(dir.path().join(TEXT_FILE)).expect("read");
        assert!(text.contains("Pass Rate: 50.0%"));
    }

    #[test]
    fn test_load_summary_re_renders_identically() {
        let dir = TempDir::new().expect("temp dir");
        let summary = echoing_summary();
        ReportWriter::new(dir.path()).write(&summary).expect("write");

        let loaded = load_summary(&dir.path().join(SUMMARY_FILE)).expect("load");
        assert_eq!(generate_text_report(&loaded), generate_text_report(&summary));
    }

    #[test]
    fn test_evidence_export_is_flat_list() {
        let dir = TempDir::new().expect("temp dir");
        ReportWriter::new(dir.path())
            .with_formats(Vec::new())
            .write(&passing_summary())
            .expect("write");

        let text = std::fs::read_to_string(dir.path().join(EVIDENCE_FILE)).expect("read");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value.as_array().map(Vec::len), Some(5));
    }

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("catalog").join("fields.yaml");
        write_atomic(&path, "old\n").expect("first write");
        write_atomic(&path, "new\n").expect("second write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "new\n");
        let entries = std::fs::read_dir(path.parent().expect("parent")).expect("read dir").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_load_summary_rejects_garbage() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").expect("write");
        assert!(load_summary(&path).is_err());
    }
}
