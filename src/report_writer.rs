//! Report output.
//!
//! Serializes an [`AnalysisReport`] as pretty JSON or YAML, either to a file
//! (parent directories created as needed) or to any writer.

use std::fmt;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::pipeline::AnalysisReport;

/// Serialization format of a written report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl ReportFormat {
    /// File extension for this format
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(AnalysisError::InvalidConfig(format!("unknown report format: {other}"))),
        }
    }
}

/// Write `report` to `writer` in `format`
pub fn write_report<W: Write>(report: &AnalysisReport, format: ReportFormat, mut writer: W) -> Result<()> {
    match format {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, report)?;
            writeln!(writer)?;
        },
        ReportFormat::Yaml => serde_yaml::to_writer(&mut writer, report)?,
    }
    writer.flush()?;
    Ok(())
}

/// Write `report` to the file at `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created or the report
/// cannot be serialized.
pub fn write_report_file(report: &AnalysisReport, format: ReportFormat, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_report(report, format, BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Analyzer;
    use chrono::{TimeZone, Utc};

    fn empty_report() -> AnalysisReport {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Analyzer::default().analyze(&[], now)
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("yml".parse::<ReportFormat>().unwrap(), ReportFormat::Yaml);
        assert!("csv".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_json_report_contains_diagnostics() {
        let mut buffer = Vec::new();
        write_report(&empty_report(), ReportFormat::Json, &mut buffer).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["diagnostics"]["rows_read"], 0);
        assert_eq!(value["filter"], "all");
    }

    #[test]
    fn test_yaml_report_to_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.yaml");
        write_report_file(&empty_report(), ReportFormat::Yaml, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("diagnostics:"));
    }
}
