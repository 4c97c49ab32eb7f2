//! Output formatting for finished reports

use crate::report::{Report, ReportResult};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Machine-readable, the same shape as `GET /reports/{id}`
    Json,
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, report: &Report) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_json(report),
            OutputFormat::Human => self.format_human(report),
        }
    }

    fn format_json(&self, report: &Report) -> Result<String> {
        let output = serde_json::json!({
            "metadata": report,
            "analysis_result": report.result,
        });
        serde_json::to_string_pretty(&output).context("Failed to serialize report to JSON")
    }

    fn format_human(&self, report: &Report) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "Report {}", report.report_id)?;
        writeln!(out, "  Repository: {}", report.source_url)?;
        writeln!(
            out,
            "  Target:     {}",
            report.target_platform.as_deref().unwrap_or("Not Specified")
        )?;
        writeln!(out, "  Status:     {}", report.status)?;
        writeln!(
            out,
            "  Updated:    {}",
            report.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        if let Some(error) = &report.error_message {
            writeln!(out, "  Error:      {}", error)?;
        }

        match &report.result {
            Some(ReportResult::Structured(map)) => {
                writeln!(out)?;
                let pretty = serde_json::to_string_pretty(&Value::Object(map.clone()))
                    .context("Failed to serialize analysis result")?;
                writeln!(out, "{}", pretty)?;
            }
            Some(ReportResult::Raw(text)) => {
                writeln!(out)?;
                writeln!(out, "{}", text)?;
            }
            None => {}
        }
        Ok(out)
    }
}
