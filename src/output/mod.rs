use std::path::Path;

use anyhow::Context;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::pipeline::PipelineReport;
use crate::Result;

pub fn render(report: &PipelineReport, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(report)),
        OutputFormat::Json => format_as_json(report),
        OutputFormat::Markdown => Ok(format_as_markdown(report)),
    }
}

pub async fn save_to_file(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub fn print_to_console(content: &str) {
    println!("{content}");
}

fn format_as_text(report: &PipelineReport) -> String {
    let mut out = String::new();
    out.push_str("Transcript\n");
    out.push_str("----------\n");
    out.push_str(&report.transcript);
    out.push('\n');

    if let Some(bundle) = &report.bundle {
        out.push_str("\nSuggested post\n");
        out.push_str("--------------\n");
        out.push_str(&format!("Title: {}\n", bundle.title));
        out.push_str(&format!("Caption: {}\n", bundle.caption));
        if !bundle.hashtags.is_empty() {
            out.push_str(&format!("Hashtags: {}\n", bundle.hashtags.join(" ")));
        }
    }

    if let Some(warning) = &report.warning {
        out.push_str(&format!("\nWarning: {warning}\n"));
    }

    out
}

fn format_as_json(report: &PipelineReport) -> Result<String> {
    let value = json!({
        "run_id": report.run_id.to_string(),
        "completed_at": report.completed_at.to_rfc3339(),
        "transcript": &report.transcript,
        "bundle": &report.bundle,
        "warning": &report.warning,
    });
    serde_json::to_string_pretty(&value).context("Failed to serialize the report as JSON")
}

fn format_as_markdown(report: &PipelineReport) -> String {
    let mut out = String::new();
    out.push_str("## Transcript\n\n");
    out.push_str(&report.transcript);
    out.push('\n');

    if let Some(bundle) = &report.bundle {
        out.push_str("\n## Suggested post\n\n");
        out.push_str(&format!("**Title:** {}\n\n", bundle.title));
        out.push_str(&format!("**Caption:** {}\n\n", bundle.caption));
        if !bundle.hashtags.is_empty() {
            out.push_str(&format!("**Hashtags:** {}\n", bundle.hashtags.join(" ")));
        }
    }

    if let Some(warning) = &report.warning {
        out.push_str(&format!("\n> Warning: {warning}\n"));
    }

    out
}
