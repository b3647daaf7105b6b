//! Report rendering: GitHub-style table, JSON and CSV

use clap::ValueEnum;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::pipeline::{AnalysisReport, GroupSummary, SummaryOptions};

/// Domains listed per row in the table before eliding
pub const TABLE_DOMAIN_PREVIEW: usize = 2;

/// Domains listed per row in CSV before eliding
pub const CSV_DOMAIN_PREVIEW: usize = 3;

const HEADERS: [&str; 3] = ["Hash", "Count", "Domains"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Render `report` in `format`
pub fn render(
    report: &AnalysisReport,
    format: OutputFormat,
    options: SummaryOptions,
) -> serde_json::Result<String> {
    let rows = report.summaries(options);
    match format {
        OutputFormat::Table => Ok(render_table(&rows)),
        OutputFormat::Json => render_json(&rows),
        OutputFormat::Csv => Ok(render_csv(&rows)),
    }
}

/// "a, b, +N more (check json)"
fn preview(domains: &[String], limit: usize) -> String {
    let shown = domains.iter().take(limit).map(String::as_str).collect::<Vec<_>>();
    let mut text = shown.join(", ");
    if domains.len() > limit {
        text.push_str(&format!(", +{} more (check json)", domains.len() - limit));
    }
    text
}

pub fn render_table(rows: &[GroupSummary]) -> String {
    let cells: Vec<[String; 3]> = rows
        .iter()
        .map(|row| {
            [
                row.label.clone(),
                row.count.to_string(),
                preview(&row.domains, TABLE_DOMAIN_PREVIEW),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "| {:<w0$} | {:>w1$} | {:<w2$} |\n",
        HEADERS[0],
        HEADERS[1],
        HEADERS[2],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2]
    ));
    out.push_str(&format!(
        "|{}|{}:|{}|\n",
        "-".repeat(widths[0] + 2),
        "-".repeat(widths[1] + 1),
        "-".repeat(widths[2] + 2)
    ));
    for [label, count, domains] in &cells {
        out.push_str(&format!(
            "| {:<w0$} | {:>w1$} | {:<w2$} |\n",
            label,
            count,
            domains,
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        ));
    }
    out
}

#[derive(Serialize)]
struct JsonGroup<'a> {
    count: usize,
    domains: &'a [String],
}

/// Label-keyed object preserving row order
struct JsonReport<'a>(&'a [GroupSummary]);

impl Serialize for JsonReport<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for row in self.0 {
            map.serialize_entry(
                &row.label,
                &JsonGroup {
                    count: row.count,
                    domains: &row.domains,
                },
            )?;
        }
        map.end()
    }
}

pub fn render_json(rows: &[GroupSummary]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport(rows))
}

pub fn render_csv(rows: &[GroupSummary]) -> String {
    let mut lines = vec![HEADERS.join(",")];
    for row in rows {
        lines.push(format!(
            "{},{},{}",
            quote(&row.label),
            row.count,
            quote(&preview(&row.domains, CSV_DOMAIN_PREVIEW))
        ));
    }
    lines.join("\n")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
