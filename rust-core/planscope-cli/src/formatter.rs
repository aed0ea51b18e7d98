// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! Output formatters for analysis results.
//!
//! Supports three output modes:
//! - **Table**: Colored tables using `comfy-table`.
//! - **Text**: The analyzer's plain-text rendering.
//! - **JSON**: Pretty-printed report, metrics and fingerprint.

use colored::{ColoredString, Colorize};
use comfy_table::{Cell, ContentArrangement, Table};
use planscope_analyzer::{Analysis, Grade, PlanMetrics, Report, Severity};
use std::fmt;

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Unknown format '{other}'. Valid formats: table, text, json"
            )),
        }
    }
}

/// Optional sections appended after the report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sections {
    pub flame_graph: bool,
    pub breakdown: bool,
}

/// Format an analysis according to the selected output format.
pub fn format_analysis(analysis: &Analysis, format: OutputFormat, sections: Sections) -> String {
    match format {
        OutputFormat::Json => format_json(analysis),
        OutputFormat::Text => {
            let mut out = analysis.report.render_text(&analysis.metrics);
            append_sections(&mut out, &analysis.metrics, sections, false);
            out
        }
        OutputFormat::Table => {
            let mut out = format_tables(&analysis.report, &analysis.metrics);
            append_sections(&mut out, &analysis.metrics, sections, true);
            out
        }
    }
}

/// Pretty-print the whole analysis with 2-space indentation.
fn format_json(analysis: &Analysis) -> String {
    serde_json::to_string_pretty(analysis).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn append_sections(out: &mut String, metrics: &PlanMetrics, sections: Sections, tables: bool) {
    if sections.breakdown {
        out.push_str("\nOperator breakdown\n");
        if tables {
            out.push_str(&breakdown_table(metrics));
            out.push('\n');
        } else {
            for op in &metrics.operator_breakdown {
                out.push_str(&format!(
                    "  {:<20} x{:<3} {:>10.2}ms ({:>5.1}%)  cost {:>10.2} ({:>5.1}%)\n",
                    op.operator_type,
                    op.node_count,
                    op.exclusive_time_ms,
                    op.time_share * 100.0,
                    op.exclusive_cost,
                    op.cost_share * 100.0
                ));
            }
        }
    }
    if sections.flame_graph {
        out.push_str("\nFlame graph\n");
        out.push_str(&metrics.render_flame_graph());
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Danger => "DANGER".red().bold(),
        Severity::Warning => "WARNING".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    }
}

fn grade_label(grade: Grade) -> ColoredString {
    let text = grade.to_string();
    match grade {
        Grade::A | Grade::B => text.bright_green().bold(),
        Grade::C => text.yellow().bold(),
        Grade::D | Grade::F => text.red().bold(),
    }
}

/// Render the report as a summary line plus one table per section.
fn format_tables(report: &Report, metrics: &PlanMetrics) -> String {
    let mut out = format!(
        "Score {}/100  Grade {}  |  cost {:.2}  |  {:.1}ms  |  buffer hit {:.1}%\n",
        report.score,
        grade_label(report.grade),
        metrics.max_cost,
        metrics.total_time_ms,
        metrics.buffer_hit_rate * 100.0
    );

    if report.issues.is_empty() {
        out.push_str(&format!("\n{}\n", "No issues detected.".bright_green()));
    } else {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Severity"),
            Cell::new("Category"),
            Cell::new("Issue"),
            Cell::new("Relation"),
            Cell::new("Impact"),
            Cell::new("Fix"),
        ]);
        for issue in &report.issues {
            table.add_row(vec![
                Cell::new(severity_label(issue.severity)),
                Cell::new(issue.category),
                Cell::new(&issue.title),
                Cell::new(issue.affected_relation.as_deref().unwrap_or("-")),
                Cell::new(issue.impact),
                Cell::new(issue.suggested_fix.as_deref().unwrap_or("-")),
            ]);
        }
        out.push_str(&format!("\n{table}\n"));
    }

    if !report.index_recommendations.is_empty() {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![Cell::new("Table"), Cell::new("DDL"), Cell::new("Why")]);
        for rec in &report.index_recommendations {
            table.add_row(vec![
                Cell::new(&rec.table),
                Cell::new(&rec.ddl_suggestion),
                Cell::new(format!("{}. {}", rec.reason, rec.estimated_gain_description)),
            ]);
        }
        out.push_str(&format!("\nIndex recommendations\n{table}\n"));
    }

    if !report.rewrite_suggestions.is_empty() {
        out.push_str("\nRewrite suggestions\n");
        for suggestion in &report.rewrite_suggestions {
            out.push_str(&format!("  {} {}\n", "*".bold(), suggestion.title.bold()));
            out.push_str(&format!("    {}\n", suggestion.description));
            if let Some(sql) = &suggestion.example_sql {
                for line in sql.lines() {
                    out.push_str(&format!("      {}\n", line.dimmed()));
                }
            }
        }
    }

    out
}

fn breakdown_table(metrics: &PlanMetrics) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Operator"),
        Cell::new("Nodes"),
        Cell::new("Self time (ms)"),
        Cell::new("Time %"),
        Cell::new("Self cost"),
        Cell::new("Cost %"),
    ]);
    for op in &metrics.operator_breakdown {
        table.add_row(vec![
            Cell::new(&op.operator_type),
            Cell::new(op.node_count),
            Cell::new(format!("{:.2}", op.exclusive_time_ms)),
            Cell::new(format!("{:.1}", op.time_share * 100.0)),
            Cell::new(format!("{:.2}", op.exclusive_cost)),
            Cell::new(format!("{:.1}", op.cost_share * 100.0)),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use planscope_analyzer::{Analyzer, PlanDocument, PlanNode};

    fn sample() -> Analysis {
        colored::control::set_override(false);
        let root = PlanNode {
            relation_name: Some("orders".to_string()),
            actual_rows: 15_000.0,
            estimated_cost_total: 185.0,
            actual_time_total_ms: 20.0,
            ..PlanNode::new("Seq Scan")
        };
        Analyzer::new()
            .analyze_document(PlanDocument::from_root(root))
            .unwrap()
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("TABLE".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_table_output_lists_issue_and_ddl() {
        let out = format_analysis(&sample(), OutputFormat::Table, Sections::default());
        assert!(out.contains("Score 75/100"));
        assert!(out.contains("DANGER"));
        assert!(out.contains("Full Table Scan Detected"));
        assert!(out.contains("idx_orders_column_name"));
        assert!(!out.contains("Flame graph"));
    }

    #[test]
    fn test_json_output_roundtrips() {
        let out = format_analysis(&sample(), OutputFormat::Json, Sections::default());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["report"]["score"], 75);
        assert_eq!(value["report"]["grade"], "B");
        assert!(value["fingerprint"].as_str().unwrap().len() == 64);
    }

    #[test]
    fn test_optional_sections() {
        let sections = Sections {
            flame_graph: true,
            breakdown: true,
        };
        let out = format_analysis(&sample(), OutputFormat::Text, sections);
        assert!(out.contains("Operator breakdown"));
        assert!(out.contains("Flame graph"));
        assert!(out.contains("Seq Scan on orders"));
    }
}
