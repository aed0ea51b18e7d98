// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Plain-text rendering of analysis results.

use std::fmt;

use crate::engine::Analysis;
use crate::metrics::PlanMetrics;
use crate::report::Report;

/// Width of a full flame-graph bar in characters.
const FLAME_WIDTH: usize = 40;

impl Report {
    /// Render the report as a human-readable text block.
    pub fn render_text(&self, metrics: &PlanMetrics) -> String {
        let mut out = String::new();

        out.push_str("=== PlanScope Analysis ===\n\n");
        out.push_str(&format!("Score: {}/100 (grade {})\n", self.score, self.grade));
        out.push_str(&format!(
            "Total Cost: {:.2} | Execution: {:.1}ms | Planning: {:.1}ms | Buffer Hit Rate: {:.1}%\n",
            metrics.max_cost,
            metrics.total_time_ms,
            metrics.planning_time_ms,
            metrics.buffer_hit_rate * 100.0
        ));
        if let Some(hot) = metrics.hottest_node() {
            out.push_str(&format!(
                "Hottest Node: #{} {} ({:.1}ms exclusive)\n",
                hot.node_id, hot.operator_type, hot.exclusive_time_ms
            ));
        }

        out.push_str("\n--- Issues ---\n");
        if self.issues.is_empty() {
            out.push_str("  (none)\n");
        }
        for issue in &self.issues {
            out.push_str(&format!(
                "  [{}] {} ({}, impact {})\n",
                issue.severity, issue.title, issue.category, issue.impact
            ));
            if let Some(relation) = &issue.affected_relation {
                out.push_str(&format!("    Relation: {}\n", relation));
            }
            out.push_str(&format!("    {}\n", issue.description));
            if let Some(fix) = &issue.suggested_fix {
                out.push_str(&format!("    Fix: {}\n", fix));
            }
        }

        if !self.index_recommendations.is_empty() {
            out.push_str("\n--- Index Recommendations ---\n");
            for rec in &self.index_recommendations {
                out.push_str(&format!("  * {}\n", rec.ddl_suggestion));
                out.push_str(&format!("    {}. {}\n", rec.reason, rec.estimated_gain_description));
            }
        }

        if !self.rewrite_suggestions.is_empty() {
            out.push_str("\n--- Rewrite Suggestions ---\n");
            for suggestion in &self.rewrite_suggestions {
                out.push_str(&format!("  * {}: {}\n", suggestion.title, suggestion.description));
                if let Some(sql) = &suggestion.example_sql {
                    for line in sql.lines() {
                        out.push_str(&format!("      {}\n", line));
                    }
                }
            }
        }

        out
    }
}

impl PlanMetrics {
    /// Render the flame graph as indented text bars.
    pub fn render_flame_graph(&self) -> String {
        let mut out = String::new();
        for bar in &self.flame_graph {
            let filled = (bar.width * FLAME_WIDTH as f64).round() as usize;
            out.push_str(&format!(
                "{:indent$}{:<width$} {:>9.2}ms  {}\n",
                "",
                "#".repeat(filled.min(FLAME_WIDTH)),
                bar.time_ms,
                bar.label,
                indent = bar.depth * 2,
                width = FLAME_WIDTH,
            ));
        }
        out
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.report.render_text(&self.metrics))
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::Analyzer;
    use crate::plan::{PlanDocument, PlanNode};

    #[test]
    fn test_render_text_lists_issues_and_fixes() {
        let root = PlanNode {
            relation_name: Some("orders".to_string()),
            actual_rows: 15_000.0,
            estimated_cost_total: 185.0,
            actual_time_total_ms: 12.0,
            ..PlanNode::new("Seq Scan")
        };
        let analysis = Analyzer::new()
            .analyze_document(PlanDocument::from_root(root))
            .unwrap();
        let text = analysis.to_string();
        assert!(text.contains("Score: 75/100 (grade B)"));
        assert!(text.contains("[danger] Full Table Scan Detected"));
        assert!(text.contains("Relation: orders"));
        assert!(text.contains("CREATE INDEX CONCURRENTLY idx_orders_column_name"));
        assert!(text.contains("Use Covering Indexes"));
        assert!(text.contains("Hottest Node: #0 Seq Scan"));
    }

    #[test]
    fn test_render_text_without_issues() {
        let analysis = Analyzer::new()
            .analyze_document(PlanDocument::from_root(PlanNode::new("Result")))
            .unwrap();
        let text = analysis.report.render_text(&analysis.metrics);
        assert!(text.contains("(none)"));
        assert!(!text.contains("Index Recommendations"));
    }

    #[test]
    fn test_flame_graph_indents_by_depth() {
        let root = PlanNode {
            actual_time_total_ms: 10.0,
            children: vec![PlanNode {
                actual_time_total_ms: 5.0,
                ..PlanNode::new("Sort")
            }],
            ..PlanNode::new("Limit")
        };
        let analysis = Analyzer::new()
            .analyze_document(PlanDocument::from_root(root))
            .unwrap();
        let flame = analysis.metrics.render_flame_graph();
        let lines: Vec<&str> = flame.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(&"#".repeat(40)));
        assert!(lines[1].starts_with("  ####################"));
        assert!(lines[1].ends_with("Sort"));
    }
}
