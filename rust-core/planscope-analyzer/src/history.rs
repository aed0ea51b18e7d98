// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! Analysis history.
//!
//! An append-only log of past analyses owned by the caller. The engine
//! itself keeps no history; a dashboard that wants a "recent analyses"
//! panel or a score trend per query records each [`Analysis`] here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::Analysis;
use crate::report::{Grade, Severity};

/// One recorded analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEntry {
    /// When the analysis was recorded.
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied label, typically the query text.
    pub label: Option<String>,
    /// Plan shape fingerprint.
    pub fingerprint: String,
    pub score: u8,
    pub grade: Grade,
    pub danger_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    /// Total execution time in milliseconds.
    pub total_time_ms: f64,
}

/// Aggregate view over the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub count: usize,
    pub mean_score: f64,
    pub best_score: u8,
    pub worst_score: u8,
    pub latest_grade: Grade,
    /// Distinct plan shapes seen.
    pub distinct_plans: usize,
}

/// Append-only analysis log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisLog {
    entries: Vec<AnalysisEntry>,
}

impl AnalysisLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an analysis and return the stored entry.
    pub fn record(&mut self, label: Option<&str>, analysis: &Analysis) -> &AnalysisEntry {
        let report = &analysis.report;
        self.entries.push(AnalysisEntry {
            timestamp: Utc::now(),
            label: label.map(str::to_string),
            fingerprint: analysis.fingerprint.clone(),
            score: report.score,
            grade: report.grade,
            danger_count: report.count(Severity::Danger),
            warning_count: report.count(Severity::Warning),
            info_count: report.count(Severity::Info),
            total_time_ms: analysis.metrics.total_time_ms,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[AnalysisEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<&AnalysisEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    /// Scores recorded for one plan shape, oldest first.
    pub fn score_trend(&self, fingerprint: &str) -> Vec<u8> {
        self.entries
            .iter()
            .filter(|e| e.fingerprint == fingerprint)
            .map(|e| e.score)
            .collect()
    }

    /// Summary statistics, or `None` for an empty log.
    pub fn summary(&self) -> Option<AnalysisSummary> {
        let latest = self.entries.last()?;
        let count = self.entries.len();
        let total: u64 = self.entries.iter().map(|e| e.score as u64).sum();
        let mut fingerprints: Vec<&str> =
            self.entries.iter().map(|e| e.fingerprint.as_str()).collect();
        fingerprints.sort_unstable();
        fingerprints.dedup();

        Some(AnalysisSummary {
            count,
            mean_score: total as f64 / count as f64,
            best_score: self.entries.iter().map(|e| e.score).max().unwrap_or(0),
            worst_score: self.entries.iter().map(|e| e.score).min().unwrap_or(0),
            latest_grade: latest.grade,
            distinct_plans: fingerprints.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Analyzer;
    use crate::plan::{PlanDocument, PlanNode};

    fn analysis(rows: f64) -> Analysis {
        let root = PlanNode {
            relation_name: Some("orders".to_string()),
            actual_rows: rows,
            ..PlanNode::new("Seq Scan")
        };
        Analyzer::new()
            .analyze_document(PlanDocument::from_root(root))
            .unwrap()
    }

    #[test]
    fn test_empty_log_has_no_summary() {
        let log = AnalysisLog::new();
        assert!(log.is_empty());
        assert!(log.summary().is_none());
    }

    #[test]
    fn test_record_and_summarize() {
        let mut log = AnalysisLog::new();
        let entry = log.record(Some("SELECT * FROM orders"), &analysis(15_000.0));
        assert_eq!(entry.score, 75);
        assert_eq!(entry.danger_count, 1);
        log.record(None, &analysis(10.0));

        let summary = log.summary().unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.best_score, 100);
        assert_eq!(summary.worst_score, 75);
        assert!((summary.mean_score - 87.5).abs() < f64::EPSILON);
        assert_eq!(summary.latest_grade, Grade::A);
        // Same shape, different row counts.
        assert_eq!(summary.distinct_plans, 1);
    }

    #[test]
    fn test_score_trend_and_recent() {
        let mut log = AnalysisLog::new();
        let slow = analysis(15_000.0);
        log.record(Some("first"), &slow);
        log.record(Some("second"), &analysis(10.0));
        log.record(Some("third"), &slow);

        assert_eq!(log.score_trend(&slow.fingerprint), vec![75, 100, 75]);
        assert!(log.score_trend("unknown").is_empty());

        let recent: Vec<Option<&str>> = log
            .recent(2)
            .iter()
            .map(|e| e.label.as_deref())
            .collect();
        assert_eq!(recent, vec![Some("third"), Some("second")]);
    }
}
