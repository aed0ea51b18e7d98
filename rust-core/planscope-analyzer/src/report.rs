// SPDX-License-Identifier: PMPL-1.0-or-later
//! Diagnostic report types and query scoring.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Points deducted per `danger` issue.
const DANGER_PENALTY: u32 = 25;

/// Points deducted per `warning` issue.
const WARNING_PENALTY: u32 = 10;

/// Issue severity. Declaration order is the report's sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Danger,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Danger => write!(f, "danger"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Expected performance impact of fixing an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Impact::Low => write!(f, "LOW"),
            Impact::Medium => write!(f, "MEDIUM"),
            Impact::High => write!(f, "HIGH"),
        }
    }
}

/// Area of the database an issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCategory {
    Indexing,
    Statistics,
    Memory,
    Joins,
    Filtering,
    Parallelism,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueCategory::Indexing => write!(f, "Indexing"),
            IssueCategory::Statistics => write!(f, "Statistics"),
            IssueCategory::Memory => write!(f, "Memory"),
            IssueCategory::Joins => write!(f, "Joins"),
            IssueCategory::Filtering => write!(f, "Filtering"),
            IssueCategory::Parallelism => write!(f, "Parallelism"),
        }
    }
}

/// One detected anti-pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub title: String,
    pub description: String,
    pub affected_relation: Option<String>,
    pub impact: Impact,
    /// Ready-to-run SQL, when the fix is mechanical.
    pub suggested_fix: Option<String>,
}

/// A suggested index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecommendation {
    pub table: String,
    pub ddl_suggestion: String,
    pub reason: String,
    pub estimated_gain_description: String,
}

/// A query or maintenance rewrite that applies to the plan as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteSuggestion {
    pub title: String,
    pub description: String,
    pub example_sql: Option<String>,
}

/// Letter grade derived from the query score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Step function: >=90 A, >=75 B, >=60 C, >=45 D, otherwise F.
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Grade::A,
            75..=89 => Grade::B,
            60..=74 => Grade::C,
            45..=59 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::A => write!(f, "A"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
            Grade::D => write!(f, "D"),
            Grade::F => write!(f, "F"),
        }
    }
}

/// `max(0, 100 - 25 * danger - 10 * warning)`. Info issues are free.
pub fn query_score(danger_count: usize, warning_count: usize) -> u8 {
    let penalty = (danger_count as u64)
        .saturating_mul(DANGER_PENALTY as u64)
        .saturating_add((warning_count as u64).saturating_mul(WARNING_PENALTY as u64));
    100u64.saturating_sub(penalty) as u8
}

/// Output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Issues sorted by severity, traversal order within a severity.
    pub issues: Vec<Issue>,
    pub index_recommendations: Vec<IndexRecommendation>,
    pub rewrite_suggestions: Vec<RewriteSuggestion>,
    /// Query score, 0 to 100.
    pub score: u8,
    pub grade: Grade,
}

impl Report {
    /// Assemble a report, sorting issues and deriving score and grade.
    pub fn new(
        mut issues: Vec<Issue>,
        index_recommendations: Vec<IndexRecommendation>,
        rewrite_suggestions: Vec<RewriteSuggestion>,
    ) -> Self {
        // Stable: traversal order survives within each severity.
        issues.sort_by_key(|issue| issue.severity);
        let danger = issues.iter().filter(|i| i.severity == Severity::Danger).count();
        let warning = issues.iter().filter(|i| i.severity == Severity::Warning).count();
        let score = query_score(danger, warning);
        Self {
            issues,
            index_recommendations,
            rewrite_suggestions,
            score,
            grade: Grade::from_score(score),
        }
    }

    /// Number of issues with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Whether any issue falls in `category`.
    pub fn has_category(&self, category: IssueCategory) -> bool {
        self.issues.iter().any(|i| i.category == category)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Report(score={}, grade={}, danger={}, warning={}, info={})",
            self.score,
            self.grade,
            self.count(Severity::Danger),
            self.count(Severity::Warning),
            self.count(Severity::Info)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity, title: &str) -> Issue {
        Issue {
            severity,
            category: IssueCategory::Indexing,
            title: title.to_string(),
            description: String::new(),
            affected_relation: None,
            impact: Impact::Low,
            suggested_fix: None,
        }
    }

    #[test]
    fn test_score_formula() {
        assert_eq!(query_score(0, 0), 100);
        assert_eq!(query_score(1, 0), 75);
        assert_eq!(query_score(1, 1), 65);
        assert_eq!(query_score(4, 0), 0);
        assert_eq!(query_score(3, 3), 0);
        assert_eq!(query_score(usize::MAX, usize::MAX), 0);
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(Grade::from_score(100), Grade::A);
        assert_eq!(Grade::from_score(90), Grade::A);
        assert_eq!(Grade::from_score(89), Grade::B);
        assert_eq!(Grade::from_score(75), Grade::B);
        assert_eq!(Grade::from_score(74), Grade::C);
        assert_eq!(Grade::from_score(60), Grade::C);
        assert_eq!(Grade::from_score(59), Grade::D);
        assert_eq!(Grade::from_score(45), Grade::D);
        assert_eq!(Grade::from_score(44), Grade::F);
        assert_eq!(Grade::from_score(0), Grade::F);
    }

    #[test]
    fn test_issues_stably_sorted_by_severity() {
        let report = Report::new(
            vec![
                issue(Severity::Info, "i1"),
                issue(Severity::Warning, "w1"),
                issue(Severity::Danger, "d1"),
                issue(Severity::Warning, "w2"),
                issue(Severity::Danger, "d2"),
            ],
            vec![],
            vec![],
        );
        let titles: Vec<&str> = report.issues.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["d1", "d2", "w1", "w2", "i1"]);
        assert_eq!(report.score, 30);
        assert_eq!(report.grade, Grade::F);
    }

    #[test]
    fn test_info_issues_do_not_cost_points() {
        let report = Report::new(
            vec![issue(Severity::Info, "a"), issue(Severity::Info, "b")],
            vec![],
            vec![],
        );
        assert_eq!(report.score, 100);
        assert_eq!(report.grade, Grade::A);
    }

    #[test]
    fn test_has_category() {
        let report = Report::new(vec![issue(Severity::Warning, "w")], vec![], vec![]);
        assert!(report.has_category(IssueCategory::Indexing));
        assert!(!report.has_category(IssueCategory::Statistics));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = Report::new(vec![issue(Severity::Danger, "x")], vec![], vec![]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"indexRecommendations\""));
        assert!(json.contains("\"affectedRelation\""));
        assert!(json.contains("\"severity\":\"danger\""));
        assert!(json.contains("\"impact\":\"LOW\""));
        assert!(json.contains("\"grade\":\"B\""));
    }
}
