// SPDX-License-Identifier: PMPL-1.0-or-later
//! PlanScope Analyzer
//!
//! Execution-plan diagnostics for PlanScope.
//! Normalizes `EXPLAIN ANALYZE` plan trees, detects performance
//! anti-patterns, and produces scored reports with index and rewrite
//! recommendations plus cost/time breakdowns for display.
//!
//! ```
//! use planscope_analyzer::{analyze, normalize, Grade, PlanDocument, PlanNode};
//!
//! let scan = PlanNode {
//!     relation_name: Some("orders".to_string()),
//!     actual_rows: 15_000.0,
//!     estimated_cost_total: 185.0,
//!     ..PlanNode::new("Seq Scan")
//! };
//! let plan = normalize(PlanDocument::from_root(scan)).unwrap();
//! let report = analyze(&plan);
//! assert_eq!(report.score, 75);
//! assert_eq!(report.grade, Grade::B);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod metrics;
pub mod normalize;
pub mod plan;
pub mod render;
pub mod report;
pub mod rules;

pub use config::{AnalyzerConfig, PlanLimits, RuleThresholds};
pub use engine::{analyze, Analysis, Analyzer, NodeFinding};
pub use error::AnalyzerError;
pub use history::{AnalysisEntry, AnalysisLog, AnalysisSummary};
pub use metrics::{buffer_hit_rate, FlameBar, NodeMetrics, OperatorShare, PlanMetrics};
pub use normalize::{normalize, normalize_with_limits, NormalizedPlan};
pub use plan::{JitInfo, JitOptions, PlanDocument, PlanNode, PreOrder};
pub use report::{
    query_score, Grade, Impact, IndexRecommendation, Issue, IssueCategory, Report,
    RewriteSuggestion, Severity,
};
pub use rules::{Finding, Rule};
