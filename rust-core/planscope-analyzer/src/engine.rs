// SPDX-License-Identifier: PMPL-1.0-or-later
//! Diagnostic engine: applies the rule set to a normalized plan.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::metrics::PlanMetrics;
use crate::normalize::{normalize_with_limits, NormalizedPlan};
use crate::plan::PlanDocument;
use crate::report::{IndexRecommendation, IssueCategory, Report, RewriteSuggestion};
use crate::rules::{Finding, Rule};

/// A rule finding tied to the pre-order index of the node that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFinding {
    /// Position of the node in pre-order traversal (the root is 0).
    pub node_id: usize,
    pub finding: Finding,
}

/// Report, derived metrics and shape fingerprint for one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub report: Report,
    pub metrics: PlanMetrics,
    pub fingerprint: String,
}

/// The plan analyzer.
///
/// Holds only immutable configuration; one instance can analyze any number
/// of plans, from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Create an analyzer with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with a validated configuration.
    pub fn with_config(config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Parse a JSON plan document, rejecting nesting beyond this analyzer's limits.
    pub fn parse_document(&self, json: &str) -> Result<PlanDocument, AnalyzerError> {
        PlanDocument::from_json_with_limits(json, &self.config.limits)
    }

    /// Normalize a document using this analyzer's limits.
    pub fn normalize(&self, raw: PlanDocument) -> Result<NormalizedPlan, AnalyzerError> {
        normalize_with_limits(raw, &self.config.limits)
    }

    /// Every enabled rule applied to every node, in pre-order.
    pub fn findings(&self, plan: &NormalizedPlan) -> Vec<NodeFinding> {
        let rules: Vec<Rule> = Rule::ALL
            .into_iter()
            .filter(|rule| self.config.is_enabled(*rule))
            .collect();
        let thresholds = &self.config.thresholds;

        plan.root
            .pre_order()
            .enumerate()
            .flat_map(|(node_id, (_, node))| {
                rules
                    .iter()
                    .filter_map(move |rule| rule.evaluate(node, thresholds))
                    .map(move |finding| NodeFinding { node_id, finding })
            })
            .collect()
    }

    /// Analyze a normalized plan.
    ///
    /// 1. Walk the tree once in pre-order, applying every rule at every node
    /// 2. Synthesize plan-wide rewrite suggestions from the issue set
    /// 3. Sort issues by severity and derive score and grade
    pub fn analyze(&self, plan: &NormalizedPlan) -> Report {
        let mut issues = Vec::new();
        let mut index_recommendations: Vec<IndexRecommendation> = Vec::new();

        for NodeFinding { finding, .. } in self.findings(plan) {
            if let Some(rec) = finding.index_recommendation {
                if !index_recommendations
                    .iter()
                    .any(|existing| existing.ddl_suggestion == rec.ddl_suggestion)
                {
                    index_recommendations.push(rec);
                }
            }
            issues.push(finding.issue);
        }

        let mut report = Report::new(
            issues,
            index_recommendations,
            vec![covering_index_suggestion()],
        );
        if report.has_category(IssueCategory::Statistics) {
            let relations: Vec<&str> = report
                .issues
                .iter()
                .filter(|issue| issue.category == IssueCategory::Statistics)
                .filter_map(|issue| issue.affected_relation.as_deref())
                .collect();
            let refresh = statistics_refresh_suggestion(&relations);
            report.rewrite_suggestions.push(refresh);
        }

        debug!(
            issues = report.issues.len(),
            index_recommendations = report.index_recommendations.len(),
            score = report.score,
            grade = %report.grade,
            "Analyzed plan"
        );
        report
    }

    /// Normalize, analyze and compute metrics in one call.
    pub fn analyze_document(&self, raw: PlanDocument) -> Result<Analysis, AnalyzerError> {
        let plan = self.normalize(raw)?;
        Ok(Analysis {
            report: self.analyze(&plan),
            metrics: PlanMetrics::compute(&plan),
            fingerprint: plan.root.fingerprint(),
        })
    }
}

/// Analyze a normalized plan with the default configuration.
pub fn analyze(plan: &NormalizedPlan) -> Report {
    Analyzer::default().analyze(plan)
}

fn covering_index_suggestion() -> RewriteSuggestion {
    RewriteSuggestion {
        title: "Use Covering Indexes".to_string(),
        description: "Include the columns the query projects in the index so the planner \
                      can answer it with an index-only scan instead of visiting the heap."
            .to_string(),
        example_sql: Some(
            "CREATE INDEX CONCURRENTLY idx_orders_customer_covering\n  \
             ON orders (customer_id) INCLUDE (status, total_amount, created_at);"
                .to_string(),
        ),
    }
}

fn statistics_refresh_suggestion(relations: &[&str]) -> RewriteSuggestion {
    let mut targets: Vec<&str> = Vec::new();
    for &relation in relations {
        if !targets.contains(&relation) {
            targets.push(relation);
        }
    }
    let example_sql = if targets.is_empty() {
        "ANALYZE;\nALTER TABLE table_name SET (autovacuum_analyze_scale_factor = 0.02);".to_string()
    } else {
        targets
            .iter()
            .map(|t| {
                format!("ANALYZE {t};\nALTER TABLE {t} SET (autovacuum_analyze_scale_factor = 0.02);")
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    RewriteSuggestion {
        title: "Refresh Planner Statistics".to_string(),
        description: "Row estimates are far from reality. Run a targeted ANALYZE now and \
                      lower autovacuum_analyze_scale_factor so statistics stay fresh as the \
                      tables grow."
            .to_string(),
        example_sql: Some(example_sql),
    }
}
