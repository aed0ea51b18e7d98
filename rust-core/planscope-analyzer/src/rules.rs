// SPDX-License-Identifier: PMPL-1.0-or-later
//! Anti-pattern detection rules.
//!
//! Each [`Rule`] is a predicate over a single [`PlanNode`] paired with a
//! factory for the diagnostics it emits. Rules never look at a node's
//! parent or children, so they can be applied in any order.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::RuleThresholds;
use crate::error::AnalyzerError;
use crate::plan::PlanNode;
use crate::report::{Impact, IndexRecommendation, Issue, IssueCategory, Severity};

/// Leading column of a filter such as `((o.status)::text = 'open'::text)`.
const FILTER_COLUMN_PATTERN: &str = r#"^[\s(]*"?(?:[A-Za-z_][A-Za-z0-9_]*"?\.)?"?([A-Za-z_][A-Za-z0-9_]*)"?[\s)]*(?:::[A-Za-z_ ]+\)?\s*)?(?:=|<>|!=|<=|>=|<|>|~~|!~~|\bIS\b|\bIN\b|\bANY\b|\bLIKE\b)"#;

static FILTER_COLUMN: OnceLock<Option<Regex>> = OnceLock::new();

/// The detection rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    FullTableScan,
    StaleStatistics,
    HashJoinSpill,
    NestedLoopLargeSet,
    HighFilterRejection,
    ParallelismUnused,
}

/// Diagnostics produced by one rule firing on one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub rule: Rule,
    pub issue: Issue,
    pub index_recommendation: Option<IndexRecommendation>,
}

impl Rule {
    /// Every rule in evaluation order.
    pub const ALL: [Rule; 6] = [
        Rule::FullTableScan,
        Rule::StaleStatistics,
        Rule::HashJoinSpill,
        Rule::NestedLoopLargeSet,
        Rule::HighFilterRejection,
        Rule::ParallelismUnused,
    ];

    /// Whether this rule triggers on `node`.
    pub fn matches(self, node: &PlanNode, t: &RuleThresholds) -> bool {
        match self {
            Rule::FullTableScan => {
                node.operator_type == "Seq Scan"
                    && (node.actual_rows > t.seq_scan_rows
                        || node.estimated_cost_total > t.seq_scan_cost)
            }
            Rule::StaleStatistics => estimate_error(node)
                .is_some_and(|ratio| ratio > t.stale_stats_ratio),
            Rule::HashJoinSpill => {
                node.operator_type == "Hash Join" && node.temp_blocks_written > 0
            }
            Rule::NestedLoopLargeSet => {
                node.operator_type == "Nested Loop" && node.actual_rows > t.nested_loop_rows
            }
            Rule::HighFilterRejection => {
                node.rows_removed_by_filter
                    > t.filter_rejection_factor * node.actual_rows.max(1.0)
            }
            Rule::ParallelismUnused => {
                node.parallel_workers_launched == 0
                    && node.actual_time_total_ms > t.parallel_time_ms
            }
        }
    }

    /// Evaluate this rule against `node`, building its diagnostics on a match.
    pub fn evaluate(self, node: &PlanNode, t: &RuleThresholds) -> Option<Finding> {
        if !self.matches(node, t) {
            return None;
        }
        let (issue, index_recommendation) = match self {
            Rule::FullTableScan => {
                let (issue, recommendation) = full_table_scan(node);
                (issue, Some(recommendation))
            }
            Rule::StaleStatistics => (stale_statistics(node), None),
            Rule::HashJoinSpill => (hash_join_spill(node, t), None),
            Rule::NestedLoopLargeSet => (nested_loop(node), None),
            Rule::HighFilterRejection => (filter_rejection(node), None),
            Rule::ParallelismUnused => (parallelism_unused(node), None),
        };
        Some(Finding {
            rule: self,
            issue,
            index_recommendation,
        })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::FullTableScan => write!(f, "full_table_scan"),
            Rule::StaleStatistics => write!(f, "stale_statistics"),
            Rule::HashJoinSpill => write!(f, "hash_join_spill"),
            Rule::NestedLoopLargeSet => write!(f, "nested_loop_large_set"),
            Rule::HighFilterRejection => write!(f, "high_filter_rejection"),
            Rule::ParallelismUnused => write!(f, "parallelism_unused"),
        }
    }
}

impl FromStr for Rule {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rule::ALL
            .into_iter()
            .find(|rule| rule.to_string() == s.to_lowercase())
            .ok_or_else(|| AnalyzerError::InvalidConfig(format!("unknown rule: {s}")))
    }
}

/// Relative row-estimate error `|actual - estimated| / actual`, defined only
/// when both counts are positive.
pub fn estimate_error(node: &PlanNode) -> Option<f64> {
    if node.estimated_rows > 0.0 && node.actual_rows > 0.0 {
        Some((node.actual_rows - node.estimated_rows).abs() / node.actual_rows)
    } else {
        None
    }
}

/// `work_mem` needed to keep a spilled hash in memory: the spilled volume
/// times the safety factor, rounded up to whole megabytes and floored.
pub fn suggested_work_mem_mb(temp_blocks_written: u64, t: &RuleThresholds) -> u64 {
    let spilled_kb = temp_blocks_written as f64 * t.block_size_kb as f64;
    let needed_mb = (spilled_kb * t.work_mem_safety_factor / 1024.0).ceil() as u64;
    needed_mb.max(t.work_mem_floor_mb)
}

/// First column referenced by a filter expression, if one can be recognized.
pub fn filter_column(filter: &str) -> Option<String> {
    let re = FILTER_COLUMN
        .get_or_init(|| Regex::new(FILTER_COLUMN_PATTERN).ok())
        .as_ref()?;
    re.captures(filter)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

fn full_table_scan(node: &PlanNode) -> (Issue, IndexRecommendation) {
    let table = node.relation_label().to_string();
    let column = node
        .filter_expression
        .as_deref()
        .and_then(filter_column)
        .unwrap_or_else(|| "column_name".to_string());
    let ddl = format!("CREATE INDEX CONCURRENTLY idx_{table}_{column} ON {table} ({column});");

    let issue = Issue {
        severity: Severity::Danger,
        category: IssueCategory::Indexing,
        title: "Full Table Scan Detected".to_string(),
        description: format!(
            "Sequential scan on {} read {:.0} rows at an estimated cost of {:.2}. \
             The planner found no usable index for this access path.",
            table, node.actual_rows, node.estimated_cost_total
        ),
        affected_relation: node.relation_name.clone(),
        impact: Impact::High,
        suggested_fix: Some(ddl.clone()),
    };
    let recommendation = IndexRecommendation {
        table: table.clone(),
        ddl_suggestion: ddl,
        reason: match node.filter_expression.as_deref() {
            Some(filter) => format!("Sequential scan on {table} filtered by {filter}"),
            None => format!("Sequential scan on {table}"),
        },
        estimated_gain_description: format!(
            "Replaces a full scan of {:.0} rows with an index lookup",
            node.actual_rows.max(node.estimated_rows)
        ),
    };
    (issue, recommendation)
}

fn stale_statistics(node: &PlanNode) -> Issue {
    let ratio = estimate_error(node).unwrap_or(0.0);
    let fix = match node.relation_name.as_deref() {
        Some(relation) => format!("ANALYZE {relation};"),
        None => "ANALYZE;".to_string(),
    };
    Issue {
        severity: Severity::Danger,
        category: IssueCategory::Statistics,
        title: "Stale Planner Statistics".to_string(),
        description: format!(
            "{} estimated {:.0} rows but produced {:.0} ({:.1}x relative error). \
             Misestimates this large lead the planner to pick the wrong join and scan strategies.",
            node.operator_type, node.estimated_rows, node.actual_rows, ratio
        ),
        affected_relation: node.relation_name.clone(),
        impact: Impact::High,
        suggested_fix: Some(fix),
    }
}

fn hash_join_spill(node: &PlanNode, t: &RuleThresholds) -> Issue {
    let work_mem_mb = suggested_work_mem_mb(node.temp_blocks_written, t);
    Issue {
        severity: Severity::Warning,
        category: IssueCategory::Memory,
        title: "Hash Join Spilling to Disk".to_string(),
        description: format!(
            "Hash table exceeded work_mem and wrote {} temp blocks ({} kB) to disk.",
            node.temp_blocks_written,
            node.temp_blocks_written.saturating_mul(t.block_size_kb)
        ),
        affected_relation: node.relation_name.clone(),
        impact: Impact::Medium,
        suggested_fix: Some(format!("SET work_mem = '{work_mem_mb}MB';")),
    }
}

fn nested_loop(node: &PlanNode) -> Issue {
    Issue {
        severity: Severity::Warning,
        category: IssueCategory::Joins,
        title: "Nested Loop on Large Dataset".to_string(),
        description: format!(
            "Nested loop produced {:.0} rows. Its cost grows with the product of \
             both inputs; a hash or merge join usually scales better here.",
            node.actual_rows
        ),
        affected_relation: node.relation_name.clone(),
        impact: Impact::Medium,
        suggested_fix: Some("SET enable_nestloop = off; -- verify the alternative plan first".to_string()),
    }
}

fn filter_rejection(node: &PlanNode) -> Issue {
    let filter = node.filter_expression.as_deref().unwrap_or("filter");
    Issue {
        severity: Severity::Warning,
        category: IssueCategory::Filtering,
        title: "High Filter Rejection Rate".to_string(),
        description: format!(
            "{} discarded {:.0} rows to keep {:.0} using {}. \
             An index matching the predicate would avoid reading the rejected rows.",
            node.operator_type, node.rows_removed_by_filter, node.actual_rows, filter
        ),
        affected_relation: node.relation_name.clone(),
        impact: Impact::Medium,
        suggested_fix: None,
    }
}

fn parallelism_unused(node: &PlanNode) -> Issue {
    Issue {
        severity: Severity::Info,
        category: IssueCategory::Parallelism,
        title: "Parallel Query Not Used".to_string(),
        description: format!(
            "{} ran for {:.1}ms without parallel workers.",
            node.operator_type, node.actual_time_total_ms
        ),
        affected_relation: node.relation_name.clone(),
        impact: Impact::Low,
        suggested_fix: Some("SET max_parallel_workers_per_gather = 4;".to_string()),
    }
}
