// SPDX-License-Identifier: PMPL-1.0-or-later
//! Analyzer configuration.
//!
//! Defaults reproduce the dashboard's detection constants:
//! - sequential scans flagged above 1000 rows or cost 50
//! - stale statistics when the relative row-estimate error exceeds 5
//! - nested loops flagged above 10 000 rows
//! - filters flagged when they discard more than 2x the rows they keep
//! - parallelism suggested above 500ms

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;
use crate::rules::Rule;

/// Trigger thresholds for the detection rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// A `Seq Scan` returning more rows than this is a full table scan.
    pub seq_scan_rows: f64,
    /// A `Seq Scan` costing more than this is a full table scan.
    pub seq_scan_cost: f64,
    /// Relative estimate error (`|actual - estimated| / actual`) above which
    /// planner statistics are considered stale.
    pub stale_stats_ratio: f64,
    /// A `Nested Loop` producing more rows than this is flagged.
    pub nested_loop_rows: f64,
    /// Filters removing more than `factor * max(actual_rows, 1)` rows are flagged.
    pub filter_rejection_factor: f64,
    /// Non-parallel nodes slower than this (milliseconds) get a parallelism hint.
    pub parallel_time_ms: f64,
    /// Size of one temp block in kilobytes.
    pub block_size_kb: u64,
    /// Multiplier applied to the spilled volume when sizing `work_mem`.
    pub work_mem_safety_factor: f64,
    /// Smallest `work_mem` ever suggested, in megabytes.
    pub work_mem_floor_mb: u64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            seq_scan_rows: 1_000.0,
            seq_scan_cost: 50.0,
            stale_stats_ratio: 5.0,
            nested_loop_rows: 10_000.0,
            filter_rejection_factor: 2.0,
            parallel_time_ms: 500.0,
            block_size_kb: 8,
            work_mem_safety_factor: 4.0,
            work_mem_floor_mb: 64,
        }
    }
}

/// Defensive caps applied by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanLimits {
    /// Maximum number of operator nodes accepted.
    pub max_nodes: usize,
    /// Maximum tree depth accepted (the root is depth 0).
    pub max_depth: usize,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            max_depth: 512,
        }
    }
}

/// Configuration for the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Rule trigger thresholds.
    pub thresholds: RuleThresholds,
    /// Normalizer caps.
    pub limits: PlanLimits,
    /// Rules that are skipped during traversal.
    pub disabled_rules: HashSet<Rule>,
}

impl AnalyzerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, AnalyzerError> {
        let config: AnalyzerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Whether `rule` participates in analysis.
    pub fn is_enabled(&self, rule: Rule) -> bool {
        !self.disabled_rules.contains(&rule)
    }

    /// Reject thresholds that would make the rules meaningless.
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        let t = &self.thresholds;
        let ratios = [
            ("seq_scan_rows", t.seq_scan_rows),
            ("seq_scan_cost", t.seq_scan_cost),
            ("stale_stats_ratio", t.stale_stats_ratio),
            ("nested_loop_rows", t.nested_loop_rows),
            ("filter_rejection_factor", t.filter_rejection_factor),
            ("parallel_time_ms", t.parallel_time_ms),
            ("work_mem_safety_factor", t.work_mem_safety_factor),
        ];
        for (name, value) in ratios {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalyzerError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if t.block_size_kb == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "block_size_kb must be greater than zero".to_string(),
            ));
        }
        if self.limits.max_nodes == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "max_nodes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
