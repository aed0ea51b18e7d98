// SPDX-License-Identifier: PMPL-1.0-or-later
//! Plan normalization.
//!
//! Turns a raw [`PlanDocument`] into a [`NormalizedPlan`]: the root is
//! required, floating-point counters are sanitized, and the plan-wide
//! denominators (total cost, total time) are computed once.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PlanLimits;
use crate::error::AnalyzerError;
use crate::plan::{JitInfo, PlanDocument, PlanNode};

/// A validated plan tree with its aggregate totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPlan {
    /// Root operator.
    pub root: PlanNode,
    /// Total plan cost; the root's cumulative cost.
    pub max_cost: f64,
    /// Total elapsed time in milliseconds.
    pub total_time_ms: f64,
    pub planning_time_ms: f64,
    /// Number of operator nodes in the tree.
    pub node_count: usize,
    /// Depth of the deepest node (the root is depth 0).
    pub max_depth: usize,
    pub jit: Option<JitInfo>,
}

impl NormalizedPlan {
    /// Re-wrap this plan's tree as a fresh document.
    pub fn to_document(&self) -> PlanDocument {
        PlanDocument {
            root: Some(self.root.clone()),
            planning_time_ms: self.planning_time_ms,
            execution_time_ms: None,
            jit: self.jit.clone(),
        }
    }
}

/// Normalize a document with the default [`PlanLimits`].
pub fn normalize(raw: PlanDocument) -> Result<NormalizedPlan, AnalyzerError> {
    normalize_with_limits(raw, &PlanLimits::default())
}

/// Normalize a document, rejecting trees beyond `limits`.
///
/// - A missing root fails with [`AnalyzerError::MalformedPlan`].
/// - `max_cost` is the root's cumulative cost.
/// - `total_time_ms` is the document's execution time when positive,
///   otherwise the root's inclusive time.
/// - Negative or non-finite floating-point counters become `0.0`.
pub fn normalize_with_limits(
    raw: PlanDocument,
    limits: &PlanLimits,
) -> Result<NormalizedPlan, AnalyzerError> {
    let mut root = raw.root.ok_or_else(|| {
        AnalyzerError::MalformedPlan("plan document has no root node".to_string())
    })?;

    let mut node_count = 0usize;
    let mut max_depth = 0usize;
    for (depth, _) in root.pre_order() {
        node_count += 1;
        max_depth = max_depth.max(depth);
    }

    if node_count > limits.max_nodes {
        warn!(node_count, limit = limits.max_nodes, "Rejecting oversized plan");
        return Err(AnalyzerError::PlanTooLarge {
            nodes: node_count,
            limit: limits.max_nodes,
        });
    }
    if max_depth > limits.max_depth {
        warn!(max_depth, limit = limits.max_depth, "Rejecting overly deep plan");
        return Err(AnalyzerError::PlanTooDeep {
            depth: max_depth,
            limit: limits.max_depth,
        });
    }

    let mut stack: Vec<&mut PlanNode> = vec![&mut root];
    while let Some(node) = stack.pop() {
        sanitize(node);
        stack.extend(node.children.iter_mut());
    }

    let max_cost = root.estimated_cost_total;
    let total_time_ms = match raw.execution_time_ms {
        Some(ms) if ms.is_finite() && ms > 0.0 => ms,
        _ => root.actual_time_total_ms,
    };

    debug!(node_count, max_depth, max_cost, total_time_ms, "Normalized plan");

    Ok(NormalizedPlan {
        root,
        max_cost,
        total_time_ms,
        planning_time_ms: non_negative(raw.planning_time_ms),
        node_count,
        max_depth,
        jit: raw.jit,
    })
}

fn sanitize(node: &mut PlanNode) {
    node.estimated_rows = non_negative(node.estimated_rows);
    node.actual_rows = non_negative(node.actual_rows);
    node.estimated_cost_total = non_negative(node.estimated_cost_total);
    node.actual_time_total_ms = non_negative(node.actual_time_total_ms);
    node.rows_removed_by_filter = non_negative(node.rows_removed_by_filter);
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
