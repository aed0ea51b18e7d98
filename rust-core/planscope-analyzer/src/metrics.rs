// SPDX-License-Identifier: PMPL-1.0-or-later
//! Derived plan metrics for display.
//!
//! Everything here is computed from a [`NormalizedPlan`] alone: per-node
//! cost and time shares, buffer cache hit rate, a flame-graph decomposition
//! and a per-operator breakdown. Every ratio with a zero denominator is
//! reported as `0.0`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedPlan;

/// `numerator / denominator`, or `0.0` when the denominator is not positive.
fn share(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Fraction of shared-buffer accesses served from cache.
///
/// Returns `0.0` when no blocks were touched at all.
pub fn buffer_hit_rate(shared_hit_blocks: u64, shared_read_blocks: u64) -> f64 {
    let total = shared_hit_blocks.saturating_add(shared_read_blocks);
    if total == 0 {
        return 0.0;
    }
    shared_hit_blocks as f64 / total as f64
}

/// Cost and time attribution for one operator node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    /// Pre-order position (the root is 0).
    pub node_id: usize,
    pub depth: usize,
    pub operator_type: String,
    pub relation_name: Option<String>,
    /// Inclusive cost over the plan's total cost.
    pub cost_share: f64,
    /// Inclusive time over the plan's total time.
    pub time_share: f64,
    /// Time spent in this node excluding its children.
    pub exclusive_time_ms: f64,
    /// Cost attributed to this node excluding its children.
    pub exclusive_cost: f64,
}

/// One bar of a flame graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlameBar {
    pub node_id: usize,
    pub depth: usize,
    pub label: String,
    pub time_ms: f64,
    /// Bar width relative to the slowest node, 0.0 to 1.0.
    pub width: f64,
}

/// Exclusive cost and time aggregated per operator type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorShare {
    pub operator_type: String,
    pub node_count: usize,
    pub exclusive_time_ms: f64,
    pub time_share: f64,
    pub exclusive_cost: f64,
    pub cost_share: f64,
}

/// All display metrics for a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetrics {
    pub max_cost: f64,
    pub total_time_ms: f64,
    pub planning_time_ms: f64,
    /// Cache hit rate over the root's (inclusive) buffer counters.
    pub buffer_hit_rate: f64,
    /// Per-node attribution, in pre-order.
    pub nodes: Vec<NodeMetrics>,
    pub flame_graph: Vec<FlameBar>,
    /// Sorted by exclusive time, slowest first.
    pub operator_breakdown: Vec<OperatorShare>,
}

impl PlanMetrics {
    /// Compute every metric in a single pre-order walk.
    pub fn compute(plan: &NormalizedPlan) -> Self {
        let mut nodes = Vec::with_capacity(plan.node_count);
        let mut max_observed_ms = 0.0f64;

        for (node_id, (depth, node)) in plan.root.pre_order().enumerate() {
            max_observed_ms = max_observed_ms.max(node.actual_time_total_ms);
            nodes.push(NodeMetrics {
                node_id,
                depth,
                operator_type: node.operator_type.clone(),
                relation_name: node.relation_name.clone(),
                cost_share: share(node.estimated_cost_total, plan.max_cost),
                time_share: share(node.actual_time_total_ms, plan.total_time_ms),
                exclusive_time_ms: node.exclusive_time_ms(),
                exclusive_cost: node.exclusive_cost(),
            });
        }

        let flame_graph = plan
            .root
            .pre_order()
            .enumerate()
            .map(|(node_id, (depth, node))| FlameBar {
                node_id,
                depth,
                label: match node.relation_name.as_deref() {
                    Some(relation) => format!("{} on {}", node.operator_type, relation),
                    None => node.operator_type.clone(),
                },
                time_ms: node.actual_time_total_ms,
                width: share(node.actual_time_total_ms, max_observed_ms),
            })
            .collect();

        Self {
            max_cost: plan.max_cost,
            total_time_ms: plan.total_time_ms,
            planning_time_ms: plan.planning_time_ms,
            buffer_hit_rate: buffer_hit_rate(
                plan.root.shared_hit_blocks,
                plan.root.shared_read_blocks,
            ),
            operator_breakdown: operator_breakdown(&nodes, plan),
            nodes,
            flame_graph,
        }
    }

    /// The node with the greatest exclusive time, if any node took time.
    pub fn hottest_node(&self) -> Option<&NodeMetrics> {
        self.nodes
            .iter()
            .filter(|n| n.exclusive_time_ms > 0.0)
            .fold(None, |best: Option<&NodeMetrics>, n| match best {
                Some(b) if b.exclusive_time_ms >= n.exclusive_time_ms => Some(b),
                _ => Some(n),
            })
    }
}

fn operator_breakdown(nodes: &[NodeMetrics], plan: &NormalizedPlan) -> Vec<OperatorShare> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, (usize, f64, f64)> = HashMap::new();
    for node in nodes {
        let entry = totals.entry(node.operator_type.as_str()).or_insert_with(|| {
            order.push(node.operator_type.as_str());
            (0, 0.0, 0.0)
        });
        entry.0 += 1;
        entry.1 += node.exclusive_time_ms;
        entry.2 += node.exclusive_cost;
    }

    let mut breakdown: Vec<OperatorShare> = order
        .into_iter()
        .filter_map(|op| totals.get(op).map(|t| (op, *t)))
        .map(|(op, (count, time, cost))| OperatorShare {
            operator_type: op.to_string(),
            node_count: count,
            exclusive_time_ms: time,
            time_share: share(time, plan.total_time_ms),
            exclusive_cost: cost,
            cost_share: share(cost, plan.max_cost),
        })
        .collect();
    // Stable: first-seen order breaks ties.
    breakdown.sort_by(|a, b| {
        b.exclusive_time_ms
            .partial_cmp(&a.exclusive_time_ms)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    breakdown
}
