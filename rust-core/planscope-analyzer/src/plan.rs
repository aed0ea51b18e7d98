// SPDX-License-Identifier: PMPL-1.0-or-later
//! Execution plan document and operator tree types.
//!
//! Documents deserialize from two JSON shapes: the dashboard's camelCase
//! form (`root`, `operatorType`, ...) and raw PostgreSQL
//! `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)` output (`Plan`, `Node Type`, ...).
//! Every numeric field missing from the input defaults to zero.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::PlanLimits;
use crate::error::AnalyzerError;

/// JSON nesting allowed beyond two levels per plan level: the document,
/// PostgreSQL's array wrapper, and per-node arrays such as `Workers`.
const NESTING_OVERHEAD: usize = 8;

/// One operator in the execution tree.
///
/// Cost, time and buffer counters are inclusive of children, matching
/// `EXPLAIN ANALYZE` semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanNode {
    /// Operator name, e.g. `Seq Scan`, `Hash Join`, `Nested Loop`.
    #[serde(alias = "Node Type")]
    pub operator_type: String,
    #[serde(alias = "Relation Name")]
    pub relation_name: Option<String>,
    #[serde(alias = "Index Name")]
    pub index_name: Option<String>,
    /// Planner row estimate.
    #[serde(alias = "Plan Rows")]
    pub estimated_rows: f64,
    /// Rows actually produced.
    #[serde(alias = "Actual Rows")]
    pub actual_rows: f64,
    /// Cumulative planner cost (unitless).
    #[serde(alias = "Total Cost")]
    pub estimated_cost_total: f64,
    /// Wall-clock time in milliseconds, children included.
    #[serde(alias = "Actual Total Time")]
    pub actual_time_total_ms: f64,
    #[serde(alias = "Actual Loops")]
    pub actual_loops: u64,
    #[serde(alias = "Rows Removed by Filter")]
    pub rows_removed_by_filter: f64,
    /// Temp blocks written; non-zero means the operator spilled to disk.
    #[serde(alias = "Temp Written Blocks")]
    pub temp_blocks_written: u64,
    #[serde(alias = "Workers Launched")]
    pub parallel_workers_launched: u64,
    #[serde(alias = "Shared Hit Blocks")]
    pub shared_hit_blocks: u64,
    #[serde(alias = "Shared Read Blocks")]
    pub shared_read_blocks: u64,
    #[serde(alias = "Filter")]
    pub filter_expression: Option<String>,
    #[serde(alias = "Index Cond")]
    pub index_condition: Option<String>,
    /// Child operators; the first child is the outer (driving) side of a join.
    #[serde(alias = "Plans")]
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    /// Create a node with the given operator type and every counter at zero.
    pub fn new(operator_type: impl Into<String>) -> Self {
        Self {
            operator_type: operator_type.into(),
            ..Default::default()
        }
    }

    /// Pre-order (parent before children, first child first) walk yielding
    /// `(depth, node)` pairs. The root is depth 0.
    pub fn pre_order(&self) -> PreOrder<'_> {
        PreOrder {
            stack: vec![(0, self)],
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        self.pre_order().count()
    }

    /// Relation name, or a placeholder when the operator targets none.
    pub fn relation_label(&self) -> &str {
        self.relation_name.as_deref().unwrap_or("table_name")
    }

    /// Time spent in this node alone: inclusive time minus the children's.
    pub fn exclusive_time_ms(&self) -> f64 {
        let children: f64 = self.children.iter().map(|c| c.actual_time_total_ms).sum();
        (self.actual_time_total_ms - children).max(0.0)
    }

    /// Cost attributed to this node alone: inclusive cost minus the children's.
    pub fn exclusive_cost(&self) -> f64 {
        let children: f64 = self.children.iter().map(|c| c.estimated_cost_total).sum();
        (self.estimated_cost_total - children).max(0.0)
    }

    /// Deterministic SHA-256 fingerprint of the plan's shape.
    ///
    /// Only operator types, relation and index names, and depths contribute,
    /// so two executions of the same query with different timings share a
    /// fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (depth, node) in self.pre_order() {
            hasher.update(depth.to_le_bytes());
            hasher.update(node.operator_type.as_bytes());
            hasher.update([0u8]);
            hasher.update(node.relation_name.as_deref().unwrap_or("").as_bytes());
            hasher.update([0u8]);
            hasher.update(node.index_name.as_deref().unwrap_or("").as_bytes());
            hasher.update([0u8]);
        }
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>()
    }
}

/// Iterative pre-order traversal over a [`PlanNode`] tree.
pub struct PreOrder<'a> {
    stack: Vec<(usize, &'a PlanNode)>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, &'a PlanNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

/// JIT compilation options reported by the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JitOptions {
    #[serde(alias = "Inlining")]
    pub inlining: bool,
    #[serde(alias = "Optimization")]
    pub optimization: bool,
    #[serde(alias = "Expressions")]
    pub expressions: bool,
    #[serde(alias = "Deforming")]
    pub deforming: bool,
}

/// JIT summary. Carried through to the caller untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JitInfo {
    #[serde(alias = "Functions")]
    pub functions: u64,
    #[serde(alias = "Options")]
    pub options: JitOptions,
}

/// Root container for one execution plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanDocument {
    /// Root operator. A document without one is rejected by the normalizer.
    #[serde(alias = "Plan")]
    pub root: Option<PlanNode>,
    #[serde(alias = "Planning Time")]
    pub planning_time_ms: f64,
    #[serde(alias = "Execution Time")]
    pub execution_time_ms: Option<f64>,
    #[serde(alias = "JIT")]
    pub jit: Option<JitInfo>,
}

impl PlanDocument {
    /// Wrap a root node in a document with no timing metadata.
    pub fn from_root(root: PlanNode) -> Self {
        Self {
            root: Some(root),
            ..Default::default()
        }
    }

    /// Parse a document from JSON with the default [`PlanLimits`].
    pub fn from_json(json: &str) -> Result<Self, AnalyzerError> {
        Self::from_json_with_limits(json, &PlanLimits::default())
    }

    /// Parse a document from JSON.
    ///
    /// Accepts a bare document object or PostgreSQL's one-element array
    /// wrapper. An empty array is a malformed plan.
    ///
    /// Each plan level costs two levels of JSON nesting (the node and its
    /// `Plans` array), so the parser runs without serde_json's fixed
    /// recursion limit. Input nested deeper than a tree of
    /// `limits.max_depth` could be is rejected before parsing starts.
    pub fn from_json_with_limits(json: &str, limits: &PlanLimits) -> Result<Self, AnalyzerError> {
        let nesting = json_nesting_depth(json);
        let allowed = limits
            .max_depth
            .saturating_mul(2)
            .saturating_add(NESTING_OVERHEAD);
        if nesting > allowed {
            warn!(nesting, limit = limits.max_depth, "Rejecting overly nested plan JSON");
            return Err(AnalyzerError::PlanTooDeep {
                depth: nesting.saturating_sub(3) / 2,
                limit: limits.max_depth,
            });
        }

        let mut de = serde_json::Deserializer::from_str(json);
        de.disable_recursion_limit();
        let document = if json.trim_start().starts_with('[') {
            let mut documents = Vec::<PlanDocument>::deserialize(&mut de)?;
            if documents.is_empty() {
                return Err(AnalyzerError::MalformedPlan(
                    "EXPLAIN output contains no plans".to_string(),
                ));
            }
            documents.swap_remove(0)
        } else {
            PlanDocument::deserialize(&mut de)?
        };
        de.end()?;
        Ok(document)
    }
}

/// Deepest `{`/`[` nesting in `json`, ignoring brackets inside strings.
fn json_nesting_depth(json: &str) -> usize {
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for byte in json.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max_depth
}
