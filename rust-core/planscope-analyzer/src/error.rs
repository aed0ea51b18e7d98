// SPDX-License-Identifier: PMPL-1.0-or-later
//! Analyzer error types.

use thiserror::Error;

/// Errors that can occur while normalizing or analyzing a plan.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    #[error("plan too large: {nodes} nodes exceeds limit of {limit}")]
    PlanTooLarge { nodes: usize, limit: usize },

    #[error("plan too deep: depth {depth} exceeds limit of {limit}")]
    PlanTooDeep { depth: usize, limit: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
