// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for the analyzer.

use std::collections::VecDeque;

use proptest::prelude::*;
use planscope_analyzer::{
    analyze, buffer_hit_rate, normalize, query_score, Analyzer, Grade, Issue, PlanDocument,
    PlanNode, RuleThresholds, Rule,
};

/// Generate operator names, weighted toward the ones rules care about.
fn arb_operator() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Seq Scan".to_string()),
        Just("Hash Join".to_string()),
        Just("Nested Loop".to_string()),
        Just("Index Scan".to_string()),
        Just("Sort".to_string()),
        Just("Aggregate".to_string()),
    ]
}

/// Generate a single node with no children.
fn arb_leaf() -> impl Strategy<Value = PlanNode> {
    (
        arb_operator(),
        proptest::option::of("[a-z]{3,8}"),
        0.0f64..50_000.0,
        0.0f64..50_000.0,
        0.0f64..5_000.0,
        0.0f64..2_000.0,
        0.0f64..100_000.0,
        0u64..200,
        0u64..4,
    )
        .prop_map(
            |(op, relation, est, act, cost, time, removed, temp, workers)| PlanNode {
                operator_type: op,
                relation_name: relation,
                estimated_rows: est.floor(),
                actual_rows: act.floor(),
                estimated_cost_total: cost,
                actual_time_total_ms: time,
                rows_removed_by_filter: removed.floor(),
                temp_blocks_written: temp,
                parallel_workers_launched: workers,
                ..Default::default()
            },
        )
}

/// Generate plan trees up to four levels deep.
fn arb_tree() -> impl Strategy<Value = PlanNode> {
    arb_leaf().prop_recursive(4, 32, 4, |inner| {
        (arb_leaf(), proptest::collection::vec(inner, 0..4)).prop_map(|(mut node, children)| {
            node.children = children;
            node
        })
    })
}

/// Evaluate every rule over nodes in breadth-first order.
fn breadth_first_issues(root: &PlanNode, t: &RuleThresholds) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        for rule in Rule::ALL {
            if let Some(finding) = rule.evaluate(node, t) {
                issues.push(finding.issue);
            }
        }
        queue.extend(node.children.iter());
    }
    issues
}

fn sorted_titles(issues: &[Issue]) -> Vec<String> {
    let mut keys: Vec<String> = issues
        .iter()
        .map(|i| format!("{}|{}|{}", i.severity, i.title, i.description))
        .collect();
    keys.sort();
    keys
}

proptest! {
    #[test]
    fn test_score_bounded_and_monotonic(danger in 0usize..20, warning in 0usize..20) {
        let score = query_score(danger, warning);
        prop_assert!(score <= 100);
        prop_assert!(query_score(danger + 1, warning) <= score);
        prop_assert!(query_score(danger, warning + 1) <= score);
    }

    #[test]
    fn test_report_consistent_with_issue_counts(tree in arb_tree()) {
        let report = analyze(&normalize(PlanDocument::from_root(tree)).unwrap());
        let danger = report.issues.iter().filter(|i| i.severity.to_string() == "danger").count();
        let warning = report.issues.iter().filter(|i| i.severity.to_string() == "warning").count();
        prop_assert_eq!(report.score, query_score(danger, warning));
        prop_assert_eq!(report.grade, Grade::from_score(report.score));
        if danger == 0 && warning == 0 {
            prop_assert_eq!(report.score, 100);
            prop_assert_eq!(report.grade, Grade::A);
        }
        prop_assert!(report.issues.windows(2).all(|w| w[0].severity <= w[1].severity));
        prop_assert!(!report.rewrite_suggestions.is_empty());
    }

    #[test]
    fn test_analysis_is_deterministic(tree in arb_tree()) {
        let doc = PlanDocument::from_root(tree);
        let a = serde_json::to_string(&analyze(&normalize(doc.clone()).unwrap())).unwrap();
        let b = serde_json::to_string(&analyze(&normalize(doc).unwrap())).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn test_normalization_idempotent(tree in arb_tree()) {
        let first = normalize(PlanDocument::from_root(tree)).unwrap();
        let second = normalize(first.to_document()).unwrap();
        prop_assert_eq!(&first.root, &second.root);
        prop_assert_eq!(first.max_cost, second.max_cost);
        prop_assert_eq!(first.node_count, second.node_count);
    }

    #[test]
    fn test_rule_set_independent_of_traversal_order(tree in arb_tree()) {
        let plan = normalize(PlanDocument::from_root(tree)).unwrap();
        let thresholds = RuleThresholds::default();
        let pre_order: Vec<Issue> = Analyzer::new()
            .findings(&plan)
            .into_iter()
            .map(|f| f.finding.issue)
            .collect();
        let breadth_first = breadth_first_issues(&plan.root, &thresholds);
        prop_assert_eq!(sorted_titles(&pre_order), sorted_titles(&breadth_first));
    }

    #[test]
    fn test_buffer_hit_rate_in_unit_interval(hit in 0u64..1_000_000, read in 0u64..1_000_000) {
        let rate = buffer_hit_rate(hit, read);
        prop_assert!(rate.is_finite());
        prop_assert!((0.0..=1.0).contains(&rate));
    }
}
