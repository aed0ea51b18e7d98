// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for the PlanScope analyzer

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use planscope_analyzer::{analyze, normalize, Analyzer, PlanDocument, PlanMetrics, PlanNode};

/// Build a left-deep join tree with `joins` hash joins over sequential scans.
fn join_tree(joins: usize) -> PlanNode {
    let scan = |i: usize| PlanNode {
        relation_name: Some(format!("table_{i}")),
        estimated_rows: 1_000.0,
        actual_rows: 12_000.0 + i as f64,
        estimated_cost_total: 180.0,
        actual_time_total_ms: 40.0,
        rows_removed_by_filter: 50_000.0,
        filter_expression: Some(format!("(col_{i} = 42)")),
        ..PlanNode::new("Seq Scan")
    };

    let mut root = scan(0);
    for i in 1..=joins {
        let hash = PlanNode {
            estimated_cost_total: 200.0,
            actual_time_total_ms: 45.0,
            children: vec![scan(i)],
            ..PlanNode::new("Hash")
        };
        root = PlanNode {
            estimated_cost_total: root.estimated_cost_total + 400.0,
            actual_time_total_ms: root.actual_time_total_ms + 90.0,
            actual_rows: 20_000.0,
            temp_blocks_written: 64,
            children: vec![root, hash],
            ..PlanNode::new("Hash Join")
        };
    }
    root
}

// ============================================================================
// Analysis Benchmarks
// ============================================================================

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");

    for joins in [1usize, 10, 100] {
        let plan = normalize(PlanDocument::from_root(join_tree(joins))).unwrap();
        group.throughput(Throughput::Elements(plan.node_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(joins), &plan, |b, plan| {
            b.iter(|| black_box(analyze(plan)))
        });
    }

    group.finish();
}

fn bench_metrics(c: &mut Criterion) {
    let plan = normalize(PlanDocument::from_root(join_tree(100))).unwrap();
    c.bench_function("metrics/compute_100_joins", |b| {
        b.iter(|| black_box(PlanMetrics::compute(&plan)))
    });
}

fn bench_end_to_end_json(c: &mut Criterion) {
    let doc = PlanDocument::from_root(join_tree(25));
    let json = serde_json::to_string(&doc).unwrap();
    let analyzer = Analyzer::new();

    c.bench_function("end_to_end/json_25_joins", |b| {
        b.iter(|| {
            let doc = PlanDocument::from_json(black_box(&json)).unwrap();
            black_box(analyzer.analyze_document(doc).unwrap())
        })
    });
}

criterion_group!(benches, bench_analyze, bench_metrics, bench_end_to_end_json);
criterion_main!(benches);
