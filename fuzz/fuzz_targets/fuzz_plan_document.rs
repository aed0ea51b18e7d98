// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for plan document parsing and analysis.
// Run with: cargo +nightly fuzz run fuzz_plan_document
//
// Feeds arbitrary byte strings through JSON parsing, normalization and the
// diagnostic engine. Every stage must reject or absorb bad input without
// panicking, and any report produced must keep its score in range.

#![no_main]

use libfuzzer_sys::fuzz_target;
use planscope_analyzer::Analyzer;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if input.len() <= 16384 {
            let analyzer = Analyzer::new();
            if let Ok(doc) = analyzer.parse_document(input) {
                if let Ok(analysis) = analyzer.analyze_document(doc) {
                    assert!(analysis.report.score <= 100);
                    assert!(!analysis.metrics.buffer_hit_rate.is_nan());
                }
            }
        }
    }
});
