// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! planscope: analyze an execution plan from the command line.
//!
//! Reads a plan document (PostgreSQL `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)`
//! output or the dashboard's camelCase form) from a file or stdin and prints
//! the diagnostics report.

mod formatter;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use planscope_analyzer::{Analyzer, AnalyzerConfig, Rule};

use formatter::{format_analysis, OutputFormat, Sections};

/// PlanScope version string, pulled from Cargo.toml at compile time.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

/// planscope: execution plan diagnostics.
#[derive(Parser, Debug)]
#[command(name = "planscope", version = VERSION, about = "Analyze database execution plans")]
struct Cli {
    /// Plan document to analyze. Use `-` or omit to read stdin.
    plan: Option<PathBuf>,

    /// Output format: table, text or json.
    #[arg(long, default_value = "table")]
    format: String,

    /// JSON file overriding rule thresholds and limits.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the flame graph after the report.
    #[arg(long)]
    flame: bool,

    /// Print the per-operator cost/time breakdown after the report.
    #[arg(long)]
    breakdown: bool,

    /// Skip a detection rule, e.g. `parallelism_unused`. Repeatable.
    #[arg(long = "disable", value_name = "RULE")]
    disabled_rules: Vec<Rule>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String> {
    let format: OutputFormat = cli.format.parse().unwrap_or_else(|e| {
        eprintln!("Warning: {e}. Defaulting to table format.");
        OutputFormat::Table
    });

    let analyzer = Analyzer::with_config(load_config(cli)?)?;

    let input = read_plan(cli.plan.as_ref())?;
    let document = analyzer
        .parse_document(&input)
        .context("parsing plan document")?;
    tracing::debug!(bytes = input.len(), "Read plan document");

    let analysis = analyzer.analyze_document(document)?;
    let sections = Sections {
        flame_graph: cli.flame,
        breakdown: cli.breakdown,
    };
    Ok(format_analysis(&analysis, format, sections))
}

/// Config file (or defaults) with `--disable` rules applied on top.
fn load_config(cli: &Cli) -> Result<AnalyzerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            AnalyzerConfig::from_json(&json)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => AnalyzerConfig::default(),
    };
    config.disabled_rules.extend(cli.disabled_rules.iter().copied());
    Ok(config)
}

fn read_plan(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => std::fs::read_to_string(p)
            .with_context(|| format!("reading plan {}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading plan from stdin")?;
            Ok(buf)
        }
    }
}
