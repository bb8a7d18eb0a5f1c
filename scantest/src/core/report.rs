//! Ordering and rendering of a cycle's results.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::core::types::{Status, TestResult};

const BANNER: &str = "-----------------------------------------------------";

/// Worst status first; ties by package name.
pub fn sort_results(results: &mut [TestResult]) {
    results.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| a.package_name.cmp(&b.package_name))
    });
}

/// Human-readable report. Expects `results` already sorted.
pub fn render_console(results: &[TestResult]) -> String {
    let mut out = String::new();
    let mut counts: BTreeMap<Status, usize> = BTreeMap::new();

    for result in results {
        *counts.entry(result.status).or_default() += 1;
        let block = format!("{}\n{}", result.package_name, result.output);
        if result.status < Status::TestsPassed {
            out.push_str(&block.red().to_string());
        } else {
            out.push_str(&block);
        }
        out.push_str("\n\n");
    }

    let failed = counts.keys().any(|status| *status < Status::TestsPassed);
    if !counts.is_empty() {
        let summary: Vec<String> = counts
            .iter()
            .map(|(status, count)| format!("{count} {}", status.label()))
            .collect();
        out.push_str(&summary.join(", "));
        out.push('\n');
    }
    let banner = if failed { BANNER.red() } else { BANNER.green() };
    out.push_str(&banner.to_string());
    out.push('\n');
    out
}

#[derive(Serialize)]
struct Payload<'a> {
    packages: &'a [TestResult],
}

/// Machine-readable report: one JSON object on a single line.
pub fn render_json(results: &[TestResult]) -> Result<String> {
    serde_json::to_string(&Payload { packages: results }).context("serialize results payload")
}
