//! Command handlers for the opfuzz CLI

use anyhow::{Context, Result, anyhow};
use comfy_table::{Cell, ContentArrangement, Row, Table, presets::UTF8_FULL};
use humansize::{DECIMAL, format_size};
use std::fs;
use std::path::{Path, PathBuf};

use opfuzz::harnesses::{self, REGISTRY};
use opfuzz::triage::{BugReport, read_report, write_report};
use opfuzz::utils::{fingerprint, hex_preview};
use opfuzz::{HarnessEntry, Outcome};

const PREVIEW_BYTES: usize = 32;

/// Tally of a replay run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub continued: usize,
    pub rejected: usize,
    pub bugs: usize,
    pub reports: Vec<PathBuf>,
}

impl ReplaySummary {
    pub fn total(&self) -> usize {
        self.continued + self.rejected + self.bugs
    }
}

// ============================================================================
// list
// ============================================================================

pub fn print_harness_table(entries: &[HarnessEntry]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Harness", "Min input"]);
    for (i, entry) in entries.iter().enumerate() {
        table.add_row(Row::from(vec![
            Cell::new(i),
            Cell::new(entry.name),
            Cell::new(format_size(entry.min_input_len, DECIMAL)),
        ]));
    }
    println!("{}", table);
}

pub fn list_harnesses() {
    print_harness_table(REGISTRY);
}

// ============================================================================
// run
// ============================================================================

pub fn lookup(name: &str) -> Result<&'static HarnessEntry> {
    harnesses::find(name).ok_or_else(|| {
        anyhow!(
            "Unknown harness '{}'. Available: {}",
            name,
            harnesses::names().collect::<Vec<_>>().join(", ")
        )
    })
}

/// Expands directories one level deep into their regular files, sorted by
/// path so replays are repeatable.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        let meta = fs::metadata(path)
            .with_context(|| format!("Failed to stat '{}'", path.display()))?;
        if meta.is_dir() {
            let mut files = Vec::new();
            let listing = fs::read_dir(path)
                .with_context(|| format!("Failed to list '{}'", path.display()))?;
            for entry in listing {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    files.push(entry.path());
                }
            }
            files.sort();
            inputs.extend(files);
        } else {
            inputs.push(path.clone());
        }
    }
    Ok(inputs)
}

/// Feeds every input file through `entry`, writing a report for each bug
/// when `artifacts` is set.
pub fn replay(
    entry: &HarnessEntry,
    inputs: &[PathBuf],
    artifacts: Option<&Path>,
    quiet: bool,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Input", "Size", "Fingerprint", "Outcome", "Detail"]);

    for path in inputs {
        let data = fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
        let outcome = (entry.run)(&data);
        tracing::debug!(input = %path.display(), outcome = outcome.label(), "replayed");

        let detail = match &outcome {
            Outcome::Continue => {
                summary.continued += 1;
                String::new()
            }
            Outcome::RejectInput => {
                summary.rejected += 1;
                String::new()
            }
            Outcome::BugFound(message) => {
                summary.bugs += 1;
                if let Some(dir) = artifacts {
                    let report = BugReport::new(entry.name, message.clone(), &data)
                        .with_limits(entry.limits);
                    summary.reports.push(write_report(dir, &report)?);
                }
                message.clone()
            }
        };

        if !quiet || outcome.is_bug() {
            table.add_row(Row::from(vec![
                Cell::new(path.display()),
                Cell::new(format_size(data.len(), DECIMAL)),
                Cell::new(fingerprint(&data)),
                Cell::new(outcome.label()),
                Cell::new(detail),
            ]));
        }
    }

    if table.row_count() > 0 {
        println!("{}", table);
    }
    Ok(summary)
}

// ============================================================================
// show
// ============================================================================

pub fn print_report(path: &Path) -> Result<BugReport> {
    let report = read_report(path)
        .map_err(|e| anyhow!("Failed to open report '{}': {}", path.display(), e))?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(Row::from(vec![Cell::new("Harness"), Cell::new(&report.harness)]));
    table.add_row(Row::from(vec![Cell::new("Fingerprint"), Cell::new(&report.fingerprint)]));
    table.add_row(Row::from(vec![Cell::new("Message"), Cell::new(&report.message)]));
    table.add_row(Row::from(vec![
        Cell::new("Input size"),
        Cell::new(format_size(report.input.len(), DECIMAL)),
    ]));
    table.add_row(Row::from(vec![
        Cell::new("Input"),
        Cell::new(hex_preview(&report.input, PREVIEW_BYTES)),
    ]));
    if let Some(limits) = &report.limits {
        table.add_row(Row::from(vec![Cell::new("Limits"), Cell::new(format!("{:?}", limits))]));
    }
    table.add_row(Row::from(vec![Cell::new("Created (unix)"), Cell::new(report.created_unix)]));
    println!("{}", table);
    Ok(report)
}

/// Replays the input stored in a report against its harness.
pub fn recheck_report(report: &BugReport) -> Result<Outcome> {
    let entry = lookup(&report.harness)?;
    Ok((entry.run)(&report.input))
}
