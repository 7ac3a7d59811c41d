//! Text, Markdown, and JSON output for each subcommand.

use std::io::Write;

use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use gitrisk_core::{OutputFormat, Page};
use gitrisk_pulse::coupling::CouplingPair;
use gitrisk_pulse::hotspots::Hotspot;
use gitrisk_pulse::overview::Overview;
use gitrisk_pulse::ownership::FileOwnership;

/// Ownership totals with one page of per-file rows.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipReport {
    pub total_files: usize,
    pub single_author_files: usize,
    pub knowledge_silos: usize,
    pub project_bus_factor: u32,
    pub files: Page<FileOwnership>,
}

/// Coupling bookkeeping with one page of pairs.
#[derive(Serialize)]
pub struct CouplingOutput {
    pub commits_analyzed: usize,
    pub bulk_commits_skipped: usize,
    pub pairs_matched: usize,
    pub pairs: Page<CouplingPair>,
}

fn json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).into_diagnostic()?;
    writeln!(out, "{text}").into_diagnostic()
}

fn page_footer<T>(out: &mut impl Write, page: &Page<T>) -> Result<()> {
    if page.total_pages > 1 {
        writeln!(
            out,
            "\nPage {} of {} ({} rows)",
            page.page, page.total_pages, page.total
        )
        .into_diagnostic()?;
    }
    Ok(())
}

pub fn hotspots(out: &mut impl Write, format: OutputFormat, page: &Page<Hotspot>) -> Result<()> {
    match format {
        OutputFormat::Json => json(out, page),
        OutputFormat::Markdown => {
            writeln!(out, "## Hotspots\n").into_diagnostic()?;
            if page.items.is_empty() {
                writeln!(out, "No files changed in the selected range.").into_diagnostic()?;
                return Ok(());
            }
            writeln!(out, "| Rank | File | Risk | Commits | Lines changed | Authors | Hotspot |")
                .into_diagnostic()?;
            writeln!(out, "|------|------|------|---------|---------------|---------|---------|")
                .into_diagnostic()?;
            let offset = (page.page - 1).saturating_mul(page.page_size);
            for (i, h) in page.items.iter().enumerate() {
                writeln!(
                    out,
                    "| {} | `{}` | {} | {} | {} | {} | {} |",
                    offset + i + 1,
                    h.file_path,
                    h.risk_level,
                    h.change_count,
                    h.total_changes,
                    h.authors,
                    if h.is_hotspot { "yes" } else { "" },
                )
                .into_diagnostic()?;
            }
            page_footer(out, page)
        }
        OutputFormat::Text => {
            if page.items.is_empty() {
                writeln!(out, "No files changed in the selected range.").into_diagnostic()?;
                return Ok(());
            }
            writeln!(
                out,
                "{:<9} {:>7} {:>9} {:>7}  FILE",
                "RISK", "COMMITS", "LINES", "AUTHORS"
            )
            .into_diagnostic()?;
            for h in &page.items {
                let marker = if h.is_hotspot { "  *" } else { "" };
                writeln!(
                    out,
                    "{:<9} {:>7} {:>9} {:>7}  {}{marker}",
                    h.risk_level.to_string(),
                    h.change_count,
                    h.total_changes,
                    h.authors,
                    h.file_path,
                )
                .into_diagnostic()?;
            }
            page_footer(out, page)
        }
    }
}

pub fn ownership(
    out: &mut impl Write,
    format: OutputFormat,
    report: &OwnershipReport,
) -> Result<()> {
    match format {
        OutputFormat::Json => json(out, report),
        OutputFormat::Markdown => {
            writeln!(out, "## Ownership & Bus Factor\n").into_diagnostic()?;
            writeln!(out, "- **Total files:** {}", report.total_files).into_diagnostic()?;
            writeln!(out, "- **Single-author files:** {}", report.single_author_files)
                .into_diagnostic()?;
            writeln!(out, "- **Knowledge silos:** {}", report.knowledge_silos)
                .into_diagnostic()?;
            writeln!(out, "- **Project bus factor:** {}\n", report.project_bus_factor)
                .into_diagnostic()?;
            if report.files.items.is_empty() {
                return Ok(());
            }
            writeln!(out, "| File | Owner | Share | Contributors | Bus factor | Risk |")
                .into_diagnostic()?;
            writeln!(out, "|------|-------|-------|--------------|------------|------|")
                .into_diagnostic()?;
            for f in &report.files.items {
                writeln!(
                    out,
                    "| `{}` | {} | {:.1}% | {} | {} | {} |",
                    f.file_path,
                    f.primary_owner.as_deref().unwrap_or("-"),
                    f.ownership_percentage,
                    f.total_contributors,
                    f.bus_factor,
                    f.risk_level,
                )
                .into_diagnostic()?;
            }
            page_footer(out, &report.files)
        }
        OutputFormat::Text => {
            writeln!(
                out,
                "{} files, {} single-author, {} knowledge silos, project bus factor {}",
                report.total_files,
                report.single_author_files,
                report.knowledge_silos,
                report.project_bus_factor
            )
            .into_diagnostic()?;
            if report.files.items.is_empty() {
                return Ok(());
            }
            writeln!(
                out,
                "\n{:<9} {:>7} {:>4}  {:<20} FILE",
                "RISK", "SHARE", "BUS", "OWNER"
            )
            .into_diagnostic()?;
            for f in &report.files.items {
                writeln!(
                    out,
                    "{:<9} {:>6.1}% {:>4}  {:<20} {}",
                    f.risk_level.to_string(),
                    f.ownership_percentage,
                    f.bus_factor,
                    f.primary_owner.as_deref().unwrap_or("-"),
                    f.file_path,
                )
                .into_diagnostic()?;
            }
            page_footer(out, &report.files)
        }
    }
}

pub fn coupling(out: &mut impl Write, format: OutputFormat, report: &CouplingOutput) -> Result<()> {
    match format {
        OutputFormat::Json => json(out, report),
        OutputFormat::Markdown => {
            writeln!(out, "## Temporal Coupling\n").into_diagnostic()?;
            writeln!(
                out,
                "**Commits analyzed:** {} ({} bulk commits skipped)\n",
                report.commits_analyzed, report.bulk_commits_skipped
            )
            .into_diagnostic()?;
            if report.pairs.items.is_empty() {
                writeln!(out, "No significant coupling detected.").into_diagnostic()?;
                return Ok(());
            }
            writeln!(out, "| File A | File B | Score | Shared | Commits A | Commits B |")
                .into_diagnostic()?;
            writeln!(out, "|--------|--------|-------|--------|-----------|-----------|")
                .into_diagnostic()?;
            for p in &report.pairs.items {
                writeln!(
                    out,
                    "| `{}` | `{}` | {:.2} | {} | {} | {} |",
                    p.file_a,
                    p.file_b,
                    p.coupling_score,
                    p.shared_commits,
                    p.total_commits_a,
                    p.total_commits_b,
                )
                .into_diagnostic()?;
            }
            page_footer(out, &report.pairs)
        }
        OutputFormat::Text => {
            if report.bulk_commits_skipped > 0 {
                writeln!(
                    out,
                    "{} bulk commits were left out of pairing",
                    report.bulk_commits_skipped
                )
                .into_diagnostic()?;
            }
            if report.pairs.items.is_empty() {
                writeln!(out, "No significant coupling detected.").into_diagnostic()?;
                return Ok(());
            }
            writeln!(out, "{:>5} {:>6}  PAIR", "SCORE", "SHARED").into_diagnostic()?;
            for p in &report.pairs.items {
                writeln!(
                    out,
                    "{:>5.2} {:>6}  {} <-> {}",
                    p.coupling_score, p.shared_commits, p.file_a, p.file_b,
                )
                .into_diagnostic()?;
            }
            page_footer(out, &report.pairs)
        }
    }
}

pub fn overview(out: &mut impl Write, format: OutputFormat, summary: &Overview) -> Result<()> {
    match format {
        OutputFormat::Json => json(out, summary),
        OutputFormat::Markdown => {
            writeln!(out, "## Overview\n").into_diagnostic()?;
            writeln!(out, "| Metric | Value |").into_diagnostic()?;
            writeln!(out, "|--------|-------|").into_diagnostic()?;
            for (label, value) in overview_rows(summary) {
                writeln!(out, "| {label} | {value} |").into_diagnostic()?;
            }
            if !summary.technical_debt_trend.is_empty() {
                writeln!(out, "\n### Technical debt trend\n").into_diagnostic()?;
                writeln!(out, "| Month | Score | Commits |").into_diagnostic()?;
                writeln!(out, "|-------|-------|---------|").into_diagnostic()?;
                for point in &summary.technical_debt_trend {
                    writeln!(
                        out,
                        "| {} | {:.1} | {} |",
                        point.month, point.score, point.commits
                    )
                    .into_diagnostic()?;
                }
            }
            Ok(())
        }
        OutputFormat::Text => {
            for (label, value) in overview_rows(summary) {
                writeln!(out, "{label:<20} {value}").into_diagnostic()?;
            }
            if !summary.technical_debt_trend.is_empty() {
                writeln!(out, "\nTechnical debt trend:").into_diagnostic()?;
                for point in &summary.technical_debt_trend {
                    let bar = "#".repeat((point.score / 5.0).round() as usize);
                    writeln!(out, "  {} {:>5.1} {bar}", point.month, point.score)
                        .into_diagnostic()?;
                }
            }
            Ok(())
        }
    }
}

fn overview_rows(summary: &Overview) -> Vec<(&'static str, String)> {
    vec![
        ("Files", summary.total_files.to_string()),
        ("Commits", summary.total_commits.to_string()),
        ("Contributors", summary.total_contributors.to_string()),
        ("Lines of code", summary.lines_of_code.to_string()),
        ("Hotspots", summary.hotspot_count.to_string()),
        ("Coupled pairs", summary.coupled_pairs.to_string()),
        ("High-risk files", summary.high_risk_files.to_string()),
        ("Project bus factor", summary.project_bus_factor.to_string()),
    ]
}
