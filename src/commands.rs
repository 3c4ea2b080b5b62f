//! Subcommand handlers and their terminal output.

use std::io::{self, IsTerminal};
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use tracing::info;
use twmtg_core::config::LoadedConfig;
use twmtg_core::{
    CardVerdict, LegalityCounts, Pipeline, RULESET_VERSION, RunReport, Settings, SnapshotMeta,
};

use crate::ProcessExit;
use crate::cli::{CardArgs, CountArgs, CountMetric};
use crate::progress;

pub(crate) async fn run_populate(
    pipeline: &Pipeline,
    quiet: bool,
    no_progress: bool,
) -> Result<ProcessExit> {
    let show = progress::should_show_progress(
        io::stderr().is_terminal(),
        quiet,
        no_progress,
        progress::is_dumb_terminal(),
    );
    let (handle, stop) = progress::spawn_progress_ui(show, pipeline.progress());

    let result = pipeline.run().await;

    stop.store(true, Ordering::SeqCst);
    if let Some(handle) = handle {
        let _ = handle.await;
    }

    let report = result.context("populate failed")?;
    if !quiet {
        println!("{}", render_report(&report));
    }
    Ok(ProcessExit::Success)
}

pub(crate) async fn run_count(pipeline: &Pipeline, args: &CountArgs) -> Result<ProcessExit> {
    let store = pipeline
        .open_store()
        .await
        .context("failed to prepare snapshot")?;
    let counts = store.counts().await.context("failed to count cards")?;
    store.database().clone().close().await;

    println!("{}", format_count(args.metric(), &counts));
    Ok(ProcessExit::Success)
}

pub(crate) async fn run_card(pipeline: &Pipeline, args: &CardArgs) -> Result<ProcessExit> {
    let store = pipeline
        .open_store()
        .await
        .context("failed to prepare snapshot")?;
    let verdicts = store
        .find_by_name(&args.name)
        .await
        .with_context(|| format!("lookup of '{}' failed", args.name))?;
    store.database().clone().close().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
    } else if verdicts.is_empty() {
        println!("No card found matching '{}'", args.name);
    } else {
        let rendered: Vec<String> = verdicts.iter().map(render_card).collect();
        println!("{}", rendered.join("\n\n"));
    }

    if verdicts.is_empty() {
        info!(name = %args.name, "no matching card");
        return Ok(ProcessExit::NotFound);
    }
    Ok(ProcessExit::Success)
}

pub(crate) async fn run_meta(pipeline: &Pipeline) -> Result<ProcessExit> {
    let store = pipeline
        .open_store()
        .await
        .context("failed to prepare snapshot")?;
    let meta = store
        .snapshot_meta()
        .await
        .context("failed to read snapshot metadata")?;
    store.database().clone().close().await;

    println!("{}", render_meta(meta.as_ref()));
    Ok(ProcessExit::Success)
}

pub(crate) fn run_config(settings: &Settings, loaded: &LoadedConfig) -> ProcessExit {
    let source = match (&loaded.path, loaded.loaded_from_file()) {
        (Some(path), true) => format!("# loaded from {}", path.display()),
        (Some(path), false) => format!("# no config file at {} (defaults)", path.display()),
        (None, _) => "# no config location known (defaults)".to_string(),
    };
    println!("{source}\n{settings}");
    ProcessExit::Success
}

/// Formats `value` with `,` between thousands groups.
pub(crate) fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

pub(crate) fn format_count(metric: CountMetric, counts: &LegalityCounts) -> String {
    match metric {
        CountMetric::Legal => group_thousands(counts.legal),
        CountMetric::Illegal => group_thousands(counts.illegal),
        CountMetric::Total => group_thousands(counts.total()),
        CountMetric::IllegalPercentage => counts
            .illegal_percentage()
            .map_or_else(|| "n/a".to_string(), |pct| format!("{pct:.0}%")),
    }
}

pub(crate) fn render_card(verdict: &CardVerdict) -> String {
    let status = if verdict.legal { "LEGAL" } else { "ILLEGAL" };
    let mut out = format!(
        "{} - {status} ({} words)\n{}",
        verdict.name,
        verdict.word_count,
        verdict.text.replace("\\n", "\n")
    );
    if verdict.normalized_text != verdict.text {
        out.push_str(&format!("\ncounted: {}", verdict.normalized_text));
    }
    for printing in &verdict.printings {
        let set = printing.set_code.as_deref().unwrap_or("?");
        match &printing.tcgplayer_link {
            Some(link) => out.push_str(&format!("\n  {set}: {link}")),
            None => out.push_str(&format!("\n  {set}")),
        }
    }
    out
}

pub(crate) fn render_meta(meta: Option<&SnapshotMeta>) -> String {
    let snapshot = meta.map_or_else(
        || "mtgjson: unknown".to_string(),
        |meta| format!("mtgjson: {} ({})", meta.version, meta.date),
    );
    format!("ruleset: {RULESET_VERSION}\n{snapshot}")
}

pub(crate) fn render_report(report: &RunReport) -> String {
    format!(
        "snapshot: {}\nscanned {} cards: {} legal, {} illegal, {} without text",
        if report.fetched {
            "refreshed"
        } else {
            "up to date"
        },
        report.scanned,
        report.legal,
        report.illegal,
        report.skipped,
    )
}
