//! One-shot commands: `build` rebuilds stale assets, `status` reports them.

use anyhow::{Result, bail};

use crate::{
    cli::common::Pipeline,
    core::is_shutdown,
    events::{SharedObserver, error_chain},
    log,
    strategy::{BuildOutcome, update},
    utils::plural_count,
};

/// Outcome counts of a `build` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub fresh: usize,
    pub built: usize,
    pub skipped: usize,
    pub degraded: usize,
    pub failed: usize,
}

impl BuildSummary {
    fn record(&mut self, outcome: BuildOutcome) {
        match outcome {
            BuildOutcome::Fresh => self.fresh += 1,
            BuildOutcome::Built => self.built += 1,
            BuildOutcome::Skipped => self.skipped += 1,
            BuildOutcome::Degraded => self.degraded += 1,
        }
    }
}

/// Rebuild every stale asset once, in config order.
///
/// Failures are reported through the observer and counted; the remaining
/// assets are still built.
pub fn build_assets(pipeline: &Pipeline, observer: &SharedObserver) -> BuildSummary {
    let mut summary = BuildSummary::default();

    for entry in pipeline.entries() {
        if is_shutdown() {
            break;
        }
        match update(&entry.asset, &*entry.strategy, &**observer) {
            Ok(outcome) => summary.record(outcome),
            Err(_) => summary.failed += 1,
        }
    }
    summary
}

/// `build` command: exits with an error if any asset failed.
pub fn run_build(pipeline: &Pipeline, observer: &SharedObserver) -> Result<()> {
    let summary = build_assets(pipeline, observer);

    log!(
        "build";
        "{} rebuilt, {} up to date",
        plural_count(summary.built, "asset"),
        summary.fresh
    );
    if summary.skipped > 0 {
        log!("build"; "{} skipped (no matching sources)", summary.skipped);
    }
    if summary.degraded > 0 {
        log!("build"; "{} kept previous output (tool failed)", summary.degraded);
    }
    if summary.failed > 0 {
        bail!("{} failed", plural_count(summary.failed, "asset"));
    }
    if summary.degraded > 0 {
        bail!("{} could not be rebuilt", plural_count(summary.degraded, "asset"));
    }
    Ok(())
}

/// Staleness of one asset, as shown by `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    Fresh { sources: usize },
    Stale { sources: usize },
    Error(String),
}

/// Rescan every asset without building anything.
pub fn asset_status(pipeline: &Pipeline) -> Vec<(String, AssetStatus)> {
    pipeline
        .entries()
        .iter()
        .map(|entry| {
            let asset = &entry.asset;
            let status = match asset.needs_update() {
                Ok(stale) => {
                    let sources = asset.snapshot().source_paths.len();
                    if stale {
                        AssetStatus::Stale { sources }
                    } else {
                        AssetStatus::Fresh { sources }
                    }
                }
                Err(err) => AssetStatus::Error(error_chain(&err)),
            };
            (asset.uri().to_owned(), status)
        })
        .collect()
}

/// `status` command.
pub fn run_status(pipeline: &Pipeline) -> Result<()> {
    if pipeline.is_empty() {
        log!("status"; "no assets configured");
        return Ok(());
    }

    let mut stale = 0;
    for (uri, status) in asset_status(pipeline) {
        match status {
            AssetStatus::Fresh { sources } => {
                log!("status"; "{uri}: fresh ({})", plural_count(sources, "source"));
            }
            AssetStatus::Stale { sources } => {
                stale += 1;
                log!("status"; "{uri}: stale ({})", plural_count(sources, "source"));
            }
            AssetStatus::Error(message) => log!("error"; "{uri}: {message}"),
        }
    }
    log!("status"; "{} of {} stale", stale, plural_count(pipeline.len(), "asset"));
    Ok(())
}
