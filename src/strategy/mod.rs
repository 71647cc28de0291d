//! Build strategies: how a stale asset gets regenerated.
//!
//! | Strategy | Output                                               |
//! |----------|------------------------------------------------------|
//! | `copy`   | source file(s) duplicated verbatim                   |
//! | `bundle` | external tool run on the first matched source        |
//!
//! [`update`] is the single entry point used by both the request decorator
//! and the `build` command: it rescans and rebuilds while holding the
//! asset's lock.

pub mod bundle;
mod copy;

pub use bundle::BundleStrategy;
pub use copy::CopyStrategy;

use std::time::Instant;

use crate::asset::{Asset, AssetError, ScanState};
use crate::events::{BuildEvent, Observer};

/// What a build step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The destination was already up to date.
    Fresh,
    /// The asset was regenerated.
    Built,
    /// Stale, but there was nothing to build from.
    Skipped,
    /// The external tool failed; the previous output (if any) remains.
    Degraded,
}

/// A way of regenerating a stale asset.
pub trait Strategy: Send + Sync {
    /// Short name for logs and config (`copy`, `bundle`).
    fn name(&self) -> &'static str;

    /// Regenerate `asset`. `state` holds the scan that found it stale and
    /// may be updated with what the build wrote.
    fn build(
        &self,
        asset: &Asset,
        state: &mut ScanState,
        observer: &dyn Observer,
    ) -> Result<BuildOutcome, AssetError>;
}

/// Rescan `asset` and rebuild it with `strategy` if it is stale.
///
/// The asset stays locked for the whole step, so concurrent callers
/// queue up and find the output fresh once the first build is done.
pub fn update(
    asset: &Asset,
    strategy: &dyn Strategy,
    observer: &dyn Observer,
) -> Result<BuildOutcome, AssetError> {
    let mut state = asset.lock();
    let result = rebuild_if_stale(asset, strategy, &mut state, observer);

    if let Err(error) = &result {
        observer.observe(&BuildEvent::Failed {
            uri: asset.uri(),
            error,
        });
    }
    result
}

fn rebuild_if_stale(
    asset: &Asset,
    strategy: &dyn Strategy,
    state: &mut ScanState,
    observer: &dyn Observer,
) -> Result<BuildOutcome, AssetError> {
    if !asset.refresh(state)? {
        return Ok(BuildOutcome::Fresh);
    }

    observer.observe(&BuildEvent::Stale {
        uri: asset.uri(),
        sources: state.source_paths.len(),
    });

    let start = Instant::now();
    let outcome = strategy.build(asset, state, observer)?;
    if outcome == BuildOutcome::Built {
        observer.observe(&BuildEvent::Built {
            uri: asset.uri(),
            strategy: strategy.name(),
            elapsed: start.elapsed(),
        });
    }
    Ok(outcome)
}
