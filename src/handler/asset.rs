//! Asset decorator: rebuild a stale asset before the request moves on.

use std::sync::Arc;

use anyhow::Result;
use tiny_http::Request;

use super::{BoxHandler, Handler, response};
use crate::asset::Asset;
use crate::events::SharedObserver;
use crate::strategy::{Strategy, update};

/// Wraps `next`; requests owned by the asset trigger a rescan and, if the
/// output is stale, a rebuild with the configured strategy.
///
/// A failed build answers `500` instead of serving a stale or missing
/// output. A degraded build (the external tool failed) is logged and the
/// request continues to `next`.
pub struct AssetHandler {
    asset: Arc<Asset>,
    strategy: Arc<dyn Strategy>,
    observer: SharedObserver,
    next: BoxHandler,
}

impl AssetHandler {
    pub fn new(
        asset: Arc<Asset>,
        strategy: Arc<dyn Strategy>,
        observer: SharedObserver,
        next: BoxHandler,
    ) -> Self {
        Self {
            asset,
            strategy,
            observer,
            next,
        }
    }
}

impl Handler for AssetHandler {
    fn handle(&self, request: Request) -> Result<()> {
        if self.asset.matches_request_uri(request.url()) {
            if let Err(error) = update(&self.asset, &*self.strategy, &*self.observer) {
                return response::respond_build_error(request, &error);
            }
        }

        self.next.handle(request)
    }
}
