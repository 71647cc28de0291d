//! Timing decorator: report each request and how long the chain took.

use std::time::Instant;

use anyhow::Result;
use tiny_http::Request;

use super::{BoxHandler, Handler};
use crate::events::{BuildEvent, SharedObserver};

/// Outermost decorator of the chain.
pub struct Timing {
    observer: SharedObserver,
    next: BoxHandler,
}

impl Timing {
    pub fn new(observer: SharedObserver, next: BoxHandler) -> Self {
        Self { observer, next }
    }
}

impl Handler for Timing {
    fn handle(&self, request: Request) -> Result<()> {
        let path = request.url().to_owned();
        self.observer.observe(&BuildEvent::Request { path: &path });

        let start = Instant::now();
        let result = self.next.handle(request);
        self.observer.observe(&BuildEvent::Served {
            path: &path,
            elapsed: start.elapsed(),
        });
        result
    }
}
