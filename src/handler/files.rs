//! Static file endpoint, the innermost handler of the chain.

use std::path::PathBuf;

use anyhow::Result;
use tiny_http::Request;

use super::{Handler, path::resolve_path, response};

/// Serve files below `root`, 404 for everything else.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Handler for StaticFiles {
    fn handle(&self, request: Request) -> Result<()> {
        match resolve_path(request.url(), &self.root) {
            Some(path) => response::respond_file(request, &path),
            None => response::respond_not_found(request),
        }
    }
}
