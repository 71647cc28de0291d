//! Request handler chain.
//!
//! Decorators wrap the next handler and decide per request whether to do
//! work first; the innermost handler answers the request:
//!
//! ```text
//! Timing ──► AssetHandler(copy) ──► AssetHandler(bundle) ──► StaticFiles
//! ```
//!
//! Decorators only read `request.url()` (the raw request URI) and never
//! modify the request.

mod asset;
mod files;
mod path;
pub mod response;
mod timing;

pub use asset::AssetHandler;
pub use files::StaticFiles;
pub use timing::Timing;

use anyhow::Result;
use tiny_http::Request;

/// Something that answers an HTTP request.
pub trait Handler: Send + Sync {
    fn handle(&self, request: Request) -> Result<()>;
}

impl<F> Handler for F
where
    F: Fn(Request) -> Result<()> + Send + Sync,
{
    fn handle(&self, request: Request) -> Result<()> {
        self(request)
    }
}

/// Owned handler at the end of a decorator.
pub type BoxHandler = Box<dyn Handler>;
