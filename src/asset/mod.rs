//! Asset descriptors and staleness detection.
//!
//! An [`Asset`] maps a selection of source files (directory + pattern) to a
//! destination below an output directory. Scanning compares the newest
//! relevant source mtime with the destination's mtime:
//!
//! ```text
//! file mode    src/**/*       ──► public/js/app.js     (every file counts)
//! folder mode  src/**/<match> ──► public/<same path>   (matches count)
//! ```

mod error;
mod scan;
mod uri;
pub mod walk;

pub use error::AssetError;
pub use scan::{Asset, AssetSpec, Mode, ScanState};
pub use uri::UriMatch;
