//! Utility modules shared by the pipeline and the server.

pub mod exec;
pub mod mime;
mod plural;

pub use plural::plural_count;
