//! Configuration section definitions.
//!
//! | Module  | TOML Section | Purpose                              |
//! |---------|--------------|--------------------------------------|
//! | `asset` | `[[asset]]`  | Asset mappings and their strategies  |
//! | `serve` | `[serve]`    | Development server                   |

mod asset;
mod serve;

pub use asset::{AssetConfig, StrategyKind};
pub use serve::ServeConfig;
