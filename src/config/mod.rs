//! Pipeline configuration management for `assetpipe.toml`.
//!
//! ```text
//! config/
//! ├── section/       # [serve] and [[asset]]
//! ├── types/         # ConfigError, ConfigDiagnostics
//! ├── util.rs        # config discovery, path normalization
//! └── mod.rs         # PipelineConfig (this file)
//! ```
//!
//! | Section     | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `[serve]`   | Development server (interface, port, root)     |
//! | `[[asset]]` | Asset mappings, in request chain order         |

pub mod section;
pub mod types;
mod util;

pub use section::{AssetConfig, ServeConfig};
pub use types::{ConfigDiagnostics, ConfigError};

use util::{find_config_file, normalize_path};

use crate::cli::{Cli, Commands};
use crate::{debug, log};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    net::IpAddr,
    path::{Path, PathBuf},
};

/// Root configuration structure representing assetpipe.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    /// Absolute path to the config file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root, the config file's directory
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub asset: Vec<AssetConfig>,
}

impl PipelineConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file; the project root is
    /// the file's parent directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = match find_config_file(&cli.config) {
            Some(path) => path,
            None => {
                let cwd = std::env::current_dir()
                    .context("Failed to get current working directory")?;
                return Err(ConfigError::NotFound(cwd.join(&cli.config)).into());
            }
        };

        let mut config = Self::from_path(&config_path)?;
        config.validate()?;

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.config_path = normalize_path(&config_path);
        config.normalize_paths(&root);
        config.apply_command_options(cli);

        debug!("config"; "loaded {}", config.config_path.display());
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Validate the raw (not yet normalized) configuration.
    ///
    /// Collects all errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        for (index, asset) in self.asset.iter().enumerate() {
            asset.validate(index, &mut diag);
        }
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Resolve every relative path against `root`.
    fn normalize_paths(&mut self, root: &Path) {
        let root = normalize_path(root);
        self.serve.root = normalize_path(&root.join(&self.serve.root));
        for asset in &mut self.asset {
            asset.normalize(&root);
        }
        self.root = root;
    }

    fn apply_command_options(&mut self, cli: &Cli) {
        if let Commands::Serve { interface, port } = &cli.command {
            self.apply_serve_options(*interface, *port);
        }
    }

    fn apply_serve_options(&mut self, interface: Option<IpAddr>, port: Option<u16>) {
        Self::update_option(&mut self.serve.interface, interface.as_ref());
        Self::update_option(&mut self.serve.port, port.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }
}

/// Parse config, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PipelineConfig {
    let (parsed, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
