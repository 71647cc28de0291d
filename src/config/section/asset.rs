//! `[[asset]]` entries: one per source-to-destination mapping.
//!
//! ```toml
//! [[asset]]
//! strategy = "copy"          # copy | bundle
//! mode = "folder"            # file | folder
//! source = "assets"          # directory scanned for sources
//! pattern = ".*"             # regex over full source file paths
//! recursive = true
//! dest = "public"            # destination root
//! uri = "/static"            # request path owned by the asset
//! uri_match = "prefix"       # prefix | segment
//!
//! [[asset]]
//! strategy = "bundle"
//! source = "js"
//! pattern = "main\\.js$"
//! dest = "public"
//! uri = "/js/bundle.js"
//! tool = "browserify"                  # optional
//! fallback_dir = "node_modules/bin"    # optional
//! args = ["{source}", "-o", "{dest}"]  # optional
//! ```
//!
//! Entries are applied in file order: the first entry is the outermost
//! decorator of the request chain.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;

use crate::config::types::ConfigDiagnostics;
use crate::config::util::normalize_path;
use crate::asset::{Asset, AssetError, AssetSpec, Mode, UriMatch};
use crate::strategy::{BundleStrategy, CopyStrategy, Strategy, bundle};

/// Which strategy rebuilds the asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Copy,
    Bundle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub strategy: StrategyKind,
    pub mode: Mode,
    pub source: PathBuf,
    pub pattern: String,
    pub recursive: bool,
    pub dest: PathBuf,
    pub uri: String,
    pub uri_match: UriMatch,

    /// Bundle executable, looked up on `PATH`.
    pub tool: Option<String>,
    /// Where `tool` is looked up when it is not on `PATH`.
    pub fallback_dir: Option<PathBuf>,
    /// Argument template with `{source}` and `{dest}` placeholders.
    pub args: Option<Vec<String>>,

    /// Directory the bundle tool runs in, the project root
    #[serde(skip)]
    pub workdir: Option<PathBuf>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            mode: Mode::default(),
            source: PathBuf::new(),
            pattern: ".*".to_owned(),
            recursive: false,
            dest: PathBuf::new(),
            uri: String::new(),
            uri_match: UriMatch::default(),
            tool: None,
            fallback_dir: None,
            args: None,
            workdir: None,
        }
    }
}

impl AssetConfig {
    /// Check the raw entry. `index` is its position in the file.
    pub fn validate(&self, index: usize, diag: &mut ConfigDiagnostics) {
        let field = |name: &str| format!("asset[{index}].{name}");

        if self.source.as_os_str().is_empty() {
            diag.error(field("source"), "source directory must not be empty");
        }
        if self.dest.as_os_str().is_empty() {
            diag.error(field("dest"), "destination directory must not be empty");
        }
        if let Err(err) = Regex::new(&self.pattern) {
            diag.error(field("pattern"), format!("invalid regex: {err}"));
        }

        match self.strategy {
            StrategyKind::Bundle if self.mode == Mode::Folder => {
                diag.error_with_hint(
                    field("mode"),
                    "bundle assets produce a single file",
                    "use `mode = \"file\"` or `strategy = \"copy\"`",
                );
            }
            StrategyKind::Copy => {
                let bundle_only = [
                    ("tool", self.tool.is_some()),
                    ("fallback_dir", self.fallback_dir.is_some()),
                    ("args", self.args.is_some()),
                ];
                for (name, set) in bundle_only {
                    if set {
                        diag.error_with_hint(
                            field(name),
                            "only used by bundle assets",
                            "remove it or set `strategy = \"bundle\"`",
                        );
                    }
                }
            }
            StrategyKind::Bundle => {}
        }
    }

    /// Resolve relative paths against the config file's directory.
    pub fn normalize(&mut self, root: &Path) {
        self.source = normalize_path(&root.join(&self.source));
        self.dest = normalize_path(&root.join(&self.dest));
        let fallback = self
            .fallback_dir
            .take()
            .unwrap_or_else(|| PathBuf::from(bundle::DEFAULT_FALLBACK_DIR));
        self.fallback_dir = Some(normalize_path(&root.join(fallback)));
        self.workdir = Some(normalize_path(root));
    }

    /// Construct the runtime asset.
    pub fn to_asset(&self) -> Result<Asset, AssetError> {
        Asset::new(AssetSpec {
            source_dir: self.source.clone(),
            pattern: self.pattern.clone(),
            recursive: self.recursive,
            dest_dir: self.dest.clone(),
            uri: self.uri.clone(),
            mode: self.mode,
            uri_match: self.uri_match,
        })
    }

    pub fn to_strategy(&self) -> Arc<dyn Strategy> {
        match self.strategy {
            StrategyKind::Copy => Arc::new(CopyStrategy),
            StrategyKind::Bundle => Arc::new(self.bundler()),
        }
    }

    fn bundler(&self) -> BundleStrategy {
        let mut bundler = BundleStrategy::new(self.tool.as_deref().unwrap_or(bundle::DEFAULT_TOOL));
        if let Some(dir) = &self.fallback_dir {
            bundler = bundler.with_fallback_dir(dir);
        }
        if let Some(args) = &self.args {
            bundler = bundler.with_args(args.clone());
        }
        if let Some(dir) = &self.workdir {
            bundler = bundler.with_workdir(dir);
        }
        bundler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_asset_entries_in_order() {
        let config = test_parse_config(
            r#"
[[asset]]
strategy = "copy"
mode = "folder"
source = "assets"
recursive = true
dest = "public"
uri = "/static"
uri_match = "segment"

[[asset]]
strategy = "bundle"
source = "js"
pattern = "main\\.js$"
dest = "public"
uri = "/js/bundle.js"
tool = "esbuild"
args = ["{source}", "--bundle", "--outfile={dest}"]
"#,
        );

        assert_eq!(config.asset.len(), 2);
        let copy = &config.asset[0];
        assert_eq!(copy.strategy, StrategyKind::Copy);
        assert_eq!(copy.mode, Mode::Folder);
        assert_eq!(copy.pattern, ".*");
        assert!(copy.recursive);
        assert_eq!(copy.uri_match, UriMatch::Segment);

        let bundle = &config.asset[1];
        assert_eq!(bundle.strategy, StrategyKind::Bundle);
        assert_eq!(bundle.mode, Mode::File);
        assert_eq!(bundle.pattern, r"main\.js$");
        assert!(!bundle.recursive);
        assert_eq!(bundle.bundler().tool(), "esbuild");
        assert_eq!(bundle.to_strategy().name(), "bundle");
    }

    #[test]
    fn test_defaults() {
        let config = test_parse_config("[[asset]]\nsource = \"css\"\ndest = \"public\"");
        let asset = &config.asset[0];
        assert_eq!(asset.strategy, StrategyKind::Copy);
        assert_eq!(asset.mode, Mode::File);
        assert_eq!(asset.uri_match, UriMatch::Prefix);
        assert_eq!(asset.uri, "");
        assert_eq!(asset.bundler().tool(), bundle::DEFAULT_TOOL);
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let config = test_parse_config(
            r#"
[[asset]]
strategy = "bundle"
mode = "folder"
pattern = "(unclosed"
dest = "public"

[[asset]]
source = "img"
tool = "browserify"
"#,
        );

        let mut diag = ConfigDiagnostics::new();
        for (index, asset) in config.asset.iter().enumerate() {
            asset.validate(index, &mut diag);
        }

        let fields: Vec<_> = diag.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "asset[0].source",
                "asset[0].pattern",
                "asset[0].mode",
                "asset[1].dest",
                "asset[1].tool",
            ]
        );
    }

    #[test]
    fn test_normalize_resolves_against_root() {
        let root = tempfile::TempDir::new().unwrap();
        for dir in ["js", "public", "node_modules/bin"] {
            std::fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        let mut asset = AssetConfig {
            source: PathBuf::from("js"),
            dest: PathBuf::from("public"),
            ..AssetConfig::default()
        };
        asset.normalize(root.path());

        let root = normalize_path(root.path());
        assert_eq!(asset.source, root.join("js"));
        assert_eq!(asset.dest, root.join("public"));
        assert_eq!(
            asset.fallback_dir.as_deref(),
            Some(root.join("node_modules/bin").as_path())
        );
        assert_eq!(asset.workdir.as_deref(), Some(root.as_path()));
    }

    #[test]
    fn test_to_asset() {
        let asset = AssetConfig {
            mode: Mode::Folder,
            source: PathBuf::from("/srv/assets"),
            dest: PathBuf::from("/srv/public"),
            uri: "/static".to_owned(),
            ..AssetConfig::default()
        }
        .to_asset()
        .unwrap();

        assert_eq!(asset.mode(), Mode::Folder);
        assert_eq!(asset.dest_path(), Path::new("/srv/public/static"));
        assert!(asset.matches_request_uri("/static/app.css"));
    }
}
