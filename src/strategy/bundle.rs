//! Bundle strategy: run an external tool on the first matched source.
//!
//! The default invocation is `browserify <source> -o <dest>`. Any tool
//! taking an input and an output path works the same way, e.g. a
//! stylesheet compiler with `args = ["{source}", "{dest}"]`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{BuildOutcome, Strategy};
use crate::asset::{Asset, AssetError, ScanState};
use crate::events::{BuildEvent, Observer};
use crate::utils::exec::Cmd;

/// Default bundling executable.
pub const DEFAULT_TOOL: &str = "browserify";
/// Where the tool is looked up when it is not on `PATH`.
pub const DEFAULT_FALLBACK_DIR: &str = "./node_modules/bin";
/// Placeholder replaced by the first matched source path.
pub const SOURCE_PLACEHOLDER: &str = "{source}";
/// Placeholder replaced by the asset's destination path.
pub const DEST_PLACEHOLDER: &str = "{dest}";

/// Run an external bundler/compiler to produce a file-mode asset.
///
/// A missing tool is an error. A tool that runs and fails is not: its
/// output is reported and the previous build (if any) keeps being served.
#[derive(Debug, Clone)]
pub struct BundleStrategy {
    tool: String,
    fallback_dir: PathBuf,
    args: Vec<String>,
    workdir: Option<PathBuf>,
}

impl Default for BundleStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL)
    }
}

impl BundleStrategy {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            fallback_dir: PathBuf::from(DEFAULT_FALLBACK_DIR),
            args: default_args(),
            workdir: None,
        }
    }

    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = dir.into();
        self
    }

    /// Argument template; `{source}` and `{dest}` are substituted per build.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Run the tool from `dir` instead of the current directory.
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Locate the tool on `PATH`, then below the fallback directory.
    pub fn resolve(&self) -> Result<PathBuf, AssetError> {
        if let Ok(path) = which::which(&self.tool) {
            return Ok(path);
        }

        let fallback = self.fallback_dir.join(&self.tool);
        let fallback = std::path::absolute(&fallback).unwrap_or(fallback);
        if fallback.is_file() {
            Ok(fallback)
        } else {
            Err(AssetError::ToolNotFound {
                tool: self.tool.clone(),
                fallback,
            })
        }
    }

    fn command(&self, program: &Path, source: &Path, dest: &Path) -> Cmd {
        let source = source.to_string_lossy();
        let dest = dest.to_string_lossy();
        let args = self
            .args
            .iter()
            .map(|arg| OsString::from(substitute(arg, &source, &dest)));
        let cmd = Cmd::new(program).args(args);
        match &self.workdir {
            Some(dir) => cmd.cwd(dir),
            None => cmd,
        }
    }
}

/// Expand `{source}` and `{dest}` in one pass; substituted text is never
/// rescanned.
fn substitute(template: &str, source: &str, dest: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(SOURCE_PLACEHOLDER) {
            out.push_str(source);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(DEST_PLACEHOLDER) {
            out.push_str(dest);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// `browserify`'s calling convention: `<source> -o <dest>`.
pub fn default_args() -> Vec<String> {
    vec![
        SOURCE_PLACEHOLDER.to_owned(),
        "-o".to_owned(),
        DEST_PLACEHOLDER.to_owned(),
    ]
}

impl Strategy for BundleStrategy {
    fn name(&self) -> &'static str {
        "bundle"
    }

    fn build(
        &self,
        asset: &Asset,
        state: &mut ScanState,
        observer: &dyn Observer,
    ) -> Result<BuildOutcome, AssetError> {
        asset.ensure_dest_dir()?;

        let Some(source) = state.first_source() else {
            observer.observe(&BuildEvent::Skipped {
                uri: asset.uri(),
                reason: "no source file matched, nothing to bundle",
            });
            return Ok(BuildOutcome::Skipped);
        };

        let program = self.resolve()?;
        let cmd = self.command(&program, source, asset.dest_path());
        observer.observe(&BuildEvent::Command {
            program: cmd.program(),
            args: cmd.get_args(),
        });

        let (detail, output) = match cmd.run() {
            Ok(output) if output.status.success() => {
                state.dest_mtime = std::fs::metadata(asset.dest_path())
                    .ok()
                    .filter(|m| m.len() > 0)
                    .and_then(|m| m.modified().ok());
                return Ok(BuildOutcome::Built);
            }
            Ok(output) => (output.status.to_string(), output.combined),
            Err(err) => (err.to_string(), String::new()),
        };

        observer.observe(&BuildEvent::CommandFailed {
            program: &program,
            detail: &detail,
            output: &output,
        });
        Ok(BuildOutcome::Degraded)
    }
}
