//! The asset descriptor and its staleness scan.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use parking_lot::{Mutex, MutexGuard};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::uri::{self, UriMatch};
use super::walk::walk;
use super::AssetError;

/// Whether an asset produces one file or mirrors a directory tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every match feeds the single output at `dest_path`.
    #[default]
    File,
    /// The source subtree is mirrored below `dest_dir`.
    Folder,
}

/// Construction parameters of an [`Asset`].
#[derive(Debug, Clone)]
pub struct AssetSpec {
    pub source_dir: PathBuf,
    pub pattern: String,
    pub recursive: bool,
    pub dest_dir: PathBuf,
    pub uri: String,
    pub mode: Mode,
    pub uri_match: UriMatch,
}

/// Result of the latest scan. Replaced wholesale by every rescan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Matched files in walk order.
    pub source_paths: Vec<PathBuf>,
    /// Newest relevant source mtime. `None` when nothing contributed.
    pub source_mtime: Option<SystemTime>,
    /// Destination mtime. `None` when missing or empty (infinitely old).
    pub dest_mtime: Option<SystemTime>,
}

impl ScanState {
    /// Sources are strictly newer than the destination.
    pub fn is_stale(&self) -> bool {
        self.source_mtime > self.dest_mtime
    }

    /// Raise the known destination mtime after writing an output.
    pub fn raise_dest_mtime(&mut self, mtime: Option<SystemTime>) {
        if mtime > self.dest_mtime {
            self.dest_mtime = mtime;
        }
    }

    /// First matched source, the input of single-file builds.
    pub fn first_source(&self) -> Option<&Path> {
        self.source_paths.first().map(PathBuf::as_path)
    }
}

/// A source selection mapped to a destination, plus its latest scan.
///
/// Configuration fields never change after construction. The scan state
/// sits behind a lock so a rescan and the build that follows it can run
/// as one step per asset.
#[derive(Debug)]
pub struct Asset {
    source_dir: PathBuf,
    pattern: Regex,
    recursive: bool,
    dest_dir: PathBuf,
    uri: String,
    mode: Mode,
    uri_match: UriMatch,
    dest_path: PathBuf,
    state: Mutex<ScanState>,
}

impl Asset {
    /// Create an asset, compiling its source pattern.
    pub fn new(spec: AssetSpec) -> Result<Self, AssetError> {
        let pattern = Regex::new(&spec.pattern).map_err(|source| AssetError::Pattern {
            pattern: spec.pattern.clone(),
            source,
        })?;
        let dest_path = join_uri(&spec.dest_dir, &spec.uri);

        Ok(Self {
            source_dir: spec.source_dir,
            pattern,
            recursive: spec.recursive,
            dest_dir: spec.dest_dir,
            uri: spec.uri,
            mode: spec.mode,
            uri_match: spec.uri_match,
            dest_path,
            state: Mutex::new(ScanState::default()),
        })
    }

    /// Asset for a single output file built from the matching sources.
    pub fn file(
        source_dir: impl Into<PathBuf>,
        pattern: &str,
        recursive: bool,
        dest_dir: impl Into<PathBuf>,
        uri: &str,
    ) -> Result<Self, AssetError> {
        Self::new(AssetSpec {
            source_dir: source_dir.into(),
            pattern: pattern.to_owned(),
            recursive,
            dest_dir: dest_dir.into(),
            uri: uri.to_owned(),
            mode: Mode::File,
            uri_match: UriMatch::default(),
        })
    }

    /// Asset for a directory of files.
    pub fn folder(
        source_dir: impl Into<PathBuf>,
        pattern: &str,
        recursive: bool,
        dest_dir: impl Into<PathBuf>,
        uri: &str,
    ) -> Result<Self, AssetError> {
        Self::new(AssetSpec {
            source_dir: source_dir.into(),
            pattern: pattern.to_owned(),
            recursive,
            dest_dir: dest_dir.into(),
            uri: uri.to_owned(),
            mode: Mode::Folder,
            uri_match: UriMatch::default(),
        })
    }

    /// Switch folder matching to segment boundaries.
    pub fn with_uri_match(mut self, rule: UriMatch) -> Self {
        self.uri_match = rule;
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn dest_path(&self) -> &Path {
        &self.dest_path
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// Walk the source tree and stat the destination without touching the
    /// stored state.
    pub fn scan(&self) -> Result<ScanState, AssetError> {
        let entries = walk(&self.source_dir, self.recursive)?;
        let mut state = ScanState::default();

        for entry in entries.iter().filter(|e| !e.is_dir) {
            if self.pattern.is_match(&entry.path.to_string_lossy()) {
                state.source_paths.push(entry.path.clone());
                if self.mode == Mode::Folder {
                    state.source_mtime = state.source_mtime.max(entry.modified);
                }
            }
        }

        // A single output may pull in files the pattern does not name
        // (imported modules, partials), so every file in the tree counts.
        if self.mode == Mode::File {
            let all = if self.recursive {
                entries
            } else {
                walk(&self.source_dir, true)?
            };
            state.source_mtime = all
                .iter()
                .filter(|e| !e.is_dir)
                .map(|e| e.modified)
                .max()
                .flatten();
        }

        state.dest_mtime = fs::metadata(&self.dest_path)
            .ok()
            .filter(|m| m.len() > 0)
            .and_then(|m| m.modified().ok());

        Ok(state)
    }

    /// Re-walk the source tree and replace the stored scan state.
    pub fn rescan(&self) -> Result<(), AssetError> {
        let state = self.scan()?;
        *self.state.lock() = state;
        Ok(())
    }

    /// Rescan into an already locked state and report staleness.
    pub fn refresh(&self, state: &mut ScanState) -> Result<bool, AssetError> {
        *state = self.scan()?;
        Ok(state.is_stale())
    }

    /// Rescan, then report whether the sources are newer than the output.
    pub fn needs_update(&self) -> Result<bool, AssetError> {
        let mut state = self.state.lock();
        self.refresh(&mut state)
    }

    /// Lock the scan state for a rescan + build sequence.
    pub fn lock(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock()
    }

    /// Copy of the latest scan state.
    pub fn snapshot(&self) -> ScanState {
        self.state.lock().clone()
    }

    // ========================================================================
    // Request gating and output
    // ========================================================================

    /// Whether a request path belongs to this asset.
    pub fn matches_request_uri(&self, request_uri: &str) -> bool {
        uri::matches(&self.uri, request_uri, self.mode, self.uri_match)
    }

    /// Create every missing directory leading to the destination's parent.
    pub fn ensure_dest_dir(&self) -> Result<(), AssetError> {
        let Some(parent) = self.dest_path.parent() else {
            return Ok(());
        };
        fs::create_dir_all(parent).map_err(|source| AssetError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })
    }
}

/// Join a slash-separated uri onto `base`, keeping the result below `base`.
fn join_uri(base: &Path, uri: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(&uri.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                depth += 1;
            }
            Component::ParentDir if depth > 0 => {
                path.pop();
                depth -= 1;
            }
            _ => {}
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_000_000 + secs)
    }

    fn write(path: &Path, content: &str, mtime: SystemTime) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Asset::file("src", "(unclosed", false, "public", "/app.js").unwrap_err();
        assert!(matches!(err, AssetError::Pattern { .. }));
    }

    #[test]
    fn test_dest_path() {
        let asset = Asset::file("src", ".*", false, "public", "/js/app.js").unwrap();
        assert_eq!(asset.dest_path(), Path::new("public").join("js").join("app.js"));

        let asset = Asset::folder("src", ".*", false, "public", "/").unwrap();
        assert_eq!(asset.dest_path(), Path::new("public"));

        let asset = Asset::file("src", ".*", false, "public", "/../../etc/passwd").unwrap();
        assert_eq!(asset.dest_path(), Path::new("public").join("etc").join("passwd"));
    }

    #[test]
    fn test_missing_destination_is_stale() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src.join("app.js"), "app", at(100));

        let asset = Asset::file(&src, r"app\.js$", false, dir.path().join("public"), "/app.js")
            .unwrap();
        assert!(asset.needs_update().unwrap());

        let state = asset.snapshot();
        assert_eq!(state.source_paths, vec![src.join("app.js")]);
        assert_eq!(state.source_mtime, Some(at(100)));
        assert_eq!(state.dest_mtime, None);
    }

    #[test]
    fn test_newer_destination_is_fresh() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let public = dir.path().join("public");
        write(&src.join("app.js"), "app", at(100));

        let asset = Asset::file(&src, r"app\.js$", false, &public, "/app.js").unwrap();
        assert!(asset.needs_update().unwrap());

        write(&public.join("app.js"), "built", at(150));
        assert!(!asset.needs_update().unwrap());
        // No further work on repeated checks
        assert!(!asset.needs_update().unwrap());
    }

    #[test]
    fn test_equal_mtimes_are_fresh() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let public = dir.path().join("public");
        write(&src.join("app.js"), "app", at(100));
        write(&public.join("app.js"), "built", at(100));

        let asset = Asset::file(&src, r"app\.js$", false, &public, "/app.js").unwrap();
        assert!(!asset.needs_update().unwrap());
    }

    #[test]
    fn test_empty_destination_is_stale() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let public = dir.path().join("public");
        write(&src.join("app.js"), "app", at(100));
        write(&public.join("app.js"), "", at(10_000));

        let asset = Asset::file(&src, r"app\.js$", false, &public, "/app.js").unwrap();
        assert!(asset.needs_update().unwrap());
        assert_eq!(asset.snapshot().dest_mtime, None);
    }

    #[test]
    fn test_flat_scan_skips_subdirectories() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a");
        write(&src.join("top.js"), "top", at(100));
        write(&src.join("b/nested.js"), "nested", at(500));

        let asset = Asset::folder(&src, ".*", false, dir.path().join("public"), "/").unwrap();
        asset.rescan().unwrap();
        let state = asset.snapshot();
        assert_eq!(state.source_paths, vec![src.join("top.js")]);
        assert_eq!(state.source_mtime, Some(at(100)));

        let asset = Asset::folder(&src, ".*", true, dir.path().join("public"), "/").unwrap();
        asset.rescan().unwrap();
        let state = asset.snapshot();
        assert_eq!(
            state.source_paths,
            vec![src.join("b").join("nested.js"), src.join("top.js")]
        );
        assert_eq!(state.source_mtime, Some(at(500)));
    }

    #[test]
    fn test_flat_file_asset_still_tracks_whole_tree() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a");
        write(&src.join("main.js"), "main", at(100));
        write(&src.join("lib/dep.js"), "dep", at(300));

        let asset = Asset::file(&src, r"\.js$", false, dir.path().join("public"), "/main.js")
            .unwrap();
        asset.rescan().unwrap();
        let state = asset.snapshot();
        assert_eq!(state.source_paths, vec![src.join("main.js")]);
        assert_eq!(state.source_mtime, Some(at(300)));
    }

    #[test]
    fn test_file_mode_counts_unmatched_files() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("js");
        let public = dir.path().join("public");
        write(&src.join("app.min.js"), "min", at(100));
        write(&src.join("helper.js"), "helper", at(100));
        write(&public.join("app.min.js"), "built", at(200));

        let asset = Asset::file(&src, r"\.min\.js$", true, &public, "/app.min.js").unwrap();
        assert!(!asset.needs_update().unwrap());

        write(&src.join("helper.js"), "helper v2", at(300));
        assert!(asset.needs_update().unwrap());
        assert_eq!(asset.snapshot().source_paths, vec![src.join("app.min.js")]);
    }

    #[test]
    fn test_file_and_folder_mtime_rules_differ() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let public = dir.path().join("public");
        write(&src.join("app.js"), "app", at(100));
        write(&src.join("vendor.js"), "vendor", at(50));

        let file = Asset::file(&src, r"app\.js$", false, &public, "/app.js").unwrap();
        let folder = Asset::folder(&src, r"app\.js$", false, &public, "/app.js").unwrap();

        file.rescan().unwrap();
        folder.rescan().unwrap();
        assert_eq!(file.snapshot().source_mtime, Some(at(100)));
        assert_eq!(folder.snapshot().source_mtime, Some(at(100)));

        write(&src.join("vendor.js"), "vendor", at(200));
        write(&public.join("app.js"), "built", at(150));

        assert!(file.needs_update().unwrap());
        assert!(!folder.needs_update().unwrap());
        assert_eq!(file.snapshot().source_mtime, Some(at(200)));
        assert_eq!(folder.snapshot().source_mtime, Some(at(100)));
    }

    #[test]
    fn test_pattern_sees_full_path() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src.join("vendor/jquery.js"), "$", at(100));
        write(&src.join("app.js"), "app", at(100));

        let asset = Asset::folder(&src, r"vendor[/\\]", true, dir.path().join("public"), "/")
            .unwrap();
        asset.rescan().unwrap();
        assert_eq!(
            asset.snapshot().source_paths,
            vec![src.join("vendor").join("jquery.js")]
        );
    }

    #[test]
    fn test_no_matches_no_sources() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let asset = Asset::folder(&src, r"\.css$", true, dir.path().join("public"), "/").unwrap();
        assert!(!asset.needs_update().unwrap());
        assert!(asset.snapshot().source_paths.is_empty());
        assert_eq!(asset.snapshot().source_mtime, None);
    }

    #[test]
    fn test_rescan_replaces_state() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src.join("one.js"), "1", at(100));
        write(&src.join("two.js"), "2", at(100));

        let asset = Asset::folder(&src, r"\.js$", false, dir.path().join("public"), "/").unwrap();
        asset.rescan().unwrap();
        assert_eq!(asset.snapshot().source_paths.len(), 2);

        fs::remove_file(src.join("two.js")).unwrap();
        asset.rescan().unwrap();
        assert_eq!(asset.snapshot().source_paths, vec![src.join("one.js")]);
    }

    #[test]
    fn test_missing_source_dir_is_error() {
        let dir = TempDir::new().unwrap();
        let asset =
            Asset::file(dir.path().join("missing"), ".*", true, dir.path(), "/app.js").unwrap();
        assert!(matches!(asset.needs_update(), Err(AssetError::Walk { .. })));
    }

    #[test]
    fn test_ensure_dest_dir() {
        let dir = TempDir::new().unwrap();
        let public = dir.path().join("public");
        let asset = Asset::file("src", ".*", false, &public, "/js/vendor/app.js").unwrap();

        asset.ensure_dest_dir().unwrap();
        assert!(public.join("js/vendor").is_dir());
        assert!(!public.join("js/vendor/app.js").exists());
    }

    #[test]
    fn test_matches_request_uri_uses_mode() {
        let file = Asset::file("src", ".*", false, "public", "/static").unwrap();
        let folder = Asset::folder("src", ".*", false, "public", "/static").unwrap();
        let strict = Asset::folder("src", ".*", false, "public", "/static")
            .unwrap()
            .with_uri_match(UriMatch::Segment);

        assert!(!file.matches_request_uri("/static/site.css"));
        assert!(folder.matches_request_uri("/static/site.css"));
        assert!(folder.matches_request_uri("/staticfiles"));
        assert!(!strict.matches_request_uri("/staticfiles"));
        assert!(strict.matches_request_uri("/static/site.css"));
    }
}
