//! Copy strategy: duplicate source files verbatim.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use super::{BuildOutcome, Strategy};
use crate::asset::{Asset, AssetError, Mode, ScanState, walk::walk};
use crate::events::{BuildEvent, Observer};

/// Copy the first match (file mode) or mirror the source tree (folder mode).
///
/// ```text
/// file:    src/app.js          -> public/<uri>
/// folder:  src/css/site.css    -> public/css/site.css
///          src/img/logo.png    -> public/img/logo.png
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyStrategy;

impl Strategy for CopyStrategy {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn build(
        &self,
        asset: &Asset,
        state: &mut ScanState,
        observer: &dyn Observer,
    ) -> Result<BuildOutcome, AssetError> {
        match asset.mode() {
            Mode::File => {
                let Some(source) = state.first_source().map(Path::to_path_buf) else {
                    observer.observe(&BuildEvent::Skipped {
                        uri: asset.uri(),
                        reason: "no source file matched",
                    });
                    return Ok(BuildOutcome::Skipped);
                };
                let mtime = fs::metadata(&source).and_then(|m| m.modified()).ok();
                copy_file(&source, asset.dest_path(), mtime, state, observer)?;
            }
            Mode::Folder => copy_tree(asset, state, observer)?,
        }
        Ok(BuildOutcome::Built)
    }
}

/// Mirror every entry below the source dir into the destination dir.
///
/// Non-recursive assets copy top-level files only; their subdirectories
/// are neither created nor entered.
fn copy_tree(
    asset: &Asset,
    state: &mut ScanState,
    observer: &dyn Observer,
) -> Result<(), AssetError> {
    let source_dir = asset.source_dir();

    for entry in walk(source_dir, asset.is_recursive())? {
        let rel = entry.path.strip_prefix(source_dir).unwrap_or(&entry.path);
        let dest = asset.dest_dir().join(rel);

        if entry.is_dir {
            if asset.is_recursive() {
                create_dir(&dest)?;
                observer.observe(&BuildEvent::CreatedDir { path: &dest });
            }
        } else {
            copy_file(&entry.path, &dest, entry.modified, state, observer)?;
        }
    }
    Ok(())
}

/// Copy one file, creating its parent directories.
///
/// Raises the in-memory destination mtime to the source's mtime so a
/// multi-file copy tracks the newest input without restatting outputs.
fn copy_file(
    source: &Path,
    dest: &Path,
    source_mtime: Option<SystemTime>,
    state: &mut ScanState,
    observer: &dyn Observer,
) -> Result<(), AssetError> {
    if let Some(parent) = dest.parent() {
        create_dir(parent)?;
    }

    if is_same_file(source, dest) {
        return Err(AssetError::SamePath {
            path: source.to_path_buf(),
        });
    }

    fs::copy(source, dest).map_err(|err| AssetError::Copy {
        from: source.to_path_buf(),
        to: dest.to_path_buf(),
        source: err,
    })?;
    observer.observe(&BuildEvent::Copied {
        from: source,
        to: dest,
    });

    state.raise_dest_mtime(source_mtime);
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), AssetError> {
    fs::create_dir_all(path).map_err(|source| AssetError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Same path, or two paths resolving to the same existing file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
