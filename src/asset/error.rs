//! Asset error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while constructing, scanning or building an asset.
///
/// None of these terminate the process: the request layer decides what a
/// failed build means for the request being served.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid source pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid asset path `{}`", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory `{}`", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy `{}` to `{}`", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot copy `{}`: source and destination are the same", path.display())]
    SamePath { path: PathBuf },

    #[error("failed to find `{tool}` (searched PATH and `{}`)", fallback.display())]
    ToolNotFound { tool: String, fallback: PathBuf },
}

impl AssetError {
    /// Build a walk error from a `jwalk` failure, keeping the offending path.
    pub(crate) fn walk(root: &std::path::Path, err: jwalk::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_else(|| root.to_path_buf());
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
        Self::Walk { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_asset_error_display() {
        let err = AssetError::Walk {
            path: PathBuf::from("assets/js"),
            source: Error::new(ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("assets/js"));

        let err = AssetError::SamePath {
            path: PathBuf::from("public/app.js"),
        };
        let display = err.to_string();
        assert!(display.contains("public/app.js"));
        assert!(display.contains("same"));

        let err = AssetError::ToolNotFound {
            tool: "browserify".into(),
            fallback: PathBuf::from("node_modules/bin/browserify"),
        };
        assert!(err.to_string().contains("browserify"));
    }
}
