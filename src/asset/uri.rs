//! Request URI matching for assets.

use serde::{Deserialize, Serialize};

use super::Mode;

/// How a folder-mode asset claims request paths below its uri.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UriMatch {
    /// Literal string prefix: `/static` also claims `/staticfoo`.
    #[default]
    Prefix,
    /// Prefix that must end on a path segment boundary.
    Segment,
}

/// Decide whether `request_uri` belongs to an asset configured with `asset_uri`.
///
/// One leading `/` is stripped from both sides. File assets need an exact
/// match; folder assets match when their uri is empty or a prefix of the
/// request path.
pub fn matches(asset_uri: &str, request_uri: &str, mode: Mode, rule: UriMatch) -> bool {
    let asset_uri = asset_uri.strip_prefix('/').unwrap_or(asset_uri);
    let request_uri = request_uri.strip_prefix('/').unwrap_or(request_uri);

    if mode == Mode::File {
        return asset_uri == request_uri;
    }

    if asset_uri.is_empty() {
        return true;
    }

    let Some(rest) = request_uri.strip_prefix(asset_uri) else {
        return false;
    };

    match rule {
        UriMatch::Prefix => true,
        UriMatch::Segment => rest.is_empty() || asset_uri.ends_with('/') || rest.starts_with('/'),
    }
}
