//! Build events and the observers that receive them.
//!
//! Strategies and request decorators never log directly. They report
//! [`BuildEvent`]s to an injected [`Observer`]; the binary installs
//! [`LogObserver`], tests install a recorder and assert on what happened.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::asset::AssetError;
use crate::utils::plural_count;
use crate::{debug, log};

/// Something observable that happened while serving or building an asset.
#[derive(Debug)]
pub enum BuildEvent<'a> {
    /// A request arrived at the timing decorator.
    Request { path: &'a str },
    /// The downstream chain answered a request.
    Served { path: &'a str, elapsed: Duration },
    /// A matching request found the asset out of date.
    Stale { uri: &'a str, sources: usize },
    /// A directory was created in the destination tree.
    CreatedDir { path: &'a Path },
    /// A file was copied.
    Copied { from: &'a Path, to: &'a Path },
    /// An external tool is about to run.
    Command { program: &'a Path, args: &'a [OsString] },
    /// An external tool failed; the request is still served.
    CommandFailed { program: &'a Path, detail: &'a str, output: &'a str },
    /// A stale asset had nothing to build from.
    Skipped { uri: &'a str, reason: &'a str },
    /// A rebuild finished.
    Built { uri: &'a str, strategy: &'a str, elapsed: Duration },
    /// A rebuild or scan failed.
    Failed { uri: &'a str, error: &'a AssetError },
}

impl BuildEvent<'_> {
    /// Logger module prefix for this event.
    pub fn module(&self) -> &'static str {
        match self {
            Self::Request { .. } | Self::Served { .. } => "request",
            Self::CreatedDir { .. } | Self::Copied { .. } => "copy",
            Self::Command { .. } | Self::CommandFailed { .. } => "bundle",
            Self::Failed { .. } => "error",
            Self::Stale { .. } | Self::Skipped { .. } | Self::Built { .. } => "build",
        }
    }

    /// Routine events that only show up with `--verbose`.
    pub fn is_detail(&self) -> bool {
        matches!(self, Self::CreatedDir { .. } | Self::Copied { .. } | Self::Stale { .. })
    }
}

impl fmt::Display for BuildEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { path } => write!(f, "> {path}"),
            Self::Served { path, elapsed } => write!(f, "< {path} ({elapsed:?})"),
            Self::Stale { uri, sources } => {
                write!(f, "{uri} is stale ({})", plural_count(*sources, "source"))
            }
            Self::CreatedDir { path } => write!(f, "mkdir {}", path.display()),
            Self::Copied { from, to } => write!(f, "{} -> {}", from.display(), to.display()),
            Self::Command { program, args } => {
                write!(f, "running `{}", program.display())?;
                for arg in args.iter() {
                    write!(f, " {}", arg.to_string_lossy())?;
                }
                write!(f, "`")
            }
            Self::CommandFailed {
                program,
                detail,
                output,
            } => {
                write!(f, "`{}` failed ({detail})", program.display())?;
                let output = output.trim();
                if !output.is_empty() {
                    write!(f, ":\n{output}")?;
                }
                Ok(())
            }
            Self::Skipped { uri, reason } => write!(f, "{uri} skipped: {reason}"),
            Self::Built {
                uri,
                strategy,
                elapsed,
            } => write!(f, "{uri} rebuilt by {strategy} in {elapsed:?}"),
            Self::Failed { uri, error } => write!(f, "{uri}: {}", error_chain(*error)),
        }
    }
}

/// Render an error with its sources, `outer: inner: root`.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Receiver of build events.
pub trait Observer: Send + Sync {
    fn observe(&self, event: &BuildEvent<'_>);
}

/// Shared observer handle.
pub type SharedObserver = Arc<dyn Observer>;

/// Forward events to the terminal logger.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn observe(&self, event: &BuildEvent<'_>) {
        if event.is_detail() {
            debug!(event.module(); "{}", event);
        } else {
            log!(event.module(); "{}", event);
        }
    }
}

/// Shared handle to the default logging observer.
pub fn log_observer() -> SharedObserver {
    Arc::new(LogObserver)
}

/// Observer that keeps rendered events for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Recorder {
    events: parking_lot::Mutex<Vec<String>>,
}

#[cfg(test)]
impl Recorder {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events.lock().iter().any(|e| e.contains(needle))
    }
}

#[cfg(test)]
impl Observer for Recorder {
    fn observe(&self, event: &BuildEvent<'_>) {
        self.events
            .lock()
            .push(format!("[{}] {}", event.module(), event));
    }
}
