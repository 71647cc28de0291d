//! External command execution utilities.
//!
//! Provides a Builder-based API for running tools whose stdout and stderr
//! are captured together, in the order the tool wrote them.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! let output = Cmd::new("browserify")
//!     .args(["js/main.js", "-o", "public/js/bundle.js"])
//!     .run()?;
//! if !output.status.success() {
//!     println!("{}", output.combined);
//! }
//! ```

use std::{
    ffi::{OsStr, OsString},
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};

/// Exit status and interleaved stdout/stderr of a finished command.
#[derive(Debug)]
pub struct CmdOutput {
    pub status: ExitStatus,
    pub combined: String,
}

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Add a single argument. Empty arguments are passed through as-is.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    pub fn program(&self) -> &Path {
        Path::new(&self.program)
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Run to completion, capturing stdout and stderr through one pipe.
    ///
    /// A nonzero exit is not an error here; callers inspect `status`.
    pub fn run(&self) -> io::Result<CmdOutput> {
        let (mut reader, writer) = io::pipe()?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;
        // Release our copies of the write end, or the read below never ends
        drop(cmd);

        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        let status = child.wait()?;

        Ok(CmdOutput {
            status,
            combined: String::from_utf8_lossy(&raw).into_owned(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("echo")
            .arg("hello")
            .args(["world", "!"])
            .cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.get_args().len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_empty_args_keep_position() {
        let cmd = Cmd::new("echo").arg("").args(["a", "", "b"]);
        assert_eq!(cmd.get_args(), &["", "a", "", "b"].map(OsString::from));
    }

    #[cfg(unix)]
    #[test]
    fn test_combined_output() {
        let output = Cmd::new("sh")
            .args(["-c", "echo out; echo err 1>&2; exit 3"])
            .run()
            .unwrap();
        assert!(!output.status.success());
        assert_eq!(output.status.code(), Some(3));
        assert!(output.combined.contains("out"));
        assert!(output.combined.contains("err"));
    }

    #[test]
    fn test_missing_program() {
        let result = Cmd::new("assetpipe-definitely-not-a-program").run();
        assert!(result.is_err());
    }
}
