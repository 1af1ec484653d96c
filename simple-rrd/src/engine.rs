//! The round-robin database engine seam.
//!
//! [`Engine`] mirrors the four engine commands the wrapper needs. Arguments
//! are passed exactly as the command line would receive them (see
//! [`command`](crate::command)), so any implementation speaking rrdtool's
//! argument syntax can stand in.
//!
//! [`Rrdtool`] is the production implementation: it runs the `rrdtool`
//! executable and parses its output.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use crate::error::EngineError;
use crate::fetch::FetchResult;
use crate::info::RrdInfo;

/// Default executable name, resolved through `PATH`.
pub const DEFAULT_PROGRAM: &str = "rrdtool";

/// Commands of a round-robin database engine.
pub trait Engine {
    /// Creates a file. `args[0]` is the path.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the engine rejects the request.
    fn create(&self, args: &[String]) -> Result<(), EngineError>;

    /// Appends `time:value` updates. `args[0]` is the path.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the engine rejects the request.
    fn update(&self, args: &[String]) -> Result<(), EngineError>;

    /// Reads rows from one archive. `args[0]` is the path, `args[1]` the
    /// consolidation function.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the engine rejects the request or its
    /// output cannot be parsed.
    fn fetch(&self, args: &[String]) -> Result<FetchResult, EngineError>;

    /// Describes a file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the file cannot be described.
    fn info(&self, path: &Path) -> Result<RrdInfo, EngineError>;
}

/// Engine backed by the `rrdtool` command line tool.
#[derive(Debug, Clone)]
pub struct Rrdtool {
    program: OsString,
}

impl Default for Rrdtool {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl Rrdtool {
    /// Uses the given executable instead of `rrdtool` on `PATH`.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns `true` if the executable can be started.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .output()
            .is_ok_and(|output| !output.stdout.is_empty() || output.status.success())
    }

    /// Builds the process for one subcommand.
    ///
    /// The C locale keeps numbers in the output parseable (`0.5`, never `0,5`).
    fn command<I, S>(&self, command: &str, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.env("LC_ALL", "C").arg(command).args(args);
        cmd
    }

    /// Runs one subcommand and returns its standard output.
    fn run<I, S>(&self, command: &'static str, args: I) -> Result<String, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = self.command(command, args);
        debug!(?cmd, "running engine command");

        let output = cmd.output().map_err(|source| EngineError::Spawn {
            program: self.program.to_string_lossy().into_owned(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(command, %stderr, "engine command failed");
            return Err(EngineError::Failed {
                command,
                status: output.status.to_string(),
                stderr,
            });
        }

        String::from_utf8(output.stdout).map_err(|e| EngineError::Parse {
            command,
            reason: e.to_string(),
        })
    }
}

impl Engine for Rrdtool {
    fn create(&self, args: &[String]) -> Result<(), EngineError> {
        self.run("create", args).map(drop)
    }

    fn update(&self, args: &[String]) -> Result<(), EngineError> {
        self.run("update", args).map(drop)
    }

    fn fetch(&self, args: &[String]) -> Result<FetchResult, EngineError> {
        FetchResult::parse(&self.run("fetch", args)?)
            .inspect_err(|e| warn!(%e, "unparseable fetch output"))
    }

    fn info(&self, path: &Path) -> Result<RrdInfo, EngineError> {
        RrdInfo::parse(&self.run("info", [path])?)
            .inspect_err(|e| warn!(%e, "unparseable info output"))
    }
}
