//! Error types for the simple-rrd wrapper.
//!
//! Every operation returns a [`Result`]. An `Err` is either *not applicable*
//! (there is no file to act on, see [`RrdError::is_not_applicable`]) or a
//! genuine failure.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for all simple-rrd operations.
#[derive(Error, Debug)]
pub enum RrdError {
    /// No path has been set, or the path is empty.
    #[error("no RRD path configured")]
    NoPath,

    /// The RRD file does not exist.
    #[error("RRD file '{}' does not exist", path.display())]
    NotFound {
        /// The missing file.
        path: PathBuf,
    },

    /// The RRD file already exists and will not be recreated.
    #[error("RRD file '{}' already exists", path.display())]
    AlreadyExists {
        /// The existing file.
        path: PathBuf,
    },

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The file exists but is not an RRD whose first archive is `LAST`.
    #[error("RRD file '{}' is not readable as a simple RRD", path.display())]
    NotReadable {
        /// The offending file.
        path: PathBuf,
    },

    /// The effective user may not write the file.
    #[error("RRD file '{}' is not writable", path.display())]
    NotWritable {
        /// The offending file.
        path: PathBuf,
    },

    /// The update timestamp is not newer than the file's last update.
    #[error("timestamp {when} is not after last update {last_update}")]
    StaleTimestamp {
        /// The timestamp the update would have used.
        when: u64,
        /// The file's last update time.
        last_update: u64,
    },

    /// The parent directory cannot be created or written.
    #[error("directory '{}' is not writable", path.display())]
    Directory {
        /// The directory that could not be prepared.
        path: PathBuf,
    },

    /// Filesystem I/O failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The round-robin engine rejected the request.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl RrdError {
    /// Returns `true` when the operation simply did not apply.
    ///
    /// This is the case when no path is configured, the file is missing, or
    /// a read finds a file that was not laid out by this crate. All other
    /// errors are failures.
    pub fn is_not_applicable(&self) -> bool {
        matches!(
            self,
            Self::NoPath | Self::NotFound { .. } | Self::NotReadable { .. }
        )
    }
}

/// Validation failures for an [`RrdConfig`](crate::config::RrdConfig).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The step must be a positive number of seconds.
    #[error("step must be > 0")]
    ZeroStep,

    /// The retention duration must be a positive number of seconds.
    #[error("duration must be > 0")]
    ZeroDuration,

    /// The heartbeat must be at least one step.
    #[error("heartbeat must be > 0")]
    ZeroHeartbeat,

    /// The xfiles factor must lie strictly between 0 and 1.
    #[error("xff {0} must be in (0, 1)")]
    XffOutOfRange(f64),

    /// A min/max bound is NaN or infinite.
    #[error("{name} bound {value} is not finite")]
    NonFiniteBound {
        /// Which bound (`min` or `max`).
        name: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Both bounds are set and `min >= max`.
    #[error("min {min} must be less than max {max}")]
    BoundsOrder {
        /// The lower bound.
        min: f64,
        /// The upper bound.
        max: f64,
    },

    /// The data source kind is not one of the supported kinds.
    #[error("unsupported data source kind '{0}'")]
    UnsupportedKind(String),

    /// The consolidation function name is not recognised.
    #[error("unsupported consolidation function '{0}'")]
    UnsupportedConsolidation(String),
}

/// Errors raised while driving the external engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine binary could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// The program that failed to start.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The engine exited with a failure status.
    #[error("'{command}' failed ({status}): {stderr}")]
    Failed {
        /// The engine subcommand.
        command: &'static str,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Engine output could not be understood.
    #[error("unparseable {command} output: {reason}")]
    Parse {
        /// The engine subcommand.
        command: &'static str,
        /// What was wrong with the output.
        reason: String,
    },
}

/// Type alias for `Result<T, RrdError>`.
pub type Result<T> = std::result::Result<T, RrdError>;
