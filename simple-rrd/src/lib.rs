//! # simple-rrd
//!
//! Convenience wrapper around the rrdtool round-robin database.
//!
//! simple-rrd manages single-series RRD files through four operations:
//! create, read, update and delete. Only a file path is required. Every other
//! parameter has a sensible default, and an existing file's parameters are
//! read back from the file itself.
//!
//! ## Key Properties
//!
//! - One data source per file with a primary `LAST` archive at full resolution
//! - Daily `AVERAGE`/`MIN`/`MAX` rollups for sub-daily steps
//! - Reads at any step: coarser archives are padded to the requested spacing
//! - Counter-like kinds are returned as per-step deltas rather than rates
//! - Missing values round-trip as `None`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use simple_rrd::{DataSourceKind, SimpleRrd};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let midnight = 1_388_534_400;
//!
//! // A gauge sampled every 30 seconds
//! let mut rrd = SimpleRrd::at("/var/tmp/test.rrd", midnight);
//! rrd.config_mut().step = 30;
//! rrd.config_mut().kind = DataSourceKind::Gauge;
//! rrd.create()?;
//!
//! // Values are written `step` seconds apart from the reference time
//! rrd.update([Some(1.5), None, Some(2.0)])?;
//!
//! // Read 90 seconds back
//! for value in rrd.read(90)? {
//!     println!("{value:?}");
//! }
//!
//! rrd.delete()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`SimpleRrd`] - handle for one file; create, read, update, delete
//! - [`RrdConfig`] - step, kind, bounds, retention and heartbeat
//! - [`Engine`] - the seam to the database engine; [`Rrdtool`] drives the CLI
//! - [`RrdError`] - errors, split into "not applicable" and failures
//!
//! ## Modules
//!
//! - [`rrd`] - the wrapper
//! - [`config`] - parameters, defaults and validation
//! - [`command`] - engine argument lists
//! - [`engine`] - engine trait and the `rrdtool` process backend
//! - [`info`] - parsed file descriptions
//! - [`fetch`] - parsed fetch output and step reconciliation
//! - [`fsutil`] - permission and directory checks
//! - [`clock`] - reference timestamp sources
//! - [`error`] - error types

pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod fsutil;
pub mod info;
pub mod rrd;

// Re-export primary API types at crate root for convenience.
pub use clock::{AlignedClock, Clock, SystemClock};
pub use command::Sample;
pub use config::{ConsolidationFn, DataSourceKind, RrdConfig};
pub use engine::{Engine, Rrdtool};
pub use error::{ConfigError, EngineError, Result, RrdError};
pub use info::{InfoValue, RrdInfo};
pub use rrd::SimpleRrd;
