//! Configuration types for simple-rrd files.
//!
//! An [`RrdConfig`] captures everything needed to create an RRD file: the
//! sampling step, data source kind, rollover bounds, retention and the
//! engine tuning knobs. Every field has a default, so a path is the only
//! thing a caller must supply.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default seconds between samples.
pub const DEFAULT_STEP: u64 = 60;

/// Default retention: five years of 365 days, in seconds.
pub const DEFAULT_DURATION: u64 = 60 * 60 * 24 * 365 * 5;

/// Default xfiles factor for the rollup archives.
pub const DEFAULT_XFF: f64 = 0.5;

/// Default number of steps allowed between updates before a value is unknown.
pub const DEFAULT_HEARTBEAT: u32 = 6;

/// Name of the data source in files created by this crate.
pub const DS_NAME: &str = "data_source";

/// Seconds in a day; the rollup archives consolidate to this resolution.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Data source kinds supported by [`SimpleRrd`](crate::SimpleRrd).
pub const SUPPORTED_KINDS: [DataSourceKind; 4] = [
    DataSourceKind::Gauge,
    DataSourceKind::Counter,
    DataSourceKind::Derive,
    DataSourceKind::Absolute,
];

/// How the engine interprets the values written to a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataSourceKind {
    /// Absolute readings, stored as given.
    #[default]
    Gauge,
    /// Ever-increasing counter; the engine stores per-second rates and
    /// handles 32/64-bit wraparound.
    Counter,
    /// Like a counter but may decrease.
    Derive,
    /// Counter that resets on every read; the value is the delta itself.
    Absolute,
}

impl DataSourceKind {
    /// Returns the engine's name for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gauge => "GAUGE",
            Self::Counter => "COUNTER",
            Self::Derive => "DERIVE",
            Self::Absolute => "ABSOLUTE",
        }
    }

    /// Returns `true` for kinds the engine stores as per-second rates.
    pub fn is_rate(self) -> bool {
        !matches!(self, Self::Gauge)
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSourceKind {
    type Err = ConfigError;

    /// Parses a kind name in any letter case.
    ///
    /// ```rust
    /// use simple_rrd::config::DataSourceKind;
    ///
    /// assert_eq!("derive".parse::<DataSourceKind>().unwrap(), DataSourceKind::Derive);
    /// assert_eq!("Counter".parse::<DataSourceKind>().unwrap(), DataSourceKind::Counter);
    /// assert!("foo".parse::<DataSourceKind>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SUPPORTED_KINDS
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnsupportedKind(s.to_string()))
    }
}

/// Consolidation function of a round-robin archive.
///
/// The primary archive of every file uses [`ConsolidationFn::Last`]; the daily
/// rollups use `Average`, `Min` and `Max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsolidationFn {
    /// Most recent primary value.
    Last,
    /// Arithmetic mean of the primary values.
    Average,
    /// Minimum of the primary values.
    Min,
    /// Maximum of the primary values.
    Max,
}

impl ConsolidationFn {
    /// Functions used by the daily rollup archives, in archive order.
    pub const ROLLUPS: [Self; 3] = [Self::Average, Self::Min, Self::Max];

    /// Returns the engine's name for this function.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last => "LAST",
            Self::Average => "AVERAGE",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

impl fmt::Display for ConsolidationFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsolidationFn {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Last, Self::Average, Self::Min, Self::Max]
            .into_iter()
            .find(|cf| cf.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnsupportedConsolidation(s.to_string()))
    }
}

/// Parameters of a simple RRD file.
///
/// Bounds are `None` when unknown (`U` to the engine). For rate kinds the
/// bounds are expressed per step, not per second; the conversion happens
/// when the file is created and undone when the configuration is read back.
///
/// # Example
///
/// ```rust
/// use simple_rrd::config::{DataSourceKind, RrdConfig};
///
/// let config = RrdConfig {
///     step: 30,
///     kind: DataSourceKind::Derive,
///     min: Some(0.0),
///     ..RrdConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.heartbeat_seconds(), 180);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrdConfig {
    /// Seconds between values.
    pub step: u64,

    /// Data source kind.
    pub kind: DataSourceKind,

    /// Lowest accepted value, if any.
    pub min: Option<f64>,

    /// Highest accepted value, if any.
    pub max: Option<f64>,

    /// Seconds of data kept in the primary archive.
    pub duration: u64,

    /// xfiles factor. Irrelevant for the primary `LAST` archive.
    pub xff: f64,

    /// Steps allowed between updates before the value becomes unknown.
    pub heartbeat: u32,
}

impl Default for RrdConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            kind: DataSourceKind::Gauge,
            min: None,
            max: None,
            duration: DEFAULT_DURATION,
            xff: DEFAULT_XFF,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }
}

impl RrdConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step == 0 {
            return Err(ConfigError::ZeroStep);
        }

        for (name, bound) in [("min", self.min), ("max", self.max)] {
            if let Some(value) = bound
                && !value.is_finite()
            {
                return Err(ConfigError::NonFiniteBound { name, value });
            }
        }

        if let (Some(min), Some(max)) = (self.min, self.max)
            && min >= max
        {
            return Err(ConfigError::BoundsOrder { min, max });
        }

        if self.duration == 0 {
            return Err(ConfigError::ZeroDuration);
        }

        // NaN fails both comparisons
        if !(self.xff > 0.0 && self.xff < 1.0) {
            return Err(ConfigError::XffOutOfRange(self.xff));
        }

        if self.heartbeat == 0 {
            return Err(ConfigError::ZeroHeartbeat);
        }

        Ok(())
    }

    /// Returns `true` if [`validate`](Self::validate) succeeds.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Heartbeat in seconds, as the engine expects it.
    pub fn heartbeat_seconds(&self) -> u64 {
        u64::from(self.heartbeat) * self.step
    }

    /// Rows in the primary archive.
    pub fn primary_rows(&self) -> u64 {
        self.duration / self.step
    }

    /// Whether the daily rollup archives are created.
    ///
    /// They need a sub-daily step and at least one day of retention.
    pub fn has_rollups(&self) -> bool {
        self.step < SECONDS_PER_DAY && self.duration >= SECONDS_PER_DAY
    }

    /// Converts a per-step bound into the value handed to the engine.
    ///
    /// Rate kinds are stored per second, so the bound is divided by the step.
    #[allow(clippy::cast_precision_loss)] // steps are far below 2^52
    pub fn engine_bound(&self, bound: Option<f64>) -> Option<f64> {
        bound.map(|value| {
            if self.kind.is_rate() {
                value / self.step as f64
            } else {
                value
            }
        })
    }
}
