//! Argument lists for the engine's `create`, `update` and `fetch` commands.
//!
//! These are pure functions of the configuration and the reference time, so
//! the exact arguments handed to the engine can be tested without running it.

use std::fmt;
use std::path::Path;

use crate::config::{ConsolidationFn, RrdConfig, SECONDS_PER_DAY};

/// Token the engine uses for an unknown value or bound.
pub const UNKNOWN: &str = "U";

/// One value written by an update.
///
/// Integers are kept exact so counters near the 64-bit boundary are written
/// without rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// No value for this step.
    Unknown,
    /// An exact integer reading.
    Integer(i128),
    /// A floating point reading.
    Float(f64),
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str(UNKNOWN),
            Self::Integer(int) => write!(f, "{int}"),
            Self::Float(float) if !float.is_finite() => f.write_str(UNKNOWN),
            Self::Float(float) => write!(f, "{float}"),
        }
    }
}

impl From<f64> for Sample {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

macro_rules! sample_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Sample {
            fn from(value: $ty) -> Self {
                Self::Integer(i128::from(value))
            }
        })*
    };
}

sample_from_int!(i32, i64, u32, u64);

impl<T: Into<Sample>> From<Option<T>> for Sample {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unknown, Into::into)
    }
}

/// Arguments of a fetch against a single archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    /// Archive consolidation function.
    pub cf: ConsolidationFn,
    /// Desired seconds per row.
    pub resolution: u64,
    /// Window start, unix seconds.
    pub start: u64,
    /// Window end, unix seconds.
    pub end: u64,
}

fn bound_arg(bound: Option<f64>) -> String {
    bound.map_or_else(|| UNKNOWN.to_string(), |value| value.to_string())
}

/// Builds the `create` arguments.
///
/// The file starts one step before `when` so the first update may land on
/// `when` itself. A primary `LAST` archive keeps every step for `duration`;
/// when the step is finer than a day and at least a day is kept, daily
/// `AVERAGE`, `MIN` and `MAX` rollups are added.
///
/// ```rust
/// use std::path::Path;
/// use simple_rrd::command::create_args;
/// use simple_rrd::config::RrdConfig;
///
/// let args = create_args(Path::new("/tmp/a.rrd"), "data_source", &RrdConfig::default(), 1_000_000);
/// assert_eq!(args[3], "DS:data_source:GAUGE:360:U:U");
/// assert_eq!(args[4], "RRA:LAST:0.5:1:2628000");
/// ```
pub fn create_args(path: &Path, ds_name: &str, config: &RrdConfig, when: u64) -> Vec<String> {
    let mut args = vec![
        path.display().to_string(),
        format!("--start={}", when.saturating_sub(config.step)),
        format!("--step={}", config.step),
    ];

    args.push(format!(
        "DS:{ds_name}:{}:{}:{}:{}",
        config.kind,
        config.heartbeat_seconds(),
        bound_arg(config.engine_bound(config.min)),
        bound_arg(config.engine_bound(config.max)),
    ));
    args.push(format!(
        "RRA:{}:{}:1:{}",
        ConsolidationFn::Last,
        config.xff,
        config.primary_rows()
    ));

    if config.has_rollups() {
        let steps = SECONDS_PER_DAY / config.step;
        let rows = config.duration / SECONDS_PER_DAY;
        for cf in ConsolidationFn::ROLLUPS {
            args.push(format!("RRA:{cf}:{}:{steps}:{rows}", config.xff));
        }
    }

    args
}

/// Builds the `update` arguments: one `time:value` pair per sample, `step` apart.
pub fn update_args(path: &Path, samples: &[Sample], when: u64, step: u64) -> Vec<String> {
    std::iter::once(path.display().to_string())
        .chain(
            samples
                .iter()
                .zip((0..).map(|i: u64| when.saturating_add(i.saturating_mul(step))))
                .map(|(sample, ts)| format!("{ts}:{sample}")),
        )
        .collect()
}

/// Builds the `fetch` arguments.
pub fn fetch_args(path: &Path, request: &FetchRequest) -> Vec<String> {
    vec![
        path.display().to_string(),
        request.cf.to_string(),
        format!("--resolution={}", request.resolution),
        format!("--start={}", request.start),
        format!("--end={}", request.end),
    ]
}
