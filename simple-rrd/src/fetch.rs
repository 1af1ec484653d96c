//! Fetch results and read-path reconciliation.
//!
//! The engine answers a fetch at whatever resolution its archives hold, which
//! is not necessarily the step the caller asked for. This module turns a raw
//! [`FetchResult`] into the series the caller expects:
//!
//! 1. truncate to the requested window (`seconds / resolution` rows)
//! 2. convert NaN to unknown
//! 3. for rate kinds, multiply by the resolution to recover per-row deltas
//! 4. if the resolution is an exact multiple of the requested step, repeat
//!    each row to fill the finer grid; otherwise report the coarser step back
//!
//! # Example
//!
//! ```rust
//! use simple_rrd::config::DataSourceKind;
//! use simple_rrd::fetch::reconcile;
//!
//! // File stores 60s rows, caller wants 30s over two minutes.
//! let fetched = [1.0, 2.0, f64::NAN];
//! let out = reconcile(&fetched, 60, 30, 120, DataSourceKind::Gauge);
//! assert_eq!(out.values, vec![Some(1.0), Some(1.0), Some(2.0), Some(2.0)]);
//! assert_eq!(out.step, 30);
//! ```

use serde::Serialize;

use crate::config::DataSourceKind;
use crate::error::EngineError;

/// Rows returned by the engine for one data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    /// Data source names, in column order.
    pub ds_names: Vec<String>,
    /// End-of-row timestamps, one per row.
    pub timestamps: Vec<u64>,
    /// Values of the first data source, one per row. NaN means unknown.
    pub values: Vec<f64>,
    /// Seconds per row, when it can be determined.
    pub resolution: Option<u64>,
}

impl FetchResult {
    /// Parses the text printed by `rrdtool fetch`.
    ///
    /// The output is a header naming the data sources, a blank line, and one
    /// `timestamp: value [value...]` line per row. Resolution is taken from
    /// the spacing of the first two rows.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Parse`] for a malformed row.
    pub fn parse(output: &str) -> Result<Self, EngineError> {
        let mut ds_names = Vec::new();
        let mut timestamps = Vec::new();
        let mut values = Vec::new();

        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some((ts, rest)) = line.split_once(':') else {
                if ds_names.is_empty() {
                    ds_names = line.split_whitespace().map(str::to_string).collect();
                    continue;
                }
                return Err(EngineError::Parse {
                    command: "fetch",
                    reason: format!("unexpected line '{line}'"),
                });
            };

            let ts = ts.trim().parse::<u64>().map_err(|e| EngineError::Parse {
                command: "fetch",
                reason: format!("bad timestamp in '{line}': {e}"),
            })?;
            let first = rest.split_whitespace().next().ok_or_else(|| EngineError::Parse {
                command: "fetch",
                reason: format!("row without values: '{line}'"),
            })?;

            timestamps.push(ts);
            values.push(parse_sample(first).ok_or_else(|| EngineError::Parse {
                command: "fetch",
                reason: format!("bad value '{first}'"),
            })?);
        }

        let resolution = match timestamps.as_slice() {
            [first, second, ..] if second > first => Some(second - first),
            _ => None,
        };

        Ok(Self {
            ds_names,
            timestamps,
            values,
            resolution,
        })
    }
}

/// Parses one fetched value; every spelling of NaN becomes NaN.
fn parse_sample(raw: &str) -> Option<f64> {
    if raw.trim_start_matches(['-', '+']).eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    raw.parse().ok()
}

/// A series matched to the caller's step.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Values at `step` spacing; `None` is unknown.
    pub values: Vec<Option<f64>>,
    /// Spacing of `values` in seconds.
    pub step: u64,
}

/// Greatest common divisor of two steps.
///
/// ```rust
/// use simple_rrd::fetch::gcd;
///
/// assert_eq!(gcd(45, 60), 15);
/// assert_eq!(gcd(30, 60), 30);
/// assert_eq!(gcd(0, 60), 60);
/// ```
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Matches fetched rows to the requested step.
///
/// * `fetched` - raw values in row order, NaN for unknown
/// * `resolution` - seconds per fetched row
/// * `step` - spacing the caller wants
/// * `seconds` - length of the requested window
/// * `kind` - data source kind; rate kinds are scaled back to deltas
#[allow(clippy::cast_possible_truncation)] // row counts are bounded by the fetched slice
#[allow(clippy::cast_precision_loss)] // resolutions are far below 2^52
pub fn reconcile(
    fetched: &[f64],
    resolution: u64,
    step: u64,
    seconds: u64,
    kind: DataSourceKind,
) -> Reconciled {
    let rows = if resolution == 0 {
        0
    } else {
        (seconds / resolution).min(fetched.len() as u64) as usize
    };

    let values = fetched[..rows].iter().map(|&value| {
        if value.is_nan() {
            None
        } else if kind.is_rate() {
            Some(value * resolution as f64)
        } else {
            Some(value)
        }
    });

    if step > 0 && resolution > step && resolution % step == 0 {
        let repeat = (resolution / step) as usize;
        Reconciled {
            values: values
                .flat_map(|value| std::iter::repeat_n(value, repeat))
                .collect(),
            step,
        }
    } else {
        Reconciled {
            values: values.collect(),
            step: resolution,
        }
    }
}
