//! Typed view over the engine's `info` output.
//!
//! `rrdtool info` prints one `key = value` pair per line, where the value is
//! an integer, a float in exponent notation, a quoted string, or `NaN` for
//! unknown. [`RrdInfo`] keeps every pair and offers typed accessors for the
//! handful of keys the wrapper cares about.
//!
//! ```text
//! step = 60
//! last_update = 1388534340
//! ds[data_source].type = "GAUGE"
//! ds[data_source].minimal_heartbeat = 360
//! ds[data_source].min = NaN
//! rra[0].cf = "LAST"
//! rra[0].rows = 2628000
//! rra[0].xff = 5.0000000000e-01
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{ConsolidationFn, DataSourceKind, RrdConfig};
use crate::error::EngineError;

/// A single value from `info` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InfoValue {
    /// An integer value.
    Integer(i64),
    /// A floating point value.
    Float(f64),
    /// A quoted string value, without the quotes.
    Text(String),
    /// `NaN`: the engine has no value.
    Unknown,
}

impl InfoValue {
    /// Parses the right-hand side of an `info` line.
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(text) = raw.strip_prefix('"') {
            return Some(Self::Text(text.strip_suffix('"')?.to_string()));
        }
        if raw.eq_ignore_ascii_case("nan") {
            return Some(Self::Unknown);
        }
        if let Ok(int) = raw.parse::<i64>() {
            return Some(Self::Integer(int));
        }
        raw.parse::<f64>().ok().map(|float| {
            if float.is_nan() {
                Self::Unknown
            } else {
                Self::Float(float)
            }
        })
    }

    /// Returns the value as a float, if numeric and known.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(int) => Some(*int as f64),
            Self::Float(float) => Some(*float),
            Self::Text(_) | Self::Unknown => None,
        }
    }

    /// Returns the value as a non-negative integer.
    ///
    /// Floats are accepted when they carry no fractional part.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Integer(int) => u64::try_from(*int).ok(),
            Self::Float(float) if *float >= 0.0 && float.fract() == 0.0 => Some(*float as u64),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Parsed `info` output for one RRD file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RrdInfo {
    entries: BTreeMap<String, InfoValue>,
}

impl RrdInfo {
    /// Parses the text printed by `rrdtool info`.
    ///
    /// Lines without a ` = ` separator are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Parse`] if a value cannot be interpreted.
    pub fn parse(output: &str) -> Result<Self, EngineError> {
        let mut entries = BTreeMap::new();
        for line in output.lines() {
            let Some((key, raw)) = line.split_once(" = ") else {
                continue;
            };
            let value = InfoValue::parse(raw).ok_or_else(|| EngineError::Parse {
                command: "info",
                reason: format!("bad value for '{}': {raw}", key.trim()),
            })?;
            entries.insert(key.trim().to_string(), value);
        }
        Ok(Self { entries })
    }

    /// Builds an info map from already-typed entries.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, InfoValue)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&InfoValue> {
        self.entries.get(key)
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InfoValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if no entries were parsed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Base step of the file in seconds.
    pub fn step(&self) -> Option<u64> {
        self.get("step").and_then(InfoValue::as_u64)
    }

    /// Unix time of the last update.
    pub fn last_update(&self) -> Option<u64> {
        self.get("last_update").and_then(InfoValue::as_u64)
    }

    /// Name of the first data source, in key order.
    pub fn ds_name(&self) -> Option<&str> {
        self.entries.keys().find_map(|key| {
            key.strip_prefix("ds[")
                .and_then(|rest| rest.strip_suffix("].type"))
        })
    }

    /// Consolidation function of archive `index`.
    pub fn rra_cf(&self, index: usize) -> Option<ConsolidationFn> {
        self.get(&format!("rra[{index}].cf"))
            .and_then(InfoValue::as_str)
            .and_then(|cf| cf.parse().ok())
    }

    /// Index of the first archive using `cf`.
    pub fn rra_index(&self, cf: ConsolidationFn) -> Option<usize> {
        (0..)
            .map_while(|index| {
                self.get(&format!("rra[{index}].cf"))
                    .map(|_| (index, self.rra_cf(index)))
            })
            .find_map(|(index, found)| (found == Some(cf)).then_some(index))
    }

    /// Whether the file has the layout this crate creates: a primary `LAST` archive.
    pub fn is_simple(&self) -> bool {
        self.rra_cf(0) == Some(ConsolidationFn::Last)
    }

    /// Reconstructs the configuration the file was created with.
    ///
    /// Returns `None` if a required key is missing.
    #[allow(clippy::cast_precision_loss)] // steps are far below 2^52
    pub fn config(&self) -> Option<RrdConfig> {
        let ds = self.ds_name()?;
        let step = self.step().filter(|step| *step > 0)?;
        let kind: DataSourceKind = self
            .get(&format!("ds[{ds}].type"))
            .and_then(InfoValue::as_str)?
            .parse()
            .ok()?;

        let bound = |name: &str| {
            self.get(&format!("ds[{ds}].{name}"))
                .and_then(InfoValue::as_f64)
                .map(|value| {
                    if kind.is_rate() {
                        value * step as f64
                    } else {
                        value
                    }
                })
        };

        let heartbeat = self
            .get(&format!("ds[{ds}].minimal_heartbeat"))
            .and_then(InfoValue::as_u64)?
            .div_ceil(step);

        Some(RrdConfig {
            step,
            kind,
            min: bound("min"),
            max: bound("max"),
            duration: self.get("rra[0].rows").and_then(InfoValue::as_u64)? * step,
            xff: self.get("rra[0].xff").and_then(InfoValue::as_f64)?,
            heartbeat: u32::try_from(heartbeat).ok()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"filename = "/var/tmp/test.rrd"
rrd_version = "0003"
step = 30
last_update = 1388534370
header_size = 2872
ds[data_source].index = 0
ds[data_source].type = "DERIVE"
ds[data_source].minimal_heartbeat = 150
ds[data_source].min = 2.0000000000e+00
ds[data_source].max = 4.0000000000e+00
ds[data_source].last_ds = "U"
ds[data_source].value = 0.0000000000e+00
ds[data_source].unknown_sec = 0
rra[0].cf = "LAST"
rra[0].rows = 2628000
rra[0].cur_row = 17
rra[0].pdp_per_row = 1
rra[0].xff = 1.0000000000e-01
rra[0].cdp_prep[0].value = NaN
rra[1].cf = "AVERAGE"
rra[1].rows = 912
rra[1].pdp_per_row = 2880
rra[2].cf = "MIN"
rra[3].cf = "MAX"
"#;

    #[test]
    fn test_parse_value_types() {
        let info = RrdInfo::parse(SAMPLE).unwrap();
        assert_eq!(
            info.get("filename"),
            Some(&InfoValue::Text("/var/tmp/test.rrd".to_string()))
        );
        assert_eq!(info.get("step"), Some(&InfoValue::Integer(30)));
        assert_eq!(
            info.get("rra[0].cdp_prep[0].value"),
            Some(&InfoValue::Unknown)
        );
        assert_eq!(info.get("ds[data_source].max"), Some(&InfoValue::Float(4.0)));
        assert_eq!(info.step(), Some(30));
        assert_eq!(info.last_update(), Some(1_388_534_370));
    }

    #[test]
    fn test_ds_name_and_archives() {
        let info = RrdInfo::parse(SAMPLE).unwrap();
        assert_eq!(info.ds_name(), Some("data_source"));
        assert_eq!(info.rra_cf(0), Some(ConsolidationFn::Last));
        assert_eq!(info.rra_index(ConsolidationFn::Min), Some(2));
        assert_eq!(info.rra_index(ConsolidationFn::Max), Some(3));
        assert!(info.is_simple());
    }

    #[test]
    fn test_config_round_trips_creation_parameters() {
        let info = RrdInfo::parse(SAMPLE).unwrap();
        let config = info.config().unwrap();
        assert_eq!(config.step, 30);
        assert_eq!(config.kind, DataSourceKind::Derive);
        assert_eq!(config.min, Some(60.0));
        assert_eq!(config.max, Some(120.0));
        assert_eq!(config.duration, 78_840_000);
        assert!((config.xff - 0.1).abs() < 1e-12);
        assert_eq!(config.heartbeat, 5);
    }

    #[test]
    fn test_unknown_bounds_stay_unknown() {
        let info = RrdInfo::from_entries([
            ("step", InfoValue::Integer(60)),
            ("ds[x].type", InfoValue::Text("GAUGE".to_string())),
            ("ds[x].minimal_heartbeat", InfoValue::Integer(361)),
            ("ds[x].min", InfoValue::Unknown),
            ("ds[x].max", InfoValue::Unknown),
            ("rra[0].cf", InfoValue::Text("LAST".to_string())),
            ("rra[0].rows", InfoValue::Integer(10)),
            ("rra[0].xff", InfoValue::Float(0.5)),
        ]);
        let config = info.config().unwrap();
        assert_eq!(config.min, None);
        assert_eq!(config.max, None);
        // rounds up to whole steps
        assert_eq!(config.heartbeat, 7);
        assert_eq!(config.duration, 600);
    }

    #[test]
    fn test_non_simple_layout() {
        let info = RrdInfo::from_entries([("rra[0].cf", InfoValue::Text("AVERAGE".to_string()))]);
        assert!(!info.is_simple());
        assert!(RrdInfo::default().config().is_none());
    }

    #[test]
    fn test_bad_value_is_a_parse_error() {
        let err = RrdInfo::parse("step = sixty\n").unwrap_err();
        assert!(matches!(err, EngineError::Parse { command: "info", .. }));
    }

    #[test]
    fn test_serializes_as_flat_json() {
        let info = RrdInfo::parse("step = 60\nrra[0].cf = \"LAST\"\nds[a].min = NaN\n").unwrap();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["step"], 60);
        assert_eq!(json["rra[0].cf"], "LAST");
        assert!(json["ds[a].min"].is_null());
    }
}
