//! The create/read/update/delete wrapper around one RRD file.
//!
//! [`SimpleRrd`] needs only a path. Every other parameter has a default
//! (see [`RrdConfig`]), and when the file already exists its parameters are
//! read back from the engine so the wrapper always describes the file on disk.
//!
//! # Outcomes
//!
//! Each operation returns a [`Result`]. Errors for which
//! [`RrdError::is_not_applicable`] holds mean there was nothing to act on
//! (no path, no file); anything else is a failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use simple_rrd::SimpleRrd;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let midnight = 1_388_534_400;
//! let mut rrd = SimpleRrd::at("/var/tmp/test.rrd", midnight);
//! rrd.create()?;
//! rrd.update([2, 4, 6, 8, 10])?;          // five minutes of values
//! let values = rrd.read(180)?;            // [2.0, 4.0, 6.0]
//! assert_eq!(values, vec![Some(2.0), Some(4.0), Some(6.0)]);
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::command::{FetchRequest, Sample, create_args, fetch_args, update_args};
use crate::config::{ConsolidationFn, DS_NAME, RrdConfig, SECONDS_PER_DAY};
use crate::engine::{Engine, Rrdtool};
use crate::error::{Result, RrdError};
use crate::fetch::{gcd, reconcile};
use crate::fsutil;
use crate::info::RrdInfo;

/// Default window for [`SimpleRrd::read`]: one day.
pub const DEFAULT_READ_SECONDS: u64 = SECONDS_PER_DAY;

/// Create/read/update/delete handle for a single RRD file.
///
/// The handle is single-threaded; callers sharing one across threads must
/// synchronise externally.
#[derive(Debug)]
pub struct SimpleRrd<E = Rrdtool> {
    /// Path of the RRD file, if any.
    path: Option<PathBuf>,
    /// Reference time for create, update and read, in unix seconds.
    when: u64,
    /// File parameters.
    config: RrdConfig,
    /// Copy of the values returned by the last read.
    values: Vec<Option<f64>>,
    /// The engine driving the file.
    engine: E,
}

impl Default for SimpleRrd {
    fn default() -> Self {
        Self::with_engine(Rrdtool::default(), None, SystemClock.now())
    }
}

impl SimpleRrd {
    /// Wraps the file at `path`, using the current time as the reference.
    ///
    /// If the file exists, its parameters replace the defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::at(path, SystemClock.now())
    }

    /// Wraps the file at `path` with an explicit reference time.
    pub fn at(path: impl Into<PathBuf>, when: u64) -> Self {
        Self::with_engine(Rrdtool::default(), Some(path.into()), when)
    }
}

impl<E: Engine> SimpleRrd<E> {
    /// Wraps a file using a specific engine.
    pub fn with_engine(engine: E, path: Option<PathBuf>, when: u64) -> Self {
        let mut rrd = Self {
            path,
            when,
            config: RrdConfig::default(),
            values: Vec::new(),
            engine,
        };
        rrd.load_config();
        rrd
    }

    /// Path of the RRD file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Points the wrapper at another file.
    ///
    /// If the new file exists and is readable, its parameters are loaded.
    pub fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
        self.load_config();
    }

    /// Reference time in unix seconds.
    pub fn when(&self) -> u64 {
        self.when
    }

    /// Sets the reference time.
    pub fn set_when(&mut self, when: u64) {
        self.when = when;
    }

    /// Current parameters.
    pub fn config(&self) -> &RrdConfig {
        &self.config
    }

    /// Mutable access to the parameters.
    pub fn config_mut(&mut self) -> &mut RrdConfig {
        &mut self.config
    }

    /// Values returned by the most recent [`read`](Self::read).
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Checks that a path is set and the parameters are valid.
    ///
    /// # Errors
    ///
    /// [`RrdError::NoPath`] or [`RrdError::InvalidConfig`].
    pub fn validate(&self) -> Result<()> {
        self.require_path()?;
        self.config.validate()?;
        Ok(())
    }

    /// Returns `true` if [`validate`](Self::validate) succeeds.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Data source name: the file's first data source when readable,
    /// otherwise the name new files are created with.
    pub fn ds_name(&self) -> String {
        self.existing_path()
            .ok()
            .and_then(|path| self.readable_info(path).ok())
            .and_then(|info| info.ds_name().map(str::to_string))
            .unwrap_or_else(|| DS_NAME.to_string())
    }

    /// Whether the file exists.
    ///
    /// # Errors
    ///
    /// [`RrdError::NoPath`] if no path is set.
    pub fn exists(&self) -> Result<bool> {
        Ok(self.require_path()?.exists())
    }

    /// Whether the file exists and has a primary `LAST` archive.
    ///
    /// # Errors
    ///
    /// Not applicable if there is no path or no file.
    pub fn is_readable(&self) -> Result<bool> {
        let path = self.existing_path()?;
        Ok(self.engine.info(path).is_ok_and(|info| info.is_simple()))
    }

    /// Whether the effective user may write the file and it is readable.
    ///
    /// # Errors
    ///
    /// Not applicable if there is no path or no file.
    pub fn is_writable(&self) -> Result<bool> {
        let path = self.existing_path()?;
        Ok(fsutil::is_writable(path) && self.is_readable()?)
    }

    /// Engine description of the file.
    ///
    /// # Errors
    ///
    /// Not applicable if there is no path or no file; otherwise any engine error.
    pub fn info(&self) -> Result<RrdInfo> {
        let path = self.existing_path()?;
        Ok(self.engine.info(path)?)
    }

    /// Unix time of the file's last update, if the engine reports one.
    ///
    /// # Errors
    ///
    /// Not applicable if there is no path or no file; otherwise any engine error.
    pub fn last_update_time(&self) -> Result<Option<u64>> {
        Ok(self.info()?.last_update())
    }

    /// Creates the file with the current parameters.
    ///
    /// The file starts one step before the reference time, so the first
    /// update may be written at the reference time itself. Missing parent
    /// directories are created when possible.
    ///
    /// # Errors
    ///
    /// - [`RrdError::NoPath`] if no path is set
    /// - [`RrdError::AlreadyExists`] if the file exists
    /// - [`RrdError::InvalidConfig`] if the parameters are invalid
    /// - [`RrdError::Directory`] if the directory cannot be prepared
    /// - [`RrdError::Engine`] if the engine refuses
    pub fn create(&self) -> Result<()> {
        let path = self.require_path()?;
        if path.exists() {
            return Err(RrdError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        self.config.validate()?;
        fsutil::ensure_directory(path)?;

        self.engine
            .create(&create_args(path, DS_NAME, &self.config, self.when))?;
        info!(path = %path.display(), step = self.config.step, kind = %self.config.kind, "created RRD");
        Ok(())
    }

    /// Reads `seconds` worth of values starting at the reference time.
    ///
    /// The step is first narrowed to the greatest common divisor of the
    /// configured step and the file's step. When the engine answers at a
    /// coarser resolution that is a whole multiple of that step, each value is
    /// repeated to fill the finer grid; otherwise the step is set to the
    /// engine's resolution so the caller can see the spacing it got. For
    /// rate kinds the values are per-step deltas, not per-second rates.
    ///
    /// A copy of the result is kept in [`values`](Self::values).
    ///
    /// # Errors
    ///
    /// Not applicable if there is no path, no file, or the file is not
    /// readable; otherwise any engine error.
    pub fn read(&mut self, seconds: u64) -> Result<Vec<Option<f64>>> {
        let path = self.existing_path()?.to_path_buf();
        let info = self.readable_info(&path)?;
        let file_step = info
            .step()
            .ok_or_else(|| RrdError::NotReadable { path: path.clone() })?;

        let requested = self.config.step;
        let step = gcd(requested, file_step);
        self.config.step = step;

        let request = FetchRequest {
            cf: ConsolidationFn::Last,
            resolution: step,
            start: self.when.saturating_sub(step),
            end: self.when.saturating_add(seconds),
        };
        let fetched = self.engine.fetch(&fetch_args(&path, &request))?;

        // no resolution from the engine: assume it honoured the request
        let resolution = fetched.resolution.unwrap_or(requested);
        let reconciled = reconcile(&fetched.values, resolution, step, seconds, self.config.kind);
        debug!(
            requested,
            file_step,
            resolution,
            step = reconciled.step,
            count = reconciled.values.len(),
            "read values"
        );

        self.config.step = reconciled.step;
        self.values.clone_from(&reconciled.values);
        Ok(reconciled.values)
    }

    /// Reads `seconds` worth of a daily rollup archive.
    ///
    /// Values are one per day and are not padded. Rate kinds are scaled to
    /// per-day deltas.
    ///
    /// # Errors
    ///
    /// Not applicable if there is no path, no file, the file is not readable,
    /// or it has no archive for `cf`; otherwise any engine error.
    pub fn read_consolidated(
        &self,
        cf: ConsolidationFn,
        seconds: u64,
    ) -> Result<Vec<Option<f64>>> {
        let path = self.existing_path()?;
        let info = self.readable_info(path)?;
        if info.rra_index(cf).is_none() {
            return Err(RrdError::NotReadable {
                path: path.to_path_buf(),
            });
        }

        let request = FetchRequest {
            cf,
            resolution: SECONDS_PER_DAY,
            start: self.when.saturating_sub(SECONDS_PER_DAY),
            end: self.when.saturating_add(seconds),
        };
        let fetched = self.engine.fetch(&fetch_args(path, &request))?;
        let resolution = fetched.resolution.unwrap_or(SECONDS_PER_DAY);
        Ok(reconcile(&fetched.values, resolution, resolution, seconds, self.config.kind).values)
    }

    /// Writes values `step` seconds apart, starting at the reference time.
    ///
    /// `None`, NaN and infinities are written as unknown.
    ///
    /// # Errors
    ///
    /// - not applicable if there is no path or no file
    /// - [`RrdError::InvalidConfig`] if the parameters are invalid
    /// - [`RrdError::NotWritable`] if the file cannot be written
    /// - [`RrdError::StaleTimestamp`] if the reference time is not after the
    ///   file's last update
    /// - [`RrdError::Engine`] if the engine refuses
    pub fn update<I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Sample>,
    {
        let path = self.existing_path()?;
        self.config.validate()?;
        if !self.is_writable()? {
            return Err(RrdError::NotWritable {
                path: path.to_path_buf(),
            });
        }
        if let Some(last_update) = self.last_update_time()?
            && self.when <= last_update
        {
            return Err(RrdError::StaleTimestamp {
                when: self.when,
                last_update,
            });
        }

        let samples: Vec<Sample> = values.into_iter().map(Into::into).collect();
        self.engine
            .update(&update_args(path, &samples, self.when, self.config.step))?;
        debug!(path = %path.display(), count = samples.len(), when = self.when, "updated RRD");
        Ok(())
    }

    /// Removes the file.
    ///
    /// # Errors
    ///
    /// Not applicable if there is no path or no file; [`RrdError::NotWritable`]
    /// if the file cannot be written; [`RrdError::Io`] if removal fails.
    pub fn delete(&self) -> Result<()> {
        let path = self.existing_path()?;
        if !self.is_writable()? {
            return Err(RrdError::NotWritable {
                path: path.to_path_buf(),
            });
        }
        fs::remove_file(path).map_err(|source| RrdError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "deleted RRD");
        Ok(())
    }

    /// The configured path, unless it is missing or empty.
    fn require_path(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(RrdError::NoPath)
    }

    /// The configured path, if the file exists.
    fn existing_path(&self) -> Result<&Path> {
        let path = self.require_path()?;
        if path.exists() {
            Ok(path)
        } else {
            Err(RrdError::NotFound {
                path: path.to_path_buf(),
            })
        }
    }

    /// Engine info for a file this crate can read.
    fn readable_info(&self, path: &Path) -> Result<RrdInfo> {
        match self.engine.info(path) {
            Ok(info) if info.is_simple() => Ok(info),
            _ => Err(RrdError::NotReadable {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Replaces the parameters with those of the file on disk, when readable.
    fn load_config(&mut self) {
        let Ok(path) = self.existing_path() else {
            return;
        };
        let Ok(info) = self.readable_info(path) else {
            return;
        };
        if let Some(config) = info.config() {
            debug!(path = %path.display(), ?config, "loaded parameters from file");
            self.config = config;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use tempfile::tempdir;

    use super::*;
    use crate::config::DataSourceKind;
    use crate::error::EngineError;
    use crate::fetch::FetchResult;
    use crate::info::InfoValue;

    const MIDNIGHT: u64 = 1_388_534_400;

    /// Engine double that records calls and answers from canned state.
    #[derive(Default)]
    struct ScriptedEngine {
        calls: RefCell<Vec<(&'static str, Vec<String>)>>,
        info: RefCell<Option<RrdInfo>>,
        fetch: RefCell<Option<FetchResult>>,
    }

    impl ScriptedEngine {
        fn with_info(info: RrdInfo) -> Self {
            let engine = Self::default();
            *engine.info.borrow_mut() = Some(info);
            engine
        }

        fn calls(&self, command: &str) -> Vec<Vec<String>> {
            self.calls
                .borrow()
                .iter()
                .filter(|(name, _)| *name == command)
                .map(|(_, args)| args.clone())
                .collect()
        }
    }

    impl Engine for ScriptedEngine {
        fn create(&self, args: &[String]) -> std::result::Result<(), EngineError> {
            fs::write(&args[0], b"").expect("touch rrd");
            self.calls.borrow_mut().push(("create", args.to_vec()));
            Ok(())
        }

        fn update(&self, args: &[String]) -> std::result::Result<(), EngineError> {
            self.calls.borrow_mut().push(("update", args.to_vec()));
            Ok(())
        }

        fn fetch(&self, args: &[String]) -> std::result::Result<FetchResult, EngineError> {
            self.calls.borrow_mut().push(("fetch", args.to_vec()));
            self.fetch.borrow().clone().ok_or(EngineError::Parse {
                command: "fetch",
                reason: "no fetch scripted".to_string(),
            })
        }

        fn info(&self, _path: &Path) -> std::result::Result<RrdInfo, EngineError> {
            self.info.borrow().clone().ok_or(EngineError::Failed {
                command: "info",
                status: "exit status: 1".to_string(),
                stderr: "not an RRD file".to_string(),
            })
        }
    }

    fn simple_info(step: i64, kind: &str, last_update: i64) -> RrdInfo {
        RrdInfo::from_entries([
            ("step", InfoValue::Integer(step)),
            ("last_update", InfoValue::Integer(last_update)),
            ("ds[data_source].type", InfoValue::Text(kind.to_string())),
            ("ds[data_source].minimal_heartbeat", InfoValue::Integer(step * 6)),
            ("ds[data_source].min", InfoValue::Unknown),
            ("ds[data_source].max", InfoValue::Unknown),
            ("rra[0].cf", InfoValue::Text("LAST".to_string())),
            ("rra[0].rows", InfoValue::Integer(1000)),
            ("rra[0].xff", InfoValue::Float(0.5)),
            ("rra[1].cf", InfoValue::Text("AVERAGE".to_string())),
        ])
    }

    fn fetch_result(values: &[f64], resolution: u64) -> FetchResult {
        FetchResult {
            ds_names: vec![DS_NAME.to_string()],
            timestamps: (1..=values.len() as u64)
                .map(|i| MIDNIGHT + i * resolution)
                .collect(),
            values: values.to_vec(),
            resolution: Some(resolution),
        }
    }

    /// Creates an empty file standing in for an existing RRD.
    fn existing_file(dir: &Path) -> PathBuf {
        let path = dir.join("dataset.rrd");
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_defaults_without_path() {
        let rrd = SimpleRrd::with_engine(ScriptedEngine::default(), None, MIDNIGHT);
        assert_eq!(rrd.path(), None);
        assert_eq!(rrd.when(), MIDNIGHT);
        assert_eq!(rrd.config(), &RrdConfig::default());
        assert!(rrd.values().is_empty());
        assert!(!rrd.is_valid());
        assert!(matches!(rrd.validate(), Err(RrdError::NoPath)));
    }

    #[test]
    fn test_empty_path_is_no_path() {
        let rrd =
            SimpleRrd::with_engine(ScriptedEngine::default(), Some(PathBuf::new()), MIDNIGHT);
        assert!(matches!(rrd.exists(), Err(RrdError::NoPath)));
        assert!(rrd.create().unwrap_err().is_not_applicable());
    }

    #[test]
    fn test_operations_without_path_are_not_applicable() {
        let mut rrd = SimpleRrd::with_engine(ScriptedEngine::default(), None, MIDNIGHT);
        assert!(rrd.create().unwrap_err().is_not_applicable());
        assert!(rrd.read(DEFAULT_READ_SECONDS).unwrap_err().is_not_applicable());
        assert!(rrd.update([1i64]).unwrap_err().is_not_applicable());
        assert!(rrd.delete().unwrap_err().is_not_applicable());
    }

    #[test]
    fn test_missing_file_is_not_applicable() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.rrd");
        let mut rrd = SimpleRrd::with_engine(ScriptedEngine::default(), Some(path), MIDNIGHT);
        assert!(rrd.is_valid());
        assert!(!rrd.exists().unwrap());
        assert!(matches!(rrd.update([1i64]), Err(RrdError::NotFound { .. })));
        assert!(matches!(rrd.read(60), Err(RrdError::NotFound { .. })));
        assert!(matches!(rrd.delete(), Err(RrdError::NotFound { .. })));
        assert!(matches!(rrd.is_readable(), Err(RrdError::NotFound { .. })));
    }

    #[test]
    fn test_create_builds_engine_arguments() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("dir").join("dataset.rrd");
        let rrd =
            SimpleRrd::with_engine(ScriptedEngine::default(), Some(path.clone()), MIDNIGHT);

        rrd.create().unwrap();
        assert!(path.exists());

        let creates = rrd.engine().calls("create");
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0][0], path.display().to_string());
        assert_eq!(creates[0][1], format!("--start={}", MIDNIGHT - 60));
        assert_eq!(creates[0][3], "DS:data_source:GAUGE:360:U:U");
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let rrd = SimpleRrd::with_engine(ScriptedEngine::default(), Some(path), MIDNIGHT);
        let err = rrd.create().unwrap_err();
        assert!(matches!(err, RrdError::AlreadyExists { .. }));
        assert!(!err.is_not_applicable());
        assert!(rrd.engine().calls("create").is_empty());
    }

    #[test]
    fn test_create_refuses_invalid_config() {
        let temp = tempdir().unwrap();
        let mut rrd = SimpleRrd::with_engine(
            ScriptedEngine::default(),
            Some(temp.path().join("a.rrd")),
            MIDNIGHT,
        );
        rrd.config_mut().duration = 0;
        assert!(matches!(rrd.create(), Err(RrdError::InvalidConfig(_))));
        assert!(!temp.path().join("a.rrd").exists());
    }

    #[test]
    fn test_config_loaded_from_existing_file() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(30, "DERIVE", 0));

        let rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        assert_eq!(rrd.config().step, 30);
        assert_eq!(rrd.config().kind, DataSourceKind::Derive);
        assert_eq!(rrd.config().duration, 30_000);
        assert_eq!(rrd.config().heartbeat, 6);
    }

    #[test]
    fn test_set_path_reloads_config() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(30, "COUNTER", 0));

        let mut rrd = SimpleRrd::with_engine(engine, None, MIDNIGHT);
        assert_eq!(rrd.config().step, 60);
        rrd.set_path(Some(path.clone()));
        assert_eq!(rrd.path(), Some(path.as_path()));
        assert_eq!(rrd.config().step, 30);
        assert_eq!(rrd.config().kind, DataSourceKind::Counter);

        rrd.set_path(None);
        assert_eq!(rrd.path(), None);
    }

    #[test]
    fn test_unreadable_file_keeps_defaults() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let mut rrd = SimpleRrd::with_engine(ScriptedEngine::default(), Some(path), MIDNIGHT);
        assert_eq!(rrd.config(), &RrdConfig::default());
        assert!(!rrd.is_readable().unwrap());
        assert!(!rrd.is_writable().unwrap());
        let err = rrd.read(60).unwrap_err();
        assert!(matches!(err, RrdError::NotReadable { .. }));
        assert!(err.is_not_applicable());
    }

    #[test]
    fn test_read_matching_step() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "GAUGE", 0));
        *engine.fetch.borrow_mut() = Some(fetch_result(&[1.0, f64::NAN, 3.0, 4.0], 60));

        let mut rrd = SimpleRrd::with_engine(engine, Some(path.clone()), MIDNIGHT);
        let values = rrd.read(180).unwrap();
        assert_eq!(values, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(rrd.values(), values.as_slice());
        assert_eq!(rrd.config().step, 60);

        let fetches = rrd.engine().calls("fetch");
        assert_eq!(
            fetches[0],
            vec![
                path.display().to_string(),
                "LAST".to_string(),
                "--resolution=60".to_string(),
                format!("--start={}", MIDNIGHT - 60),
                format!("--end={}", MIDNIGHT + 180),
            ]
        );
    }

    #[test]
    fn test_read_halved_step_pads_values() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "GAUGE", 0));
        *engine.fetch.borrow_mut() = Some(fetch_result(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 60));

        let mut rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        rrd.config_mut().step = 30;
        let values = rrd.read(300).unwrap();
        let expected: Vec<_> = [1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0, 5.0]
            .into_iter()
            .map(Some)
            .collect();
        assert_eq!(values, expected);
        assert_eq!(rrd.config().step, 30);
        assert!(rrd.engine().calls("fetch")[0].contains(&"--resolution=30".to_string()));
    }

    #[test]
    fn test_read_uneven_step_uses_gcd() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "GAUGE", 0));
        *engine.fetch.borrow_mut() = Some(fetch_result(&[7.0, 8.0], 60));

        let mut rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        rrd.config_mut().step = 45;
        let values = rrd.read(120).unwrap();
        // 60s rows at gcd(45, 60) = 15s spacing
        assert_eq!(values.len(), 8);
        assert_eq!(rrd.config().step, 15);
        assert!(rrd.engine().calls("fetch")[0].contains(&"--resolution=15".to_string()));
    }

    #[test]
    fn test_read_coarse_resolution() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "GAUGE", 0));
        // engine answers from a coarser archive than requested
        *engine.fetch.borrow_mut() = Some(fetch_result(&[1.0, 2.0, 3.0], 3600));

        let mut rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        rrd.config_mut().step = 120;
        let values = rrd.read(7200).unwrap();
        // two hourly rows spread over minutes
        assert_eq!(values.len(), 120);
        assert_eq!(rrd.config().step, 60);

        // 90s rows cannot be spread over 60s steps
        *rrd.engine().fetch.borrow_mut() = Some(fetch_result(&[1.0, 2.0], 90));
        let values = rrd.read(180).unwrap();
        assert_eq!(values, vec![Some(1.0), Some(2.0)]);
        assert_eq!(rrd.config().step, 90);
    }

    #[test]
    fn test_read_without_resolution_assumes_requested_step() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "COUNTER", 0));
        let mut single = fetch_result(&[0.5], 60);
        single.resolution = None;
        *engine.fetch.borrow_mut() = Some(single);

        let mut rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        let values = rrd.read(60).unwrap();
        assert_eq!(values, vec![Some(30.0)]);
    }

    #[test]
    fn test_read_converts_rates_to_deltas() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "DERIVE", 0));
        *engine.fetch.borrow_mut() = Some(fetch_result(&[0.5, 0.25, f64::NAN], 60));

        let mut rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        let values = rrd.read(180).unwrap();
        assert_eq!(values, vec![Some(30.0), Some(15.0), None]);
    }

    #[test]
    fn test_read_consolidated_uses_daily_archive() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "GAUGE", 0));
        *engine.fetch.borrow_mut() = Some(fetch_result(&[2.5, 3.5, 4.5], SECONDS_PER_DAY));

        let rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        let values = rrd
            .read_consolidated(ConsolidationFn::Average, 2 * SECONDS_PER_DAY)
            .unwrap();
        assert_eq!(values, vec![Some(2.5), Some(3.5)]);
        assert_eq!(rrd.engine().calls("fetch")[0][1], "AVERAGE");

        // no MIN archive in this file
        let err = rrd
            .read_consolidated(ConsolidationFn::Min, SECONDS_PER_DAY)
            .unwrap_err();
        assert!(err.is_not_applicable());
    }

    #[test]
    fn test_update_writes_consecutive_steps() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "GAUGE", (MIDNIGHT - 60) as i64));

        let rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        rrd.update([Some(1.0), None, Some(2.5)]).unwrap();

        let updates = rrd.engine().calls("update");
        assert_eq!(
            updates[0][1..],
            [
                format!("{MIDNIGHT}:1"),
                format!("{}:U", MIDNIGHT + 60),
                format!("{}:2.5", MIDNIGHT + 120),
            ]
        );
    }

    #[test]
    fn test_update_rejects_stale_timestamp() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "GAUGE", MIDNIGHT as i64));

        let mut rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        assert!(matches!(
            rrd.update([1i64]),
            Err(RrdError::StaleTimestamp { .. })
        ));
        rrd.set_when(MIDNIGHT - 60);
        assert!(matches!(
            rrd.update([1i64]),
            Err(RrdError::StaleTimestamp { .. })
        ));
        rrd.set_when(MIDNIGHT + 60);
        rrd.update([1i64]).unwrap();
    }

    #[test]
    fn test_update_rejects_invalid_config() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "GAUGE", 0));

        let mut rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        rrd.config_mut().xff = 1.0;
        assert!(matches!(rrd.update([1i64]), Err(RrdError::InvalidConfig(_))));
        assert!(rrd.engine().calls("update").is_empty());
    }

    #[test]
    fn test_delete_removes_file() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "GAUGE", 0));

        let rrd = SimpleRrd::with_engine(engine, Some(path.clone()), MIDNIGHT);
        rrd.delete().unwrap();
        assert!(!path.exists());
        assert!(rrd.delete().unwrap_err().is_not_applicable());
    }

    #[test]
    fn test_delete_refuses_unreadable_file() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let rrd = SimpleRrd::with_engine(ScriptedEngine::default(), Some(path.clone()), MIDNIGHT);
        assert!(matches!(rrd.delete(), Err(RrdError::NotWritable { .. })));
        assert!(path.exists());
    }

    #[test]
    fn test_ds_name() {
        let temp = tempdir().unwrap();
        let rrd = SimpleRrd::with_engine(ScriptedEngine::default(), None, MIDNIGHT);
        assert_eq!(rrd.ds_name(), DS_NAME);

        let path = existing_file(temp.path());
        let info = RrdInfo::from_entries([
            ("step", InfoValue::Integer(60)),
            ("ds[load].type", InfoValue::Text("GAUGE".to_string())),
            ("rra[0].cf", InfoValue::Text("LAST".to_string())),
        ]);
        let rrd = SimpleRrd::with_engine(ScriptedEngine::with_info(info), Some(path), MIDNIGHT);
        assert_eq!(rrd.ds_name(), "load");
    }

    #[test]
    fn test_last_update_time() {
        let temp = tempdir().unwrap();
        let path = existing_file(temp.path());
        let engine = ScriptedEngine::with_info(simple_info(60, "GAUGE", 1234));
        let rrd = SimpleRrd::with_engine(engine, Some(path), MIDNIGHT);
        assert_eq!(rrd.last_update_time().unwrap(), Some(1234));
    }
}
