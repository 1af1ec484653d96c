//! CLI for the simple-rrd rrdtool wrapper.
//!
//! Provides commands for creating, updating, reading, deleting and
//! inspecting single-series RRD files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use simple_rrd::{
    AlignedClock, Clock, ConsolidationFn, DataSourceKind, InfoValue, RrdConfig, RrdError, Rrdtool,
    Sample, SimpleRrd,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit status when the operation did not apply (no such file).
const EXIT_NOT_APPLICABLE: u8 = 2;

/// Exit status for any other failure.
const EXIT_FAILURE: u8 = 1;

/// simple-rrd - create, update, read and delete single-series RRD files.
#[derive(Parser)]
#[command(name = "simple-rrd", version, about)]
struct Cli {
    /// rrdtool executable to run.
    #[arg(long, global = true, default_value = simple_rrd::engine::DEFAULT_PROGRAM)]
    rrdtool: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create a new RRD file.
    Create {
        /// Path of the file to create.
        path: PathBuf,

        /// Start time in unix seconds (default: now, rounded down to the step).
        #[arg(long)]
        when: Option<u64>,

        /// JSON file with parameters; flags override its fields.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seconds between values.
        #[arg(long)]
        step: Option<u64>,

        /// Data source kind (GAUGE, COUNTER, DERIVE, ABSOLUTE).
        #[arg(long)]
        kind: Option<DataSourceKind>,

        /// Lowest accepted value.
        #[arg(long, allow_negative_numbers = true)]
        min: Option<f64>,

        /// Highest accepted value.
        #[arg(long, allow_negative_numbers = true)]
        max: Option<f64>,

        /// Retention in seconds.
        #[arg(long)]
        duration: Option<u64>,

        /// Fraction of unknown values allowed in a rollup row.
        #[arg(long)]
        xff: Option<f64>,

        /// Heartbeat in steps.
        #[arg(long)]
        heartbeat: Option<u32>,
    },

    /// Write values `step` seconds apart.
    Update {
        /// Path of the file to update.
        path: PathBuf,

        /// Values to write; `U` or an empty string is unknown.
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<String>,

        /// Time of the first value in unix seconds (default: now, rounded down to the step).
        #[arg(long)]
        when: Option<u64>,
    },

    /// Read values back.
    Read {
        /// Path of the file to read.
        path: PathBuf,

        /// Length of the window in seconds.
        #[arg(long, default_value_t = simple_rrd::rrd::DEFAULT_READ_SECONDS)]
        seconds: u64,

        /// Spacing of the returned values (default: the file's step).
        #[arg(long)]
        step: Option<u64>,

        /// Start of the window in unix seconds (default: one window ago).
        #[arg(long)]
        when: Option<u64>,

        /// Read a daily rollup (AVERAGE, MIN, MAX) instead of raw values.
        #[arg(long)]
        consolidation: Option<ConsolidationFn>,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Delete an RRD file.
    Delete {
        /// Path of the file to delete.
        path: PathBuf,
    },

    /// Display the file's parameters and engine description.
    Info {
        /// Path of the file to describe.
        path: PathBuf,

        /// Output format.
        #[arg(long, default_value = "text")]
        format: InfoFormat,
    },
}

/// Output format for read results.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// JSON object with a data array.
    Json,
}

/// Output format for file information.
#[derive(Clone, ValueEnum)]
enum InfoFormat {
    /// `key = value` lines.
    Text,
    /// JSON object.
    Json,
}

/// Parameter overrides given on the command line.
struct ConfigFlags {
    step: Option<u64>,
    kind: Option<DataSourceKind>,
    min: Option<f64>,
    max: Option<f64>,
    duration: Option<u64>,
    xff: Option<f64>,
    heartbeat: Option<u32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = Rrdtool::new(cli.rrdtool.into_os_string());
    let result = match cli.command {
        Commands::Create {
            path,
            when,
            config,
            step,
            kind,
            min,
            max,
            duration,
            xff,
            heartbeat,
        } => {
            let flags = ConfigFlags {
                step,
                kind,
                min,
                max,
                duration,
                xff,
                heartbeat,
            };
            cmd_create(engine, path, when, config.as_deref(), &flags)
        }
        Commands::Update { path, values, when } => cmd_update(engine, path, when, &values),
        Commands::Read {
            path,
            seconds,
            step,
            when,
            consolidation,
            format,
        } => cmd_read(engine, path, seconds, step, when, consolidation, &format),
        Commands::Delete { path } => cmd_delete(engine, path),
        Commands::Info { path, format } => cmd_info(engine, path, &format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(exit_code(e.as_ref()))
        }
    }
}

/// Exit status for a failed command: 2 when it did not apply, 1 otherwise.
fn exit_code(err: &(dyn std::error::Error + 'static)) -> u8 {
    let not_applicable = err
        .downcast_ref::<RrdError>()
        .is_some_and(RrdError::is_not_applicable);
    if not_applicable {
        EXIT_NOT_APPLICABLE
    } else {
        EXIT_FAILURE
    }
}

/// Installs the log subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Now, rounded down to `step`.
fn aligned_now(step: u64) -> u64 {
    AlignedClock::new(step).now()
}

/// Implements `simple-rrd create <path>`.
fn cmd_create(
    engine: Rrdtool,
    path: PathBuf,
    when: Option<u64>,
    config_file: Option<&Path>,
    flags: &ConfigFlags,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_file {
        Some(file) => load_config(file)?,
        None => RrdConfig::default(),
    };
    apply_flags(&mut config, flags);

    let when = when.unwrap_or_else(|| aligned_now(config.step));
    let mut rrd = SimpleRrd::with_engine(engine, Some(path), when);
    *rrd.config_mut() = config;
    rrd.create()?;

    let config = rrd.config();
    println!(
        "Created {} (step={}s, kind={}, duration={}s)",
        display_path(&rrd),
        config.step,
        config.kind,
        config.duration
    );
    Ok(())
}

/// Implements `simple-rrd update <path> <values...>`.
fn cmd_update(
    engine: Rrdtool,
    path: PathBuf,
    when: Option<u64>,
    values: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let samples = values
        .iter()
        .map(|raw| parse_sample(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rrd = SimpleRrd::with_engine(engine, Some(path), 0);
    let when = when.unwrap_or_else(|| aligned_now(rrd.config().step));
    rrd.set_when(when);
    rrd.update(samples)?;

    println!(
        "Wrote {} value(s) to {} from {when}",
        values.len(),
        display_path(&rrd)
    );
    Ok(())
}

/// Implements `simple-rrd read <path>`.
fn cmd_read(
    engine: Rrdtool,
    path: PathBuf,
    seconds: u64,
    step: Option<u64>,
    when: Option<u64>,
    consolidation: Option<ConsolidationFn>,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rrd = SimpleRrd::with_engine(engine, Some(path), 0);
    if let Some(step) = step {
        rrd.config_mut().step = step;
    }
    let when = when.unwrap_or_else(|| {
        aligned_now(rrd.config().step).saturating_sub(seconds)
    });
    rrd.set_when(when);

    let (values, spacing) = match consolidation {
        Some(cf) if cf != ConsolidationFn::Last => (
            rrd.read_consolidated(cf, seconds)?,
            simple_rrd::config::SECONDS_PER_DAY,
        ),
        _ => {
            let values = rrd.read(seconds)?;
            (values, rrd.config().step)
        }
    };
    debug!(count = values.len(), spacing, "read complete");

    let rows = label_rows(when, spacing, values);

    match format {
        OutputFormat::Csv => {
            println!("# path={}, step={spacing}, points={}", display_path(&rrd), rows.len());
            println!("timestamp,value");
            for (ts, value) in &rows {
                match value {
                    Some(value) => println!("{ts},{value}"),
                    None => println!("{ts},"),
                }
            }
        }
        OutputFormat::Json => {
            let data: Vec<serde_json::Value> = rows
                .iter()
                .map(|(ts, value)| {
                    serde_json::json!({
                        "timestamp": ts,
                        "value": value,
                    })
                })
                .collect();

            let output = serde_json::json!({
                "path": display_path(&rrd),
                "step": spacing,
                "count": rows.len(),
                "data": data,
            });

            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Pairs read values with their row times.
///
/// The engine aligns rows to multiples of their spacing, so the first row
/// lands on `when` rounded down to `spacing`.
fn label_rows(when: u64, spacing: u64, values: Vec<Option<f64>>) -> Vec<(u64, Option<f64>)> {
    let first = if spacing == 0 { when } else { when - when % spacing };
    (0u64..)
        .map(|i| first.saturating_add(i.saturating_mul(spacing)))
        .zip(values)
        .collect()
}

/// Implements `simple-rrd delete <path>`.
fn cmd_delete(engine: Rrdtool, path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let rrd = SimpleRrd::with_engine(engine, Some(path), 0);
    rrd.delete()?;
    println!("Deleted {}", display_path(&rrd));
    Ok(())
}

/// Implements `simple-rrd info <path>`.
fn cmd_info(
    engine: Rrdtool,
    path: PathBuf,
    format: &InfoFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let rrd = SimpleRrd::with_engine(engine, Some(path), 0);
    let info = rrd.info()?;
    let readable = rrd.is_readable()?;
    let writable = rrd.is_writable()?;

    match format {
        InfoFormat::Text => {
            println!("File: {}", display_path(&rrd));
            println!("Readable: {readable}");
            println!("Writable: {writable}");
            if readable {
                let config = rrd.config();
                println!();
                println!("  Step: {}s", config.step);
                println!("  Kind: {}", config.kind);
                println!("  Min: {}", format_bound(config.min));
                println!("  Max: {}", format_bound(config.max));
                println!("  Duration: {}", format_duration_secs(config.duration));
                println!("  XFF: {}", config.xff);
                println!("  Heartbeat: {} step(s)", config.heartbeat);
            }
            println!();
            for (key, value) in info.iter() {
                println!("{key} = {}", format_info_value(value));
            }
        }
        InfoFormat::Json => {
            let output = serde_json::json!({
                "path": display_path(&rrd),
                "readable": readable,
                "writable": writable,
                "config": readable.then(|| rrd.config()),
                "info": info,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Reads an [`RrdConfig`] from a JSON file. Missing fields keep their defaults.
fn load_config(file: &Path) -> Result<RrdConfig, Box<dyn std::error::Error>> {
    let data = std::fs::read_to_string(file)
        .map_err(|e| format!("cannot read config '{}': {e}", file.display()))?;
    let config: RrdConfig = serde_json::from_str(&data)
        .map_err(|e| format!("invalid config '{}': {e}", file.display()))?;
    debug!(file = %file.display(), ?config, "loaded config file");
    Ok(config)
}

/// Overrides config fields with any flags that were given.
fn apply_flags(config: &mut RrdConfig, flags: &ConfigFlags) {
    if let Some(step) = flags.step {
        config.step = step;
    }
    if let Some(kind) = flags.kind {
        config.kind = kind;
    }
    if flags.min.is_some() {
        config.min = flags.min;
    }
    if flags.max.is_some() {
        config.max = flags.max;
    }
    if let Some(duration) = flags.duration {
        config.duration = duration;
    }
    if let Some(xff) = flags.xff {
        config.xff = xff;
    }
    if let Some(heartbeat) = flags.heartbeat {
        config.heartbeat = heartbeat;
    }
}

/// Parses one update value. Integers stay exact; `U` and blanks are unknown.
fn parse_sample(raw: &str) -> Result<Sample, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case(simple_rrd::command::UNKNOWN) {
        return Ok(Sample::Unknown);
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Ok(Sample::from(int));
    }
    raw.parse::<f64>()
        .map(Sample::from)
        .map_err(|_| format!("'{raw}' is not a number"))
}

fn display_path<E: simple_rrd::Engine>(rrd: &SimpleRrd<E>) -> String {
    rrd.path()
        .map(|path| path.display().to_string())
        .unwrap_or_default()
}

fn format_bound(bound: Option<f64>) -> String {
    bound.map_or_else(|| "U".to_string(), |value| value.to_string())
}

fn format_info_value(value: &InfoValue) -> String {
    match value {
        InfoValue::Integer(int) => int.to_string(),
        InfoValue::Float(float) => format!("{float:e}"),
        InfoValue::Text(text) => format!("\"{text}\""),
        InfoValue::Unknown => "NaN".to_string(),
    }
}

/// Formats seconds as a human-readable duration.
fn format_duration_secs(secs: u64) -> String {
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}
