//! segrecover: segment recovery driver.
//!
//! Subcommands:
//! - **setup**: validate and prepare every failed segment in a batch
//! - **reconfigure**: request a fault probe and confirm the write path
//! - **progress**: summarize recovery progress files
//!
//! Exit status is 0 on success and 1 on any failure. For `setup`, failures
//! are reported on stderr as one JSON array of error records; log output
//! never goes to stderr.

mod commands;
mod logging;
mod psql;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::ArgMatches;
use segrecover_core::{deserialize_list, Dbid};
use segrecover_engine::config::CONFIG_FILE_NAME;
use segrecover_engine::{
    run_setup, ConnectionMode, DbEndpoint, RecoveryConfig, RecoveryProgress, SegmentReconfigurer,
    SetupContext, SetupOptions,
};
use tracing::{error, info};

use commands::build_cli;
use psql::PsqlConnector;

fn main() {
    let matches = build_cli().get_matches();

    let logdir = matches.get_one::<PathBuf>("logdir");
    if let Err(e) = logging::init_logging(logdir.map(|p| p.as_path()), matches.get_flag("verbose")) {
        eprintln!("{}", e);
        process::exit(1);
    }

    let config = match load_config(matches.get_one::<PathBuf>("config")) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let exit_code = match matches.subcommand() {
        Some(("setup", sub)) => run_setup_command(sub, &config),
        Some(("reconfigure", sub)) => run_reconfigure_command(sub, &config),
        Some(("progress", sub)) => run_progress_command(sub),
        _ => {
            eprintln!("(error) unknown command");
            1
        }
    };
    process::exit(exit_code);
}

/// Explicit `--config` must exist; otherwise `./segrecover.toml` is used when
/// present and defaults apply when it is not.
fn load_config(explicit: Option<&PathBuf>) -> Result<RecoveryConfig, String> {
    let config = match explicit {
        Some(path) => RecoveryConfig::from_file(path),
        None if Path::new(CONFIG_FILE_NAME).exists() => {
            RecoveryConfig::from_file(Path::new(CONFIG_FILE_NAME))
        }
        None => Ok(RecoveryConfig::default()),
    };
    config.map_err(|e| e.to_string())
}

fn run_setup_command(matches: &ArgMatches, config: &RecoveryConfig) -> i32 {
    if let Some(era) = matches.get_one::<String>("era") {
        info!(era = %era, "Starting recovery setup");
    }

    let mut config = config.clone();
    if let Some(&batch_size) = matches.get_one::<usize>("batch-size") {
        config.batch_size = batch_size;
    }
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return 1;
    }

    let descriptors = match required_arg::<String>(matches, "confinfo")
        .and_then(|confinfo| deserialize_list(confinfo).map_err(|e| e.to_string()))
    {
        Ok(descriptors) => descriptors,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            return 1;
        }
    };

    let ctx = SetupContext::new(Arc::new(PsqlConnector::new(config.psql_path.clone())))
        .with_bootstrap_database(config.bootstrap_database.clone());
    let options = SetupOptions {
        force_overwrite: matches.get_flag("force-overwrite"),
        batch_size: config.batch_size,
    };

    let report = run_setup(descriptors, options, Arc::new(ctx));
    if let Some(errors) = report.errors_json() {
        eprint!("{}", errors);
    }
    report.exit_code()
}

fn run_reconfigure_command(matches: &ArgMatches, config: &RecoveryConfig) -> i32 {
    let mut config = config.clone();
    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config.reconfigure_timeout_secs = timeout;
    }
    if let Some(database) = matches.get_one::<String>("database") {
        config.bootstrap_database = database.clone();
    }
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return 1;
    }

    let endpoint = match coordinator_endpoint(matches, &config) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };
    let mode = if matches.get_flag("default-mode") {
        ConnectionMode::Default
    } else {
        ConnectionMode::Utility
    };

    let reconfigurer = SegmentReconfigurer::new(
        Arc::new(PsqlConnector::new(config.psql_path.clone())),
        endpoint,
        config.reconfigure_timeout(),
    )
    .with_mode(mode);

    match reconfigurer.reconfigure() {
        Ok(report) => {
            info!(
                probe_attempts = report.probe_attempts,
                confirm_attempts = report.confirm_attempts,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Failover confirmed"
            );
            0
        }
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    }
}

/// Value of an argument clap guarantees through `required` or a default.
fn required_arg<'a, T>(matches: &'a ArgMatches, id: &str) -> Result<&'a T, String>
where
    T: std::any::Any + Clone + Send + Sync + 'static,
{
    matches
        .get_one::<T>(id)
        .ok_or_else(|| format!("missing argument --{}", id))
}

/// Coordinator endpoint from `--host`/`--port` and the configured database.
fn coordinator_endpoint(
    matches: &ArgMatches,
    config: &RecoveryConfig,
) -> Result<DbEndpoint, String> {
    let host = required_arg::<String>(matches, "host")?;
    let port = required_arg::<u16>(matches, "port")?;
    Ok(DbEndpoint::new(host.clone(), *port, config.bootstrap_database.clone()))
}

fn run_progress_command(matches: &ArgMatches) -> i32 {
    let dbids: Vec<Dbid> = matches
        .get_many::<Dbid>("dbid")
        .map(|values| values.copied().collect())
        .unwrap_or_default();
    let files: Vec<PathBuf> = matches
        .get_many::<PathBuf>("files")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let active: HashSet<Dbid> = dbids.iter().copied().collect();
    let progress = RecoveryProgress::new();
    progress.parse_progress_files(&files, &active);
    let rows = progress.render_rows(&dbids);

    if matches.get_flag("json") {
        println!("{}", rows_to_json(&rows));
    } else {
        print!("{}", format_table(&rows));
    }
    0
}

const HEADERS: [&str; 6] = [
    "Segment DBID",
    "Recovery type",
    "Completed bytes (kB)",
    "Total bytes (kB)",
    "Percentage completed",
    "Stage",
];

fn rows_to_json(rows: &[[String; 6]]) -> String {
    let values: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "dbid": row[0],
                "recovery_type": row[1],
                "completed_bytes": row[2],
                "total_bytes": row[3],
                "percentage": row[4],
                "stage": row[5],
            })
        })
        .collect();
    serde_json::Value::Array(values).to_string()
}

/// Left-aligned column table with a header row.
fn format_table(rows: &[[String; 6]]) -> String {
    let mut widths = HEADERS.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let render = |cells: Vec<&str>| -> String {
        let line: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        format!("{}\n", line.join("   ").trim_end())
    };

    let mut out = render(HEADERS.to_vec());
    for row in rows {
        out.push_str(&render(row.iter().map(|s| s.as_str()).collect()));
    }
    out
}
