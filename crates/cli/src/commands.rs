//! Clap command tree definition.
//!
//! Builds the `clap::Command` tree for the three subcommands. Logging flags
//! are global so they apply to every subcommand.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("segrecover")
        .about("Prepare failed segments for recovery and confirm failover")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("logdir")
                .short('l')
                .long("logdir")
                .help("Directory for the daily log file (default: log to stdout)")
                .value_parser(value_parser!(std::path::PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Debug output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to segrecover.toml (default: ./segrecover.toml if present)")
                .value_parser(value_parser!(std::path::PathBuf))
                .global(true),
        )
        .subcommand(build_setup())
        .subcommand(build_reconfigure())
        .subcommand(build_progress())
}

fn build_setup() -> Command {
    Command::new("setup")
        .about("Validate and prepare failed segments before recovery")
        .arg(
            Arg::new("confinfo")
                .short('c')
                .long("confinfo")
                .help("JSON list of recovery descriptors")
                .required(true),
        )
        .arg(
            Arg::new("force-overwrite")
                .short('f')
                .long("force-overwrite")
                .help("Skip target directory validation for full recovery")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("batch-size")
                .short('b')
                .long("batch-size")
                .help("Maximum number of segments prepared concurrently")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("era")
                .long("era")
                .help("Coordinator era, recorded in the log"),
        )
}

fn build_reconfigure() -> Command {
    Command::new("reconfigure")
        .about("Trigger a fault probe and confirm the cluster accepts writes")
        .arg(
            Arg::new("host")
                .long("host")
                .help("Coordinator host (default: localhost)")
                .default_value("localhost"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .help("Coordinator port (default: 5432)")
                .value_parser(value_parser!(u16))
                .default_value("5432"),
        )
        .arg(
            Arg::new("database")
                .long("database")
                .help("Database to connect to (default: from config)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Deadline in seconds (default: from config)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("default-mode")
                .long("default-mode")
                .help("Use an ordinary session instead of utility mode")
                .action(ArgAction::SetTrue),
        )
}

fn build_progress() -> Command {
    Command::new("progress")
        .about("Show recovery progress parsed from progress files")
        .arg(
            Arg::new("dbid")
                .long("dbid")
                .help("Segment to report on (repeatable)")
                .value_parser(value_parser!(u32))
                .action(ArgAction::Append)
                .required(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("files")
                .help("Progress files to parse")
                .value_parser(value_parser!(std::path::PathBuf))
                .num_args(1..)
                .required(true),
        )
}
