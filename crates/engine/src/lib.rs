//! Segment recovery engine
//!
//! This crate prepares failed segments for recovery and confirms failover:
//! - setup: per-kind preparation strategies (full, incremental, differential)
//! - command: unit-of-work wrapper turning every failure into a result
//! - pool: bounded worker pool dispatching units of work
//! - batch: descriptors in, aggregated report out
//! - reconfigure: probe-then-confirm failover check under a shared deadline
//! - progress: parser for recovery progress telemetry
//!
//! Database sessions and host commands sit behind the [`Connector`] and
//! [`HostCommandRunner`] traits so callers plug in their own transport.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod clock;
pub mod command;
pub mod config;
pub mod connection;
pub mod host;
pub mod pool;
pub mod progress;
pub mod reconfigure;
pub mod setup;

pub use batch::{run_setup, BatchReport, SetupOptions};
pub use clock::{Clock, SystemClock};
pub use command::{build_setup_commands, SetupCommand};
pub use config::RecoveryConfig;
pub use connection::{Connection, ConnectionGuard, ConnectionMode, Connector, DbEndpoint};
pub use host::{remove_postmaster_pid, HostCommandRunner, ShellRunner};
pub use pool::{submit_all, PoolClosedError, PoolStats, UnitOfWork, WorkerPool};
pub use progress::{parse_progress_line, RecoveryProgress, SegmentProgress};
pub use reconfigure::{ReconfigurePhase, ReconfigureReport, SegmentReconfigurer};
pub use setup::{classify, SetupContext, SetupStrategy};
