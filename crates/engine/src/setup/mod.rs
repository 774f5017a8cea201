//! Recovery classification and per-strategy preparation
//!
//! Each failed segment is classified into exactly one [`SetupStrategy`]:
//!
//! | Flags | Strategy | Preparation |
//! |-------|----------|-------------|
//! | `is_full_recovery` | Full | target directory must be absent or empty |
//! | `is_differential_recovery` | Differential | remove stale postmaster.pid |
//! | neither | Incremental | CHECKPOINT on source, then remove stale postmaster.pid |
//!
//! Strategies return `Result` and use `?` internally; the conversion into a
//! structured result happens once, in [`crate::command::SetupCommand`].

mod differential;
mod full;
mod incremental;

use std::sync::Arc;

use segrecover_core::{RecoveryDescriptor, RecoveryKind, Result};

use crate::connection::{Connector, BOOTSTRAP_DATABASE};
use crate::host::{HostCommandRunner, ShellRunner};

/// Preparation strategy for one failed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStrategy {
    /// Validate the target directory before a full base copy
    Full {
        /// Skip directory checks entirely
        force_overwrite: bool,
    },
    /// Checkpoint the source and clear the pid file before a timeline rewind
    Incremental,
    /// Clear the pid file before a differential sync
    Differential,
}

/// Select the strategy for `descriptor`.
///
/// Full wins over differential; with neither flag set the segment is
/// recovered incrementally. `force_overwrite` only affects full recovery.
pub fn classify(descriptor: &RecoveryDescriptor, force_overwrite: bool) -> SetupStrategy {
    match descriptor.recovery_kind() {
        RecoveryKind::Full => SetupStrategy::Full { force_overwrite },
        RecoveryKind::Differential => SetupStrategy::Differential,
        RecoveryKind::Incremental => SetupStrategy::Incremental,
    }
}

impl SetupStrategy {
    /// Recovery kind this strategy prepares for.
    pub fn kind(&self) -> RecoveryKind {
        match self {
            SetupStrategy::Full { .. } => RecoveryKind::Full,
            SetupStrategy::Incremental => RecoveryKind::Incremental,
            SetupStrategy::Differential => RecoveryKind::Differential,
        }
    }

    /// Name of the unit of work, naming the tool it prepares for.
    pub fn command_name(&self) -> &'static str {
        match self {
            SetupStrategy::Full { .. } => "Validate target segment dir for pg_basebackup",
            SetupStrategy::Incremental => "Setup for pg_rewind",
            SetupStrategy::Differential => "Setup for differential recovery",
        }
    }

    /// Run the strategy's validation and preparation for `descriptor`.
    pub fn prepare(&self, descriptor: &RecoveryDescriptor, ctx: &SetupContext) -> Result<()> {
        match *self {
            SetupStrategy::Full { force_overwrite } => full::validate(descriptor, force_overwrite),
            SetupStrategy::Incremental => incremental::setup(descriptor, ctx),
            SetupStrategy::Differential => differential::setup(descriptor, ctx),
        }
    }
}

/// Collaborators shared by every unit of work in a batch.
#[derive(Clone)]
pub struct SetupContext {
    /// Opens the source-side checkpoint connection
    pub connector: Arc<dyn Connector>,
    /// Runs host commands such as pid-file removal
    pub runner: Arc<dyn HostCommandRunner>,
    /// Database the checkpoint connects to
    pub bootstrap_database: String,
}

impl SetupContext {
    /// Context using `connector` and the shell runner.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        SetupContext {
            connector,
            runner: Arc::new(ShellRunner),
            bootstrap_database: BOOTSTRAP_DATABASE.to_string(),
        }
    }

    /// Replace the host command runner.
    pub fn with_runner(mut self, runner: Arc<dyn HostCommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the checkpoint database.
    pub fn with_bootstrap_database(mut self, database: impl Into<String>) -> Self {
        self.bootstrap_database = database.into();
        self
    }
}

impl std::fmt::Debug for SetupContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupContext")
            .field("bootstrap_database", &self.bootstrap_database)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn descriptor(full: bool, differential: bool) -> RecoveryDescriptor {
        RecoveryDescriptor {
            target_datadir: PathBuf::from("/data/mirror0"),
            target_port: 50000,
            target_dbid: 2,
            source_hostname: "sdw1".to_string(),
            source_port: 40000,
            source_datadir: PathBuf::from("/data/primary0"),
            is_full_recovery: full,
            is_differential_recovery: differential,
            progress_file: PathBuf::from("/tmp/test_progress_file"),
        }
    }

    #[test]
    fn test_classify_full() {
        assert_eq!(
            classify(&descriptor(true, false), false),
            SetupStrategy::Full {
                force_overwrite: false
            }
        );
        assert_eq!(
            classify(&descriptor(true, false), true),
            SetupStrategy::Full {
                force_overwrite: true
            }
        );
    }

    #[test]
    fn test_classify_differential() {
        assert_eq!(
            classify(&descriptor(false, true), true),
            SetupStrategy::Differential
        );
    }

    #[test]
    fn test_classify_incremental() {
        assert_eq!(
            classify(&descriptor(false, false), true),
            SetupStrategy::Incremental
        );
    }

    #[test]
    fn test_command_names_name_the_tool() {
        assert!(SetupStrategy::Full {
            force_overwrite: false
        }
        .command_name()
        .contains("pg_basebackup"));
        assert!(SetupStrategy::Incremental.command_name().contains("pg_rewind"));
        assert!(SetupStrategy::Differential
            .command_name()
            .contains("differential"));
    }

    #[test]
    fn test_strategy_kind_matches_descriptor_kind() {
        for (full, differential) in [(true, false), (false, true), (false, false)] {
            let d = descriptor(full, differential);
            assert_eq!(classify(&d, false).kind(), d.recovery_kind());
        }
    }
}
