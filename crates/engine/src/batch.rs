//! Batch driver for recovery setup
//!
//! Descriptors → one [`SetupCommand`] each → bounded dispatch → aggregated
//! report. Failures are collected, never short-circuited: the report's JSON
//! array lists every failed segment and the exit code reflects the batch.

use std::sync::Arc;

use segrecover_core::{CommandResult, RecoveryDescriptor};
use serde_json::Value;
use tracing::info;

use crate::command::build_setup_commands;
use crate::config::DEFAULT_BATCH_SIZE;
use crate::pool::{submit_all, UnitOfWork};
use crate::setup::SetupContext;

/// Knobs for one setup batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupOptions {
    /// Skip target directory validation for full recovery
    pub force_overwrite: bool,
    /// Concurrency ceiling
    pub batch_size: usize,
}

impl Default for SetupOptions {
    fn default() -> Self {
        SetupOptions {
            force_overwrite: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Outcome of a setup batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// One result per descriptor, in completion order
    pub results: Vec<CommandResult>,
}

impl BatchReport {
    /// Results of units that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &CommandResult> {
        self.results.iter().filter(|r| !r.succeeded())
    }

    /// True when every unit succeeded (vacuously true for an empty batch).
    pub fn succeeded(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Process exit status: 0 iff no unit failed.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    /// JSON array of every failure's structured error, or `None` when there
    /// are no failures.
    ///
    /// A stderr payload that is not JSON is embedded as a string.
    pub fn errors_json(&self) -> Option<String> {
        let errors: Vec<Value> = self
            .failures()
            .map(|r| serde_json::from_str(&r.stderr).unwrap_or_else(|_| Value::String(r.stderr.clone())))
            .collect();
        if errors.is_empty() {
            return None;
        }
        Some(Value::Array(errors).to_string())
    }
}

/// Prepare every descriptor for recovery and report the aggregated outcome.
pub fn run_setup(
    descriptors: Vec<RecoveryDescriptor>,
    options: SetupOptions,
    ctx: Arc<SetupContext>,
) -> BatchReport {
    let total = descriptors.len();
    let units: Vec<Box<dyn UnitOfWork>> = build_setup_commands(descriptors, options.force_overwrite, ctx)
        .into_iter()
        .map(|cmd| Box::new(cmd) as Box<dyn UnitOfWork>)
        .collect();

    let results = submit_all(units, options.batch_size);
    let report = BatchReport { results };
    info!(
        target: "segrecover::setup",
        total,
        failed = report.failures().count(),
        "Recovery setup batch finished"
    );
    report
}
