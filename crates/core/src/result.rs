//! Unit-of-work results and the structured error record
//!
//! Every unit of work yields exactly one [`CommandResult`]. A failed result
//! carries an [`ErrorRecord`] serialized as JSON in its `stderr`, which the
//! batch driver aggregates into a single JSON array.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::descriptor::{Dbid, RecoveryDescriptor};

/// Outcome of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit code; 0 means success
    pub rc: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error, or a JSON [`ErrorRecord`] for failed setup units
    pub stderr: String,
}

impl CommandResult {
    /// Build a result from its parts.
    pub fn new(rc: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        CommandResult {
            rc,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Successful result with empty output.
    pub fn success() -> Self {
        CommandResult::default()
    }

    /// Failed result (`rc = 1`) whose stderr is the serialized record.
    pub fn from_error_record(record: &ErrorRecord) -> Self {
        CommandResult::new(1, "", record.to_json())
    }

    /// `rc == 0`.
    pub fn succeeded(&self) -> bool {
        self.rc == 0
    }

    /// Decode the structured error record carried in stderr, if any.
    pub fn error_record(&self) -> Option<ErrorRecord> {
        if self.succeeded() {
            return None;
        }
        serde_json::from_str(&self.stderr).ok()
    }
}

/// Error category reported to the recovery controller.
///
/// The setup subsystem only emits [`RecoveryErrorType::Validation`]; the
/// remaining types are produced by the recovery tools themselves and are
/// accepted so that records from any stage can be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryErrorType {
    /// Preparation/validation failure
    Validation,
    /// Full base copy failed
    Full,
    /// Timeline rewind failed
    Incremental,
    /// Differential sync failed
    Differential,
    /// Segment failed to start after recovery
    Start,
    /// Catalog update failed
    Update,
    /// Anything else
    Default,
}

/// Machine-parseable description of one failed segment.
///
/// Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Failure category
    pub error_type: RecoveryErrorType,
    /// Human-readable failure message
    pub error_msg: String,
    /// Dbid of the affected segment
    pub dbid: Dbid,
    /// Target data directory of the affected segment
    pub datadir: PathBuf,
    /// Target port of the affected segment
    pub port: u16,
    /// Progress file of the affected segment
    pub progress_file: PathBuf,
}

impl ErrorRecord {
    /// Record for `descriptor` with the given type and message.
    pub fn new(
        error_type: RecoveryErrorType,
        error_msg: impl Into<String>,
        descriptor: &RecoveryDescriptor,
    ) -> Self {
        ErrorRecord {
            error_type,
            error_msg: error_msg.into(),
            dbid: descriptor.target_dbid,
            datadir: descriptor.target_datadir.clone(),
            port: descriptor.target_port,
            progress_file: descriptor.progress_file.clone(),
        }
    }

    /// JSON object form.
    pub fn to_json(&self) -> String {
        // Serializing plain strings, integers and paths only fails for
        // non-UTF-8 paths; fall back to a lossy rendering in that case.
        serde_json::to_string(self).unwrap_or_else(|_| {
            serde_json::json!({
                "error_type": self.error_type,
                "error_msg": self.error_msg,
                "dbid": self.dbid,
                "datadir": self.datadir.to_string_lossy(),
                "port": self.port,
                "progress_file": self.progress_file.to_string_lossy(),
            })
            .to_string()
        })
    }
}
