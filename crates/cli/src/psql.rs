//! `psql`-backed SQL connector
//!
//! Each flushed statement batch is one `psql` process, and therefore one
//! server session. A `BEGIN` starts buffering on the client; the buffer is
//! sent as a single session when `COMMIT` arrives, so the transaction
//! boundary survives the process-per-call model.

use std::path::PathBuf;
use std::process::Command;

use segrecover_core::{Error, Result};
use segrecover_engine::{Connection, ConnectionMode, Connector, DbEndpoint};
use tracing::debug;

/// `PGOPTIONS` value that requests a utility-mode session.
pub const UTILITY_MODE_OPTIONS: &str = "-c gp_role=utility";

/// Opens [`PsqlConnection`]s using the given client binary.
#[derive(Debug, Clone)]
pub struct PsqlConnector {
    psql_path: PathBuf,
}

impl PsqlConnector {
    /// Connector running `psql_path`.
    pub fn new(psql_path: impl Into<PathBuf>) -> Self {
        PsqlConnector {
            psql_path: psql_path.into(),
        }
    }
}

impl Connector for PsqlConnector {
    fn connect(&self, endpoint: &DbEndpoint, mode: ConnectionMode) -> Result<Box<dyn Connection>> {
        Ok(Box::new(PsqlConnection {
            psql_path: self.psql_path.clone(),
            endpoint: endpoint.clone(),
            mode,
            pending: None,
            closed: false,
        }))
    }
}

/// One logical session.
pub struct PsqlConnection {
    psql_path: PathBuf,
    endpoint: DbEndpoint,
    mode: ConnectionMode,
    pending: Option<Vec<String>>,
    closed: bool,
}

impl PsqlConnection {
    fn run(&self, statements: &[String]) -> Result<()> {
        let mut cmd = Command::new(&self.psql_path);
        cmd.args(psql_args(&self.endpoint, statements));
        if self.mode == ConnectionMode::Utility {
            cmd.env("PGOPTIONS", UTILITY_MODE_OPTIONS);
        }
        debug!(
            target: "segrecover::psql",
            endpoint = %self.endpoint,
            statements = statements.len(),
            "Running psql"
        );

        let output = cmd.output().map_err(|e| {
            Error::validation(format!("Failed to run {}: {}", self.psql_path.display(), e))
        })?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let rc = output.status.code().unwrap_or(-1);
        Err(session_failure(rc, stderr))
    }
}

impl Connection for PsqlConnection {
    fn execute(&mut self, sql: &str) -> Result<()> {
        if self.closed {
            return Err(Error::connection("connection already closed"));
        }
        let keyword = sql.trim().trim_end_matches(';').to_ascii_uppercase();

        if let Some(buffer) = self.pending.as_mut() {
            buffer.push(sql.to_string());
            if keyword == "COMMIT" || keyword == "END" || keyword == "ROLLBACK" {
                let statements = self.pending.take().unwrap_or_default();
                return self.run(&statements);
            }
            return Ok(());
        }

        if keyword == "BEGIN" || keyword == "START TRANSACTION" {
            self.pending = Some(vec![sql.to_string()]);
            return Ok(());
        }
        self.run(&[sql.to_string()])
    }

    fn close(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(
                target: "segrecover::psql",
                endpoint = %self.endpoint,
                statements = pending.len(),
                "Discarding uncommitted transaction"
            );
        }
        self.closed = true;
    }
}

/// Command-line arguments for one psql session running `statements`.
pub fn psql_args(endpoint: &DbEndpoint, statements: &[String]) -> Vec<String> {
    let mut args = vec![
        "-X".to_string(),
        "-q".to_string(),
        "-v".to_string(),
        "ON_ERROR_STOP=1".to_string(),
        "-h".to_string(),
        endpoint.host.clone(),
        "-p".to_string(),
        endpoint.port.to_string(),
        "-d".to_string(),
        endpoint.database.clone(),
    ];
    for sql in statements {
        args.push("-c".to_string());
        args.push(sql.clone());
    }
    args
}

/// A psql run that failed after starting is a driver error and is retried by
/// callers. Only failing to spawn psql at all is fatal.
fn session_failure(rc: i32, stderr: String) -> Error {
    if stderr.is_empty() {
        Error::connection(format!("psql exited with status {}", rc))
    } else {
        Error::connection(stderr)
    }
}
