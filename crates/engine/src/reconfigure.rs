//! Failover confirmation with a shared deadline
//!
//! After a mirror is promoted the coordinator has to notice. The reconfigurer
//! drives two phases under one wall-clock budget measured from first entry:
//!
//! 1. **Probe**: request a fault-detection scan from the coordinator.
//! 2. **Confirm**: run a throwaway write transaction, proving the write path
//!    is served again.
//!
//! Connection failures are retried immediately within the current phase.
//! There is no backoff; callers that need one wrap the reconfigurer. Each
//! attempt opens its own connection and closes it before the next attempt.
//!
//! The terminal timeout messages are fixed per phase: a deadline hit while
//! probing reports "Mirror promotion did not complete ...", a deadline hit
//! while confirming reports "FTS probing did not complete ...".

use std::sync::Arc;
use std::time::Duration;

use segrecover_core::{Error, Result};
use tracing::{debug, error, info};

use crate::clock::{Clock, SystemClock};
use crate::connection::{ConnectionGuard, ConnectionMode, Connector, DbEndpoint};

/// Statement that asks the coordinator to run a fault-detection scan.
pub const FTS_PROBE_QUERY: &str = "SELECT pg_catalog.gp_request_fts_probe_scan()";

/// Statements of the confirmation write transaction, executed in order.
pub const CONFIRM_STATEMENTS: [&str; 3] = ["BEGIN", "CREATE TEMP TABLE temp_test(a int)", "COMMIT"];

/// Phase of the reconfiguration protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconfigurePhase {
    /// Requesting the fault probe
    Probe,
    /// Confirming the write path
    Confirm,
}

impl ReconfigurePhase {
    /// Fatal message reported when the deadline expires in this phase.
    pub fn timeout_message(&self, timeout_secs: u64) -> String {
        match self {
            ReconfigurePhase::Probe => {
                format!("Mirror promotion did not complete in {} seconds.", timeout_secs)
            }
            ReconfigurePhase::Confirm => {
                format!("FTS probing did not complete in {} seconds.", timeout_secs)
            }
        }
    }
}

/// Diagnostics from a successful reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconfigureReport {
    /// Probe attempts made, including the successful one
    pub probe_attempts: u32,
    /// Confirmation attempts made, including the successful one
    pub confirm_attempts: u32,
    /// Time from first entry to success
    pub elapsed: Duration,
}

/// Confirms that the cluster serves writes after a failover.
pub struct SegmentReconfigurer {
    connector: Arc<dyn Connector>,
    endpoint: DbEndpoint,
    mode: ConnectionMode,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl SegmentReconfigurer {
    /// Reconfigurer against `endpoint` with a utility-mode session and the
    /// system clock.
    pub fn new(connector: Arc<dyn Connector>, endpoint: DbEndpoint, timeout: Duration) -> Self {
        SegmentReconfigurer {
            connector,
            endpoint,
            mode: ConnectionMode::Utility,
            timeout,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the session mode.
    pub fn with_mode(mut self, mode: ConnectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Configured deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the probe, then confirm the write path, retrying connection
    /// failures until the shared deadline passes.
    ///
    /// Non-connection errors abort immediately.
    pub fn reconfigure(&self) -> Result<ReconfigureReport> {
        info!(target: "segrecover::reconfigure", endpoint = %self.endpoint, "Triggering segment reconfiguration");

        let start = self.clock.now();
        let mut phase = ReconfigurePhase::Probe;
        let mut probe_attempts = 0u32;
        let mut confirm_attempts = 0u32;

        loop {
            let attempt = match phase {
                ReconfigurePhase::Probe => {
                    probe_attempts += 1;
                    self.trigger_fts_probe()
                }
                ReconfigurePhase::Confirm => {
                    confirm_attempts += 1;
                    self.confirm_write_path()
                }
            };

            match attempt {
                Ok(()) if phase == ReconfigurePhase::Probe => {
                    debug!(target: "segrecover::reconfigure", probe_attempts, "FTS probe requested");
                    phase = ReconfigurePhase::Confirm;
                }
                Ok(()) => {
                    let report = ReconfigureReport {
                        probe_attempts,
                        confirm_attempts,
                        elapsed: self.clock.now().saturating_duration_since(start),
                    };
                    info!(
                        target: "segrecover::reconfigure",
                        probe_attempts,
                        confirm_attempts,
                        "Segment reconfiguration complete"
                    );
                    return Ok(report);
                }
                Err(e) if e.is_transient() => {
                    let elapsed = self.clock.now().saturating_duration_since(start);
                    if elapsed >= self.timeout {
                        let message = phase.timeout_message(self.timeout.as_secs());
                        error!(
                            target: "segrecover::reconfigure",
                            ?phase,
                            probe_attempts,
                            confirm_attempts,
                            last_error = %e,
                            "{}",
                            message
                        );
                        return Err(Error::timeout(message));
                    }
                    debug!(
                        target: "segrecover::reconfigure",
                        ?phase,
                        elapsed_secs = elapsed.as_secs(),
                        error = %e,
                        "Attempt failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn trigger_fts_probe(&self) -> Result<()> {
        let mut conn = ConnectionGuard::new(self.connector.connect(&self.endpoint, self.mode)?);
        conn.execute(FTS_PROBE_QUERY)
    }

    fn confirm_write_path(&self) -> Result<()> {
        let mut conn = ConnectionGuard::new(self.connector.connect(&self.endpoint, self.mode)?);
        for sql in CONFIRM_STATEMENTS {
            conn.execute(sql)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_messages_per_phase() {
        assert_eq!(
            ReconfigurePhase::Probe.timeout_message(600),
            "Mirror promotion did not complete in 600 seconds."
        );
        assert_eq!(
            ReconfigurePhase::Confirm.timeout_message(30),
            "FTS probing did not complete in 30 seconds."
        );
    }
}
