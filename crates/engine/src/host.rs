//! Local host command execution
//!
//! Preparation steps that touch the segment host's filesystem outside the
//! data-directory checks go through a [`HostCommandRunner`], so tests can
//! substitute a runner that fails on demand.

use std::path::Path;
use std::process::Command;

use segrecover_core::{CommandResult, Error, Result};
use tracing::debug;

/// Lock/pid artifact left behind by a postmaster that did not shut down cleanly.
pub const POSTMASTER_PID: &str = "postmaster.pid";

/// Runs a shell command line on the local host.
pub trait HostCommandRunner: Send + Sync {
    /// Run `cmd_str`, labelled `name` for logging, and capture its outcome.
    fn run(&self, name: &str, cmd_str: &str) -> CommandResult;
}

/// [`HostCommandRunner`] backed by `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl HostCommandRunner for ShellRunner {
    fn run(&self, name: &str, cmd_str: &str) -> CommandResult {
        debug!(target: "segrecover::host", name, cmd = cmd_str, "Running command");
        match Command::new("sh").arg("-c").arg(cmd_str).output() {
            Ok(output) => CommandResult::new(
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            ),
            Err(e) => CommandResult::new(127, "", e.to_string()),
        }
    }
}

/// Quote `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Remove a stale postmaster pid file from `datadir`, tolerating its absence.
///
/// The failed segment is not expected to be running, so removing the file is
/// safe; leaving it makes the recovery tools refuse to start the segment in
/// single-user mode.
pub fn remove_postmaster_pid(runner: &dyn HostCommandRunner, datadir: &Path) -> Result<()> {
    let pid_file = datadir.join(POSTMASTER_PID);
    let cmd_str = format!("rm -f {}", shell_quote(&pid_file.to_string_lossy()));
    let result = runner.run("remove postmaster.pid", &cmd_str);
    if !result.succeeded() {
        debug!(
            target: "segrecover::host",
            rc = result.rc,
            stderr = %result.stderr.trim(),
            "Removing postmaster.pid failed"
        );
        return Err(Error::validation("Failed while trying to remove postmaster.pid."));
    }
    Ok(())
}
