//! Preparation for a differential sync: only the stale pid file is cleared.

use segrecover_core::{RecoveryDescriptor, Result};
use tracing::debug;

use crate::host::remove_postmaster_pid;

use super::SetupContext;

pub(super) fn setup(descriptor: &RecoveryDescriptor, ctx: &SetupContext) -> Result<()> {
    debug!(
        target: "segrecover::setup",
        dbid = descriptor.target_dbid,
        datadir = %descriptor.target_datadir.display(),
        "Removing stale postmaster.pid before differential recovery"
    );
    remove_postmaster_pid(ctx.runner.as_ref(), descriptor.target_datadir())
}
