//! Preparation for a timeline rewind.
//!
//! The rewind tool needs the source's timeline identifier to be durable in
//! its control file, so the source is checkpointed first. Only then is the
//! stale pid file removed from the target.

use segrecover_core::{RecoveryDescriptor, Result};
use tracing::debug;

use crate::connection::{ConnectionGuard, ConnectionMode, DbEndpoint};
use crate::host::remove_postmaster_pid;

use super::SetupContext;

pub(super) fn setup(descriptor: &RecoveryDescriptor, ctx: &SetupContext) -> Result<()> {
    debug!(
        target: "segrecover::setup",
        dbid = descriptor.target_dbid,
        "Do CHECKPOINT on {} (port: {}) before running pg_rewind.",
        descriptor.source_hostname,
        descriptor.source_port
    );
    checkpoint_source(descriptor, ctx)?;

    remove_postmaster_pid(ctx.runner.as_ref(), descriptor.target_datadir())
}

fn checkpoint_source(descriptor: &RecoveryDescriptor, ctx: &SetupContext) -> Result<()> {
    let endpoint = DbEndpoint::new(
        descriptor.source_hostname.clone(),
        descriptor.source_port,
        ctx.bootstrap_database.clone(),
    );
    let mut conn = ConnectionGuard::new(ctx.connector.connect(&endpoint, ConnectionMode::Utility)?);
    conn.execute("CHECKPOINT")
}
