//! Target directory validation before a full base copy.
//!
//! A full recovery replaces the data directory wholesale, so the directory
//! must be absent or empty unless the operator forces an overwrite.

use std::fs::{self, DirBuilder, Permissions};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;

use segrecover_core::{Error, RecoveryDescriptor, Result};
use tracing::info;

/// Mode of a freshly created data directory.
const DATADIR_MODE: u32 = 0o700;

pub(super) fn validate(descriptor: &RecoveryDescriptor, force_overwrite: bool) -> Result<()> {
    info!(
        target: "segrecover::setup",
        dbid = descriptor.target_dbid,
        "Validate data directories for segment with dbid {}",
        descriptor.target_dbid
    );
    if !force_overwrite {
        validate_failover_data_directory(descriptor)?;
    }
    info!(
        target: "segrecover::setup",
        dbid = descriptor.target_dbid,
        "Validation successful for segment with dbid: {}",
        descriptor.target_dbid
    );
    Ok(())
}

fn validate_failover_data_directory(descriptor: &RecoveryDescriptor) -> Result<()> {
    let datadir = descriptor.target_datadir();

    if !parent_exists(datadir) {
        make_or_update_data_directory(datadir)?;
    }

    if !datadir.exists() {
        return Ok(());
    }

    if fs::read_dir(datadir)?.next().is_some() {
        return Err(Error::validation(format!(
            "for segment with port {}: Segment directory '{}' exists but is not empty!",
            descriptor.target_port,
            datadir.display()
        )));
    }
    Ok(())
}

// A bare relative name has an empty parent, which is the working directory.
fn parent_exists(datadir: &Path) -> bool {
    match datadir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.exists(),
        _ => true,
    }
}

// Missing ancestors get the default mode; only the target is forced to 0700.
fn make_or_update_data_directory(datadir: &Path) -> Result<()> {
    if !datadir.exists() {
        if let Some(parent) = datadir.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        DirBuilder::new().mode(DATADIR_MODE).create(datadir)?;
    }
    // The creation mode is filtered by the umask.
    fs::set_permissions(datadir, Permissions::from_mode(DATADIR_MODE))?;
    Ok(())
}
