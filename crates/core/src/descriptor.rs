//! Recovery descriptors
//!
//! A [`RecoveryDescriptor`] identifies one failed segment and the peer it will
//! be rebuilt from. Descriptors are produced by an external planner at the
//! start of a recovery episode and handed to the setup driver as a single
//! serialized list (see [`serialize_list`] / [`deserialize_list`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Catalog identity of a segment.
pub type Dbid = u32;

/// Recovery strategy implied by a descriptor's flags.
///
/// The `Display` form is the tag that recovery tools prefix to each line of
/// their progress file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryKind {
    /// Rebuild the data directory from a full base copy
    Full,
    /// Rewind the existing data directory to the source's timeline
    Incremental,
    /// Sync only changed bytes into the existing data directory
    Differential,
}

impl RecoveryKind {
    /// Progress-file tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryKind::Full => "full",
            RecoveryKind::Incremental => "incremental",
            RecoveryKind::Differential => "differential",
        }
    }
}

impl fmt::Display for RecoveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(RecoveryKind::Full),
            "incremental" => Ok(RecoveryKind::Incremental),
            "differential" => Ok(RecoveryKind::Differential),
            other => Err(Error::Serialization(format!(
                "unknown recovery kind '{}'",
                other
            ))),
        }
    }
}

/// Everything needed to prepare one failed segment for recovery.
///
/// `is_full_recovery` and `is_differential_recovery` are mutually exclusive;
/// with neither set the segment is recovered incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecoveryDescriptor {
    /// Data directory of the failed segment
    pub target_datadir: PathBuf,
    /// Port of the failed segment
    pub target_port: u16,
    /// Dbid of the failed segment
    #[serde(alias = "target_segment_dbid")]
    pub target_dbid: Dbid,
    /// Host of the healthy peer the segment is recovered from
    pub source_hostname: String,
    /// Port of the healthy peer
    pub source_port: u16,
    /// Data directory of the healthy peer
    pub source_datadir: PathBuf,
    /// Rebuild from scratch
    pub is_full_recovery: bool,
    /// Byte-level sync of the existing directory
    pub is_differential_recovery: bool,
    /// File the recovery tool reports progress into
    pub progress_file: PathBuf,
}

impl RecoveryDescriptor {
    /// Recovery strategy selected by the flags: full wins, then differential,
    /// otherwise incremental.
    pub fn recovery_kind(&self) -> RecoveryKind {
        if self.is_full_recovery {
            RecoveryKind::Full
        } else if self.is_differential_recovery {
            RecoveryKind::Differential
        } else {
            RecoveryKind::Incremental
        }
    }

    /// Check the flag invariant.
    pub fn validate(&self) -> Result<()> {
        if self.is_full_recovery && self.is_differential_recovery {
            return Err(Error::Serialization(format!(
                "segment with dbid {} requests both full and differential recovery",
                self.target_dbid
            )));
        }
        Ok(())
    }

    /// Copy of this descriptor pointing at a different target directory.
    pub fn with_target_datadir(&self, datadir: impl Into<PathBuf>) -> Self {
        RecoveryDescriptor {
            target_datadir: datadir.into(),
            ..self.clone()
        }
    }

    /// Target data directory as a path.
    pub fn target_datadir(&self) -> &Path {
        &self.target_datadir
    }
}

/// Encode a descriptor list as the single blob passed on the command line.
pub fn serialize_list(descriptors: &[RecoveryDescriptor]) -> Result<String> {
    Ok(serde_json::to_string(descriptors)?)
}

/// Decode a descriptor list.
///
/// Every entry must carry exactly the descriptor fields with the right types
/// and satisfy the flag invariant; a bad entry fails the whole decode and the
/// error names its index.
pub fn deserialize_list(blob: &str) -> Result<Vec<RecoveryDescriptor>> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(blob.trim())?;
    let mut descriptors = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        let descriptor: RecoveryDescriptor = serde_json::from_value(value)
            .map_err(|e| Error::Serialization(format!("entry {}: {}", index, e)))?;
        descriptor.validate().map_err(|e| match e {
            Error::Serialization(msg) => Error::Serialization(format!("entry {}: {}", index, msg)),
            other => other,
        })?;
        descriptors.push(descriptor);
    }
    Ok(descriptors)
}
