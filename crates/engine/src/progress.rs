//! Recovery progress telemetry
//!
//! Recovery tools append progress lines to per-segment files:
//!
//! ```text
//! full:1: 1164848/1371715 kB (84%), 0/1 tablespace (...)
//! incremental:2: 1171384/1371875 kB (85%)anything can appear here
//! differential:3:    122,017,543  74%   74.02MB/s    0:00:01 (xfr#1994, to-chk=963/2979) :Syncing pg_data of dbid 3
//! ```
//!
//! Parsing keeps a per-segment snapshot where the last well-formed line for a
//! dbid wins. Malformed lines, unknown tags, and dbids outside the active
//! segment set are skipped silently.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use segrecover_core::{Dbid, RecoveryKind};
use tracing::warn;

/// `<completed>/<total> kB (<pct>%)` at the start of the payload; anything
/// may follow the closing parenthesis.
static BASEBACKUP_PROGRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)/(\d+) kB \((\d+%)\)").expect("valid progress pattern")
});

/// Column-aligned sync transfer line ending in ` :<stage>`.
static SYNC_PROGRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+(?:,\d+)*)\s+(\d+%)\s(?:.*?\s)?:(.*)$").expect("valid sync pattern")
});

/// Latest progress of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentProgress {
    /// Recovery kind reported by the tool
    pub recovery_type: RecoveryKind,
    /// Bytes done, as printed by the tool (thousands separators kept)
    pub completed_bytes: String,
    /// Total bytes; empty for differential recovery
    pub total_bytes: String,
    /// Percentage including the trailing `%`
    pub percentage: String,
    /// Stage description; empty for full and incremental recovery
    pub stage: String,
}

/// Parse one progress line into `(dbid, progress)`.
///
/// Returns `None` for any line that does not match its tag's format exactly.
pub fn parse_progress_line(line: &str) -> Option<(Dbid, SegmentProgress)> {
    let line = line.trim_end();
    let mut parts = line.splitn(3, ':');
    let recovery_type: RecoveryKind = parts.next()?.parse().ok()?;
    let dbid: Dbid = parts.next()?.trim().parse().ok()?;
    let payload = parts.next()?;

    let progress = match recovery_type {
        RecoveryKind::Full | RecoveryKind::Incremental => {
            let caps = BASEBACKUP_PROGRESS.captures(payload)?;
            SegmentProgress {
                recovery_type,
                completed_bytes: caps[1].to_string(),
                total_bytes: caps[2].to_string(),
                percentage: caps[3].to_string(),
                stage: String::new(),
            }
        }
        RecoveryKind::Differential => {
            let caps = SYNC_PROGRESS.captures(payload)?;
            SegmentProgress {
                recovery_type,
                completed_bytes: caps[1].to_string(),
                total_bytes: String::new(),
                percentage: caps[2].to_string(),
                stage: caps[3].to_string(),
            }
        }
    };
    Some((dbid, progress))
}

/// Long-lived per-segment progress snapshot.
///
/// Records are replaced whole, under the shard lock of their dbid, so
/// readers never observe a half-updated record.
#[derive(Debug, Default)]
pub struct RecoveryProgress {
    segments: DashMap<Dbid, SegmentProgress>,
}

impl RecoveryProgress {
    /// Empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `path` and update the snapshot for every well-formed line whose
    /// dbid is in `active`.
    ///
    /// Returns the updated dbids in first-update order, without duplicates.
    /// A missing file updates nothing and is not an error.
    pub fn parse_progress_file(&self, path: &Path, active: &HashSet<Dbid>) -> Vec<Dbid> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(
                    target: "segrecover::progress",
                    path = %path.display(),
                    error = %e,
                    "Skipping unreadable progress file"
                );
                return Vec::new();
            }
        };

        let mut updated = Vec::new();
        for (dbid, progress) in content.lines().filter_map(parse_progress_line) {
            if !active.contains(&dbid) {
                continue;
            }
            self.segments.insert(dbid, progress);
            if !updated.contains(&dbid) {
                updated.push(dbid);
            }
        }
        updated
    }

    /// Parse every file in `paths`, in order.
    ///
    /// Returns the union of updated dbids in first-update order.
    pub fn parse_progress_files<P: AsRef<Path>>(&self, paths: &[P], active: &HashSet<Dbid>) -> Vec<Dbid> {
        let mut updated = Vec::new();
        for path in paths {
            for dbid in self.parse_progress_file(path.as_ref(), active) {
                if !updated.contains(&dbid) {
                    updated.push(dbid);
                }
            }
        }
        updated
    }

    /// Snapshot of one segment, if any line for it was seen.
    pub fn get(&self, dbid: Dbid) -> Option<SegmentProgress> {
        self.segments.get(&dbid).map(|entry| entry.value().clone())
    }

    fn field(&self, dbid: Dbid, f: impl FnOnce(&SegmentProgress) -> String) -> String {
        self.segments
            .get(&dbid)
            .map(|entry| f(entry.value()))
            .unwrap_or_default()
    }

    /// Recovery type tag, or `""`.
    pub fn recovery_type(&self, dbid: Dbid) -> String {
        self.field(dbid, |p| p.recovery_type.to_string())
    }

    /// Completed bytes, or `""`.
    pub fn completed_bytes(&self, dbid: Dbid) -> String {
        self.field(dbid, |p| p.completed_bytes.clone())
    }

    /// Total bytes, or `""`.
    pub fn total_bytes(&self, dbid: Dbid) -> String {
        self.field(dbid, |p| p.total_bytes.clone())
    }

    /// Percentage, or `""`.
    pub fn percentage(&self, dbid: Dbid) -> String {
        self.field(dbid, |p| p.percentage.clone())
    }

    /// Stage description, or `""`.
    pub fn stage(&self, dbid: Dbid) -> String {
        self.field(dbid, |p| p.stage.clone())
    }

    /// Forget one segment's progress, e.g. once its recovery finished.
    pub fn clear(&self, dbid: Dbid) {
        self.segments.remove(&dbid);
    }

    /// Rows `[dbid, type, completed, total, percentage, stage]` for every
    /// dbid in `dbids`, sorted by dbid; unknown segments render as empty
    /// strings.
    pub fn render_rows(&self, dbids: &[Dbid]) -> Vec<[String; 6]> {
        let mut dbids = dbids.to_vec();
        dbids.sort_unstable();
        dbids.dedup();
        dbids
            .into_iter()
            .map(|dbid| {
                [
                    dbid.to_string(),
                    self.recovery_type(dbid),
                    self.completed_bytes(dbid),
                    self.total_bytes(dbid),
                    self.percentage(dbid),
                    self.stage(dbid),
                ]
            })
            .collect()
    }
}
