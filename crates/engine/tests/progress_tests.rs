//! Progress File Tests
//!
//! Parses realistic recovery progress files from disk into the shared
//! snapshot.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use segrecover_engine::RecoveryProgress;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn active(dbids: &[u32]) -> HashSet<u32> {
    dbids.iter().copied().collect()
}

#[test]
fn test_single_full_line() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "recovery_progress.file",
        "full:1: 1164848/1371715 kB (84%), 0/1 tablespace (...t1/demoDataDir0/base/16384/40962)\n",
    );

    let progress = RecoveryProgress::new();
    assert_eq!(progress.parse_progress_file(&path, &active(&[1])), vec![1]);
    assert_eq!(progress.recovery_type(1), "full");
    assert_eq!(progress.completed_bytes(1), "1164848");
    assert_eq!(progress.total_bytes(1), "1371715");
    assert_eq!(progress.percentage(1), "84%");
    assert_eq!(progress.stage(1), "");
}

#[test]
fn test_multiple_segments_in_one_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "recovery_progress.file",
        "full:1: 1164848/1371715 kB (84%), 0/1 tablespace (...t1/demoDataDir0/base/16384/40962)\n\
         incremental:2: 1171384/1371875 kB (85%)anything can appear here\n",
    );

    let progress = RecoveryProgress::new();
    assert_eq!(progress.parse_progress_file(&path, &active(&[1, 2])), vec![1, 2]);
    assert_eq!(progress.recovery_type(2), "incremental");
    assert_eq!(progress.completed_bytes(2), "1171384");
    assert_eq!(progress.total_bytes(2), "1371875");
    assert_eq!(progress.percentage(2), "85%");
}

#[test]
fn test_malformed_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "recovery_progress.file",
        "full:1: 1164848/1371715 kB (84%), 0/1 tablespace (...t1/demoDataDir0/base/16384/40962)\n\
         incremental:2: 1171384/1371875 kB (85%)anything can appear here\n\
         full:3: 1164848/1371715 kB (100#), 0/1 tablespace\n\
         full:4: 1164848/1371715 kB 84%, 0/1 tablespace\n\
         full:5: 1164848/1371715 kB (100), 0/1 tablespace\n\
         full:6: /1371715 kB (100%, 0/1 tablespace\n\
         full:7: 1/1371715 KB (100%), 0/1 tablespace\n\
         full:8: 1/1371715 MB (100%), 0/1 tablespace\n\
         incremental:9: pg_rewind: done.\n\
         incremental:10: 1171384/1371875 kB (a8ab5%)\n\
         incremental:11: 1171384/1371875 kB (foo%))\n\
         bogus:12: 1/2 kB (50%)\n\
         full:notadbid: 1/2 kB (50%)\n",
    );

    let all: Vec<u32> = (1..=12).collect();
    let progress = RecoveryProgress::new();
    assert_eq!(progress.parse_progress_file(&path, &active(&all)), vec![1, 2]);
    for dbid in 3..=12 {
        assert_eq!(progress.percentage(dbid), "", "dbid {} should not update", dbid);
    }
}

#[test]
fn test_differential_lines() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "recovery_progress.file",
        "differential:1:     38,861,653   7%   43.45MB/s    0:00:00 (xfr#635, ir-chk=9262/9919) :Syncing pg_data of dbid 1\n\
         differential:2:     16,617,093  86%   21.45MB/s    0:00:00 (xfr#1, to-chk=0/1) :Syncing tablespace of dbid 2 for oid 17934\n\
         differential:3:    122,017,543  (74%)   74.02MB/s    0:00:01 (xfr#1994, to-chk=963/2979) :Invalid format\n",
    );

    let progress = RecoveryProgress::new();
    assert_eq!(progress.parse_progress_file(&path, &active(&[1, 2, 3])), vec![1, 2]);
    assert_eq!(progress.recovery_type(1), "differential");
    assert_eq!(progress.completed_bytes(1), "38,861,653");
    assert_eq!(progress.total_bytes(1), "");
    assert_eq!(progress.percentage(1), "7%");
    assert_eq!(progress.stage(1), "Syncing pg_data of dbid 1");
    assert_eq!(progress.completed_bytes(2), "16,617,093");
    assert_eq!(progress.percentage(2), "86%");
    assert_eq!(progress.stage(2), "Syncing tablespace of dbid 2 for oid 17934");
    assert_eq!(progress.stage(3), "");
}

#[test]
fn test_last_line_wins_and_dbids_are_deduplicated() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "recovery_progress.file",
        "full:2: 10/100 kB (10%)\n\
         full:1: 5/100 kB (5%)\n\
         full:2: 90/100 kB (90%)\n",
    );

    let progress = RecoveryProgress::new();
    assert_eq!(progress.parse_progress_file(&path, &active(&[1, 2])), vec![2, 1]);
    assert_eq!(progress.percentage(2), "90%");
    assert_eq!(progress.completed_bytes(2), "90");
}

#[test]
fn test_inactive_dbids_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "progress", "full:1: 10/100 kB (10%)\nfull:7: 10/100 kB (10%)\n");

    let progress = RecoveryProgress::new();
    assert_eq!(progress.parse_progress_file(&path, &active(&[1])), vec![1]);
    assert_eq!(progress.percentage(7), "");
}

#[test]
fn test_missing_file_updates_nothing() {
    let dir = TempDir::new().unwrap();
    let progress = RecoveryProgress::new();
    assert!(progress
        .parse_progress_file(&dir.path().join("absent"), &active(&[1]))
        .is_empty());
}

#[test]
fn test_multiple_files_union_in_order() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a", "full:3: 1/2 kB (50%)\n");
    let b = write(&dir, "b", "incremental:1: 1/4 kB (25%)\nfull:3: 2/2 kB (100%)\n");
    let missing = dir.path().join("c");

    let progress = RecoveryProgress::new();
    let updated = progress.parse_progress_files(&[a, b, missing], &active(&[1, 3]));
    assert_eq!(updated, vec![3, 1]);
    assert_eq!(progress.percentage(3), "100%");
    assert_eq!(progress.percentage(1), "25%");
}
