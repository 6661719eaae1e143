// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL files where the latest line for a given id wins on
//! read. Malformed lines are skipped rather than failing the whole read —
//! a torn write at the tail of the file should not take down every other
//! record.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Append one record as a single JSON line, flushing before returning.
pub fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<(), StorageError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    file.write_all(line.as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Fold a JSONL file by `id_of`, keeping only the latest record per id, in
/// first-seen order of each id's most recent line.
pub fn fold_latest<T, F>(path: &Path, id_of: F) -> Result<Vec<T>, StorageError>
where
    T: DeserializeOwned,
    F: Fn(&T) -> String,
{
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    let mut latest: BTreeMap<String, (usize, T)> = BTreeMap::new();
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => {
                let id = id_of(&record);
                latest.insert(id, (line_no, record));
            }
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed jsonl line");
            }
        }
    }
    let mut ordered: Vec<(usize, T)> = latest.into_values().collect();
    ordered.sort_by_key(|(line_no, _)| *line_no);
    Ok(ordered.into_iter().map(|(_, record)| record).collect())
}

/// Append every line unconditionally (used for the audit log, which has no
/// id-keyed dedup semantics).
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => out.push(record),
            Err(e) => tracing::warn!(line = line_no, error = %e, "skipping malformed jsonl line"),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Rec {
        id: String,
        value: u32,
    }

    #[test]
    fn latest_line_per_id_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.jsonl");
        append_line(&path, &Rec { id: "a".into(), value: 1 }).unwrap();
        append_line(&path, &Rec { id: "b".into(), value: 1 }).unwrap();
        append_line(&path, &Rec { id: "a".into(), value: 2 }).unwrap();

        let records = fold_latest::<Rec, _>(&path, |r| r.id.clone()).unwrap();
        let a = records.iter().find(|r| r.id == "a").unwrap();
        assert_eq!(a.value, 2);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn malformed_trailing_line_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.jsonl");
        append_line(&path, &Rec { id: "a".into(), value: 1 }).unwrap();
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{not json\n").unwrap();

        let records = fold_latest::<Rec, _>(&path, |r| r.id.clone()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.jsonl");
        let records = fold_latest::<Rec, _>(&path, |r| r.id.clone()).unwrap();
        assert!(records.is_empty());
    }
}
