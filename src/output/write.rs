// src/output/write.rs

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use super::snapshot::DatasetSnapshot;
use crate::history::{read_tree, ChangeRecord};

/// What `commit` did to the change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The data differs from the previous record; a new record was written.
    Changed(ChangeRecord),
    /// Same hash as before; the record on disk was left untouched.
    Unchanged(ChangeRecord),
}

impl CommitOutcome {
    pub fn record(&self) -> &ChangeRecord {
        match self {
            CommitOutcome::Changed(r) | CommitOutcome::Unchanged(r) => r,
        }
    }

    pub fn changed(&self) -> bool {
        matches!(self, CommitOutcome::Changed(_))
    }
}

/// Persist `snapshot` under `data_dir` and update the change record.
///
/// Tables are written first and stale `*.csv` files removed; the record at
/// `record_path` is rewritten only if the snapshot hash differs from
/// `previous`, so its timestamp is the time of the last real change. Any
/// failure returns before the record is touched.
pub fn commit(
    snapshot: &DatasetSnapshot,
    previous: Option<&ChangeRecord>,
    data_dir: &Path,
    record_path: &Path,
) -> Result<CommitOutcome> {
    fs::create_dir_all(data_dir).with_context(|| format!("creating {:?}", data_dir))?;

    let mut written = 0usize;
    for (rel, bytes) in snapshot.files() {
        if write_if_changed(&data_dir.join(rel), bytes)? {
            written += 1;
        }
    }
    let pruned = prune_stale(snapshot, data_dir)?;
    info!(
        tables = snapshot.len(),
        written,
        pruned,
        "data directory up to date"
    );

    match previous {
        Some(prev) if prev.hash == snapshot.hash() => {
            debug!(hash = %prev.hash, "hash unchanged");
            Ok(CommitOutcome::Unchanged(prev.clone()))
        }
        _ => {
            let record = ChangeRecord::new(snapshot.hash(), snapshot.taken_at());
            record.store(record_path)?;
            info!(
                old = previous.map(|p| p.hash.as_str()).unwrap_or("none"),
                new = %record.hash,
                "data changed"
            );
            Ok(CommitOutcome::Changed(record))
        }
    }
}

/// Write `bytes` to `path` via a tmp file + rename, skipping identical files.
/// Returns whether anything was written.
fn write_if_changed(path: &Path, bytes: &[u8]) -> Result<bool> {
    if fs::read(path).map(|old| old == bytes).unwrap_or(false) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let file_name = path
        .file_name()
        .with_context(|| format!("{:?} has no file name", path))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp, bytes).with_context(|| format!("writing {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote table");
    Ok(true)
}

/// Remove `*.csv` files the snapshot no longer contains, and any directories
/// left empty by that.
fn prune_stale(snapshot: &DatasetSnapshot, data_dir: &Path) -> Result<usize> {
    let stale: Vec<PathBuf> = read_tree(data_dir)?
        .into_keys()
        .filter(|rel| !snapshot.contains(rel))
        .collect();

    for rel in &stale {
        let path = data_dir.join(rel);
        fs::remove_file(&path).with_context(|| format!("removing stale {:?}", path))?;
        info!(path = %rel.display(), "removed stale table");

        let mut dir = path.parent();
        while let Some(d) = dir.filter(|d| *d != data_dir && d.starts_with(data_dir)) {
            if fs::remove_dir(d).is_err() {
                break;
            }
            dir = d.parent();
        }
    }
    Ok(stale.len())
}
