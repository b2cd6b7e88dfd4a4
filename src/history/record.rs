// src/history/record.rs

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use std::{fs, io, path::Path};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("change record is empty")]
    Empty,
    #[error("`{0}` is not a 32-character hex digest")]
    BadHash(String),
    #[error("change record has no timestamp")]
    MissingTimestamp,
    #[error("`{0}` is not an ISO-8601 timestamp")]
    BadTimestamp(String),
}

/// Hash of the data directory and the moment it last changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub hash: String,
    pub changed_at: DateTime<Utc>,
}

impl ChangeRecord {
    /// `changed_at` is kept at whole seconds, the precision `render` writes.
    pub fn new(hash: impl Into<String>, changed_at: DateTime<Utc>) -> Self {
        Self {
            hash: hash.into(),
            changed_at: changed_at.trunc_subsecs(0),
        }
    }

    /// Parse the two-line `<hash>\n<timestamp>` format. Timestamps without an
    /// offset are read as UTC.
    pub fn parse(text: &str) -> Result<Self, RecordError> {
        let mut parts = text.split_whitespace();
        let hash = parts.next().ok_or(RecordError::Empty)?;
        if hash.len() != 32 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RecordError::BadHash(hash.to_string()));
        }
        let stamp = parts.next().ok_or(RecordError::MissingTimestamp)?;
        let changed_at = DateTime::parse_from_rfc3339(stamp)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
            })
            .map_err(|_| RecordError::BadTimestamp(stamp.to_string()))?;
        Ok(Self::new(hash.to_ascii_lowercase(), changed_at))
    }

    pub fn render(&self) -> String {
        format!(
            "{}\n{}\n",
            self.hash,
            self.changed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    /// Load the record at `path`. A missing file is `None`; so is a file we
    /// cannot make sense of, which the next change simply overwrites.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {:?}", path)),
        };
        match Self::parse(&text) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed change record");
                Ok(None)
            }
        }
    }

    /// Write atomically: to a tmp file next to `path`, then rename over it.
    pub fn store(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let file_name = path
            .file_name()
            .with_context(|| format!("{:?} has no file name", path))?;
        let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
        fs::write(&tmp, self.render()).with_context(|| format!("writing {:?}", tmp))?;
        fs::rename(&tmp, path).with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;
        Ok(())
    }
}
