use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};

use crate::history::content_hash;
use crate::process::Table;

/// Every serialized table of one run, keyed by path relative to the data
/// directory, plus the digest over all of them.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    files: BTreeMap<PathBuf, Vec<u8>>,
    hash: String,
    taken_at: DateTime<Utc>,
}

impl DatasetSnapshot {
    pub fn from_tables<I>(tables: I, taken_at: DateTime<Utc>) -> Result<Self>
    where
        I: IntoIterator<Item = (PathBuf, Table)>,
    {
        let mut files = BTreeMap::new();
        for (rel, table) in tables {
            if !is_plain_relative(&rel) {
                bail!("table path {:?} must be relative and stay inside the data directory", rel);
            }
            let bytes = table
                .to_csv()
                .with_context(|| format!("serializing `{}`", table.name))?;
            if files.insert(rel.clone(), bytes).is_some() {
                bail!("two tables map to {:?}", rel);
            }
        }
        Ok(Self::from_files(files, taken_at))
    }

    pub fn from_files(files: BTreeMap<PathBuf, Vec<u8>>, taken_at: DateTime<Utc>) -> Self {
        let hash = content_hash(&files);
        Self {
            files,
            hash,
            taken_at,
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, rel: &Path) -> bool {
        self.files.contains_key(rel)
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &[u8])> {
        self.files.iter().map(|(p, b)| (p.as_path(), b.as_slice()))
    }
}

/// Only plain names: no root, prefix, `.` or `..` components.
fn is_plain_relative(rel: &Path) -> bool {
    rel.components().next().is_some()
        && rel.components().all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, value: &str) -> Table {
        let mut t = Table::new(name, vec!["neuron".into()]);
        t.rows.push(vec![value.into()]);
        t
    }

    #[test]
    fn test_hash_covers_serialized_tables() {
        let now = Utc::now();
        let a = DatasetSnapshot::from_tables(
            vec![(PathBuf::from("N2U/cells.csv"), table("cells", "ADAL"))],
            now,
        )
        .unwrap();
        let b = DatasetSnapshot::from_tables(
            vec![(PathBuf::from("N2U/cells.csv"), table("cells", "ADAR"))],
            now,
        )
        .unwrap();
        assert_eq!(a.len(), 1);
        assert_ne!(a.hash(), b.hash());

        let (_, bytes) = a.files().next().unwrap();
        assert_eq!(bytes, b"neuron\nADAL\n");
    }

    #[test]
    fn test_rejects_colliding_and_absolute_paths() {
        let now = Utc::now();
        let collide = vec![
            (PathBuf::from("a.csv"), table("a", "x")),
            (PathBuf::from("a.csv"), table("b", "y")),
        ];
        assert!(DatasetSnapshot::from_tables(collide, now).is_err());

        let absolute = vec![(PathBuf::from("/etc/a.csv"), table("a", "x"))];
        assert!(DatasetSnapshot::from_tables(absolute, now).is_err());
    }

    #[test]
    fn test_rejects_paths_escaping_data_dir() {
        let now = Utc::now();
        for bad in ["../../Edge List.csv", "N2U/../../x.csv", "./a.csv", ""] {
            let tables = vec![(PathBuf::from(bad), table("a", "x"))];
            assert!(
                DatasetSnapshot::from_tables(tables, now).is_err(),
                "{} accepted",
                bad
            );
        }
        let ok = vec![(PathBuf::from("_../_../Edge List.csv"), table("a", "x"))];
        assert!(DatasetSnapshot::from_tables(ok, now).is_ok());
    }
}
