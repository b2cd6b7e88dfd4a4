// src/history/hash.rs

use anyhow::{Context, Result};
use glob::{glob, Pattern};
use md5::{Digest, Md5};
use std::{
    collections::BTreeMap,
    fs,
    path::{Component, Path, PathBuf},
};

/// MD5 over every file in path order: each path component, then the bytes.
///
/// Keys are paths relative to the data directory, so the digest does not
/// depend on where the directory lives or on filesystem iteration order.
pub fn content_hash(files: &BTreeMap<PathBuf, Vec<u8>>) -> String {
    let mut md5 = Md5::new();
    for (path, bytes) in files {
        for component in path.components() {
            if let Component::Normal(part) = component {
                md5.update(part.to_string_lossy().as_bytes());
            }
        }
        md5.update(bytes);
    }
    format!("{:x}", md5.finalize())
}

/// Every `*.csv` file under `root`, keyed by its path relative to `root`.
pub fn read_tree(root: &Path) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
    let mut files = BTreeMap::new();
    if !root.exists() {
        return Ok(files);
    }
    let pattern = format!("{}/**/*.csv", Pattern::escape(&root.to_string_lossy()));
    for entry in glob(&pattern).with_context(|| format!("bad glob {}", pattern))? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        let rel = path
            .strip_prefix(root)
            .with_context(|| format!("{:?} is outside {:?}", path, root))?
            .to_path_buf();
        let bytes = fs::read(&path).with_context(|| format!("reading {:?}", path))?;
        files.insert(rel, bytes);
    }
    Ok(files)
}

/// `content_hash` of the tables currently on disk under `root`.
pub fn hash_dir(root: &Path) -> Result<String> {
    Ok(content_hash(&read_tree(root)?))
}
