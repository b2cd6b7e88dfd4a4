// src/config.rs

use anyhow::{Context, Result};
use std::{env, path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_ROOT_URL: &str = "http://wormwiring.org/";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_RECORD_PATH: &str = "last_changed.txt";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where to scrape from and where to pin the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root_url: Url,
    pub data_dir: PathBuf,
    pub record_path: PathBuf,
    pub timeout: Duration,
    /// Optional JSON file of extra header spellings per series kind.
    pub header_aliases: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_url: Url::parse(DEFAULT_ROOT_URL).expect("default root URL should parse"),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            record_path: PathBuf::from(DEFAULT_RECORD_PATH),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            header_aliases: None,
        }
    }
}

impl Config {
    /// Read `WORMWIRING_*` variables from the environment (and `.env`, if
    /// present), falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(raw) = get("WORMWIRING_ROOT_URL") {
            // a trailing slash keeps `join` from replacing the last segment
            let raw = if raw.ends_with('/') { raw } else { format!("{}/", raw) };
            cfg.root_url =
                Url::parse(&raw).with_context(|| format!("WORMWIRING_ROOT_URL={}", raw))?;
        }
        if let Some(dir) = get("WORMWIRING_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("WORMWIRING_RECORD_PATH") {
            cfg.record_path = PathBuf::from(path);
        }
        if let Some(secs) = get("WORMWIRING_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("WORMWIRING_TIMEOUT_SECS={}", secs))?;
            cfg.timeout = Duration::from_secs(secs);
        }
        cfg.header_aliases = get("WORMWIRING_HEADER_ALIASES").map(PathBuf::from);

        Ok(cfg)
    }
}
