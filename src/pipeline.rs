// src/pipeline.rs

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::PathBuf;
use tokio::time::Instant;
use tracing::{info, instrument};

use crate::config::Config;
use crate::fetch::{build_client, fetch_text, list_sources, SourceEntry};
use crate::history::ChangeRecord;
use crate::output::{commit, CommitOutcome, DatasetSnapshot};
use crate::process::{normalize, Table};
use crate::schema::Catalog;

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub tables: usize,
    pub rows: usize,
    pub outcome: CommitOutcome,
}

/// Scrape, normalize and pin everything the series index lists.
///
/// Fetches run one at a time; nothing on disk is touched until every table
/// has been fetched and normalized.
#[instrument(level = "info", skip_all, fields(root = %cfg.root_url))]
pub async fn run(cfg: &Config) -> Result<RunSummary> {
    let client = build_client(cfg.timeout)?;
    run_with_client(cfg, &client).await
}

/// `run` over a caller-supplied HTTP client.
pub async fn run_with_client(cfg: &Config, client: &Client) -> Result<RunSummary> {
    let catalog = Catalog::load(cfg.header_aliases.as_deref())?;
    let previous = ChangeRecord::load(&cfg.record_path)?;

    let entries = list_sources(client, &cfg.root_url).await?;
    let mut fetched = Vec::with_capacity(entries.len());
    for entry in entries {
        let start = Instant::now();
        let body = fetch_text(client, &entry.url)
            .await
            .with_context(|| format!("fetching `{}`", entry.title))?;
        info!(table = %entry.relative_path.display(), elapsed = ?start.elapsed(), "downloaded");
        fetched.push((entry, body));
    }

    pin(fetched, &catalog, previous.as_ref(), cfg, Utc::now())
}

/// Normalize already-fetched tables and commit them as one snapshot.
pub fn pin(
    fetched: Vec<(SourceEntry, String)>,
    catalog: &Catalog,
    previous: Option<&ChangeRecord>,
    cfg: &Config,
    taken_at: DateTime<Utc>,
) -> Result<RunSummary> {
    if fetched.is_empty() {
        bail!("series index listed no tables; refusing to empty {:?}", cfg.data_dir);
    }

    let mut tables = Vec::with_capacity(fetched.len());
    let mut rows = 0usize;
    for (entry, body) in &fetched {
        let (rel, table) = normalize_entry(entry, body, catalog)?;
        info!(
            table = %rel.display(),
            kind = %entry.kind,
            rows = table.len(),
            "normalized"
        );
        rows += table.len();
        tables.push((rel, table));
    }

    let snapshot = DatasetSnapshot::from_tables(tables, taken_at)?;
    let outcome = commit(&snapshot, previous, &cfg.data_dir, &cfg.record_path)?;
    Ok(RunSummary {
        tables: snapshot.len(),
        rows,
        outcome,
    })
}

/// Normalize one fetched body with the rules for its series kind.
pub fn normalize_entry(
    entry: &SourceEntry,
    body: &str,
    catalog: &Catalog,
) -> Result<(PathBuf, Table)> {
    let schema = catalog
        .schema(entry.kind)
        .with_context(|| format!("no schema for `{}`", entry.kind))?;
    let table = normalize(&entry.title, body, entry.delimiter, schema)
        .with_context(|| format!("normalizing {}", entry.url))?;
    Ok((entry.relative_path.clone(), table))
}
