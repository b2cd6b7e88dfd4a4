// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub mod download;
pub mod series;

pub use download::fetch_text;
pub use series::{parse_series_page, EnumerateError, SourceEntry};

/// Path of the series index, relative to the site root.
const SERIES_INDEX: &str = "series/";

/// HTTP client shared by every request of a run.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .cookie_store(true)
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")
}

/// Scrape the series index under `root` and list every table to pin.
#[instrument(level = "info", skip(client, root), fields(root = %root))]
pub async fn list_sources(client: &Client, root: &Url) -> Result<Vec<SourceEntry>> {
    let index = root
        .join(SERIES_INDEX)
        .with_context(|| format!("joining {} onto {}", SERIES_INDEX, root))?;
    let html = fetch_text(client, &index).await?;
    let entries = parse_series_page(&html, root)
        .with_context(|| format!("parsing series index {}", index))?;
    info!(count = entries.len(), "enumerated tables");
    Ok(entries)
}
