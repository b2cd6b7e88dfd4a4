use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// GET `url` and return its body as text. Any non-success status is an error.
pub async fn fetch_text(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching");
    let body = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("non-success status from {}", url))?
        .text()
        .await
        .with_context(|| format!("reading body from {}", url))?;
    debug!(%url, bytes = body.len(), "fetched");
    Ok(body)
}
