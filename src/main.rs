use anyhow::{bail, Result};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use wormwiring_pin::{history::hash_dir, output::CommitOutcome, pipeline, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configure ────────────────────────────────────────────────
    let cfg = Config::from_env()?;
    info!(
        root = %cfg.root_url,
        data = %cfg.data_dir.display(),
        record = %cfg.record_path.display(),
        "configured"
    );

    // ─── 3) scrape, normalize, pin ───────────────────────────────────
    let summary = match pipeline::run(&cfg).await {
        Ok(s) => s,
        Err(e) => {
            error!("run failed: {:#}", e);
            return Err(e);
        }
    };

    // ─── 4) report ───────────────────────────────────────────────────
    let on_disk = hash_dir(&cfg.data_dir)?;
    if on_disk != summary.outcome.record().hash {
        bail!(
            "data directory hash {} does not match recorded {}",
            on_disk,
            summary.outcome.record().hash
        );
    }
    match &summary.outcome {
        CommitOutcome::Changed(r) => {
            info!(tables = summary.tables, rows = summary.rows, hash = %r.hash, "data changed")
        }
        CommitOutcome::Unchanged(r) => {
            info!(tables = summary.tables, hash = %r.hash, since = %r.changed_at, "nothing changed")
        }
    }
    Ok(())
}
