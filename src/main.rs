use anyhow::{Context, Result};
use clap::Parser;
use eiagen::{
    config::{Cli, Config, PipelineKind},
    fetch::EiaClient,
    output::{write_atomic, write_pivot_parquet},
    pipeline::{self, Artifact},
    process::PivotTable,
    schema::IndexKey,
};
use std::fs;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    let config = load_config().context("invalid configuration")?;
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("creating output directory {:?}", config.out_dir))?;
    info!(
        out_dir = %config.out_dir.display(),
        pipelines = ?config.pipelines,
        "startup"
    );

    let client = EiaClient::new(config.base_url.clone(), config.api_key.clone())
        .context("building HTTP client")?;

    // ─── 3) run pipelines in order; one failure does not stop the rest ─
    let mut failed = Vec::new();
    for kind in &config.pipelines {
        let result = match kind {
            PipelineKind::General => pipeline::general_netgen(&client, &config)
                .map_err(anyhow::Error::from)
                .and_then(|a| persist(&a, &a.table, &config)),
            PipelineKind::Sector => pipeline::netgen_by_sector(&client, &config)
                .map_err(anyhow::Error::from)
                .and_then(|a| persist(&a, &a.table, &config)),
            PipelineKind::State => pipeline::netgen_by_state(&client, &config)
                .map_err(anyhow::Error::from)
                .and_then(|a| persist(&a, a.table.table(), &config)),
        };
        if let Err(err) = result {
            error!(pipeline = kind.as_str(), "pipeline failed: {:#}", err);
            failed.push(kind.as_str());
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("{} pipeline(s) failed: {}", failed.len(), failed.join(", "));
    }
    info!("done");
    Ok(())
}

fn load_config() -> eiagen::Result<Config> {
    Ok(Config::try_from(Cli::parse())?)
}

/// Write the document, and the pivot as Parquet when asked to.
fn persist<T, K: IndexKey>(
    artifact: &Artifact<T>,
    pivot: &PivotTable<K>,
    config: &Config,
) -> Result<()> {
    let path = config.out_dir.join(artifact.file_name());
    write_atomic(&path, artifact.document.as_bytes())
        .with_context(|| format!("writing {}", artifact.file_name()))?;
    info!(path = %path.display(), "chart written");

    if config.parquet {
        let path = config.out_dir.join(format!("{}.parquet", artifact.name));
        write_pivot_parquet(pivot, &path)
            .with_context(|| format!("exporting {}", artifact.name))?;
        info!(path = %path.display(), "pivot exported");
    }
    Ok(())
}
