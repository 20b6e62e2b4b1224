// src/main.rs

use hnet_index::*;
use hnet_index::{engine, storage};
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: hnet-index [--config <path>] <command>

Commands:
  scan <root> [--rebuild] [--offline]   index every marked document under <root>
  search <query...> [--json]            substring search over the index
  clear                                 remove every indexed record";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let config_path = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("--config needs a path\n\n{}", USAGE);
            }
            let path = PathBuf::from(args.remove(i + 1));
            args.remove(i);
            Some(path)
        }
        None => None,
    };

    let Some(command) = args.first().cloned() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    let mut config = IndexConfig::load(config_path.as_deref()).context("loading config")?;
    if rest.iter().any(|a| a == "--rebuild") {
        config.policy = ScanPolicy::Rebuild;
    }
    if rest.iter().any(|a| a == "--offline") {
        config.fetch_icons = false;
    }

    // ========== INITIALIZE STATE & STORE ==========
    let db_path = config.db_path.to_string_lossy().to_string();
    let state = GlobalState::new(config.clone()).into_shared();
    init_connection(&state, &db_path).context("opening index")?;
    tracing::debug!("✓ Index opened: {}", db_path);

    match command.as_str() {
        "scan" => {
            let root = rest.iter().find(|a| !a.starts_with("--"))
                .map(PathBuf::from)
                .with_context(|| format!("scan needs a root directory\n\n{}", USAGE))?;
            run_scan(state, &config, root).await
        }
        "search" => {
            let json = rest.iter().any(|a| a == "--json");
            let query = rest.iter()
                .filter(|a| a.as_str() != "--json")
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            run_search(state, &query, json).await
        }
        "clear" => {
            let removed = storage::clear(&state).await?;
            println!("Removed {} records", removed);
            Ok(())
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

async fn run_scan(state: SharedState, config: &IndexConfig, root: PathBuf) -> Result<()> {
    let indexer = Indexer::new(state.clone(), engine::icon_fetcher(config)?)?;

    let mut progress = state.read()
        .map_err(|_| anyhow::anyhow!("Poisoned lock"))?
        .subscribe_progress();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let current = progress.borrow_and_update().clone();
            match current {
                ScanProgress::Walking { directory, fraction } => {
                    tracing::debug!("[Scan] {:>3.0}% {}", fraction * 100.0, directory.display());
                }
                ScanProgress::Persisting { records } => {
                    tracing::info!("[Scan] Persisting {} records...", records);
                }
                ScanProgress::Complete { .. } | ScanProgress::Failed { .. } => break,
                ScanProgress::Idle => {}
            }
        }
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, abandoning scan");
            on_interrupt.cancel();
        }
    });

    let result = indexer.reindex(&root, &cancel).await;
    reporter.abort();

    let count = result.with_context(|| format!("scan of {} did not complete", root.display()))?;
    println!("Indexed {} records from {}", count, root.display());
    Ok(())
}

async fn run_search(state: SharedState, query: &str, json: bool) -> Result<()> {
    let results = Searcher::search(&state, query).await.context("search failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results");
        return Ok(());
    }
    for record in &results {
        println!("{}\n  {}\n  {}\n  {}\n", record.title, record.canonical_url, record.http_url, record.description);
    }
    Ok(())
}
