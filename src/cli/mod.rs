//! Command-line interface.

mod cache;
mod query;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use inspirecache::cache::start_periodic_stats_log;
use inspirecache::inspire::{Direction, InspireClient, SortOrder, TextFormat};
use inspirecache::Config;

#[derive(Debug, Parser)]
#[command(
    name = "inspirecache",
    version,
    about = "Cached, rate-limited access to the InspireHEP literature API"
)]
pub(crate) struct Cli {
    /// Config file (default: ~/.inspirecache/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Search the literature index
    Search {
        query: String,
        /// bestmatch, mostrecent or mostcited
        #[arg(long, default_value = "bestmatch")]
        sort: SortOrder,
        #[arg(long, default_value_t = 10)]
        size: u32,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Comma-separated record fields (default: a compact summary set)
        #[arg(long)]
        fields: Option<String>,
    },
    /// Fetch one paper by InspireHEP id, arXiv id or DOI
    Paper {
        /// Numeric InspireHEP record id
        id: Option<String>,
        #[arg(long, conflicts_with_all = ["id", "doi"])]
        arxiv: Option<String>,
        #[arg(long, conflicts_with = "id")]
        doi: Option<String>,
        /// Comma-separated record fields (default: the full record)
        #[arg(long)]
        fields: Option<String>,
    },
    /// List papers citing a record, or cited by it
    Citations {
        id: String,
        /// citing or cited_by
        #[arg(long, default_value = "citing")]
        direction: Direction,
        #[arg(long, default_value_t = 50)]
        size: u32,
    },
    /// Search the authors index
    Authors {
        query: String,
        #[arg(long, default_value_t = 10)]
        size: u32,
    },
    /// Export citations for one or more records
    Bibtex {
        #[arg(required = true)]
        ids: Vec<String>,
        /// bibtex, latex-eu or latex-us
        #[arg(long, default_value = "bibtex")]
        format: TextFormat,
    },
    /// Show cache and rate limiter statistics
    Stats {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every cached response
    Clear,
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    let client = InspireClient::from_config(&config).context("Failed to initialize cache")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let stats_task =
        start_periodic_stats_log(client.coordinator().stats_registry(), None, shutdown_rx);

    let result = match cli.command {
        Command::Search {
            query,
            sort,
            size,
            page,
            fields,
        } => query::cmd_search(&client, &query, sort, size, page, fields.as_deref()).await,
        Command::Paper {
            id,
            arxiv,
            doi,
            fields,
        } => query::cmd_paper(&client, id, arxiv, doi, fields.as_deref()).await,
        Command::Citations {
            id,
            direction,
            size,
        } => query::cmd_citations(&client, &id, direction, size).await,
        Command::Authors { query, size } => query::cmd_authors(&client, &query, size).await,
        Command::Bibtex { ids, format } => query::cmd_bibtex(&client, &ids, format).await,
        Command::Stats { json } => cache::cmd_stats(&client, json).await,
        Command::Clear => cache::cmd_clear(&client).await,
    };

    let _ = shutdown_tx.send(true);
    let _ = stats_task.await;
    result
}
