//! street-manager-relay binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) and
//! `RELAY_*` environment variables, opens the SQLite store and runs one of
//! the subcommands: the HTTP server or one of the maintenance jobs.

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use relay_api::{AppState, PromoterDirectory, ServerConfig, bulk};
use relay_core::store::EventStore as _;
use relay_sns::{CertCache, Verifier};
use relay_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

const METRICS_UPKEEP: Duration = Duration::from_secs(5);
const DRY_RUN_SAMPLE: usize = 10;

#[derive(Parser)]
#[command(author, version, about = "Street-works notification relay")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  /// SQLite database file. Overrides `db_path` from the configuration.
  #[arg(long, global = true)]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API.
  ApiServer {
    #[arg(long)]
    port:  Option<u16>,
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long)]
    debug: bool,
  },
  /// Import a folder of exported event files in a single transaction.
  BulkLoader {
    #[arg(long)]
    max_files: Option<usize>,
    folder:    PathBuf,
  },
  /// Recompute every spatial index row from event geometry.
  Regen,
  /// Purge events that finished more than `--days` ago.
  DeleteCompleted {
    #[arg(long)]
    days:    u32,
    #[arg(long)]
    dry_run: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let default_level = match cli.command {
    Command::ApiServer { debug: true, .. } => LevelFilter::DEBUG,
    _ => LevelFilter::INFO,
  };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy(),
    )
    .init();

  let mut server_cfg =
    ServerConfig::load(&cli.config).context("failed to load configuration")?;
  if let Some(db) = cli.db {
    server_cfg.db_path = db;
  }

  let store = SqliteStore::open(&server_cfg.db_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.db_path))?;

  match cli.command {
    Command::ApiServer { port, .. } => {
      if let Some(port) = port {
        server_cfg.port = port;
      }
      api_server(store, server_cfg).await
    }
    Command::BulkLoader { max_files, folder } => {
      let count = bulk::load_folder(&store, &folder, max_files)
        .await
        .with_context(|| format!("failed to import {}", folder.display()))?;
      info!(count, "bulk load complete");
      Ok(())
    }
    Command::Regen => {
      let report = store.regenerate_index().await.context("failed to regenerate index")?;
      info!(
        "regenerated index: {}/{} ({:.1}%) rows updated",
        report.affected,
        report.total,
        report.percent()
      );
      Ok(())
    }
    Command::DeleteCompleted { days, dry_run } => {
      let ids = store
        .delete_completed(days, dry_run)
        .await
        .context("failed to delete completed events")?;
      if dry_run {
        let sample = &ids[..ids.len().min(DRY_RUN_SAMPLE)];
        info!(count = ids.len(), first = ?sample, "dry run: events that would be deleted");
      } else {
        info!(count = ids.len(), "deleted completed events");
      }
      Ok(())
    }
  }
}

async fn api_server(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  let metrics = PrometheusBuilder::new()
    .install_recorder()
    .context("failed to install metrics recorder")?;
  let upkeep = metrics.clone();
  tokio::spawn(async move {
    let mut tick = tokio::time::interval(METRICS_UPKEEP);
    loop {
      tick.tick().await;
      upkeep.run_upkeep();
    }
  });

  let http = reqwest::Client::builder()
    .timeout(server_cfg.http_timeout())
    .build()
    .context("failed to build HTTP client")?;
  let certs = CertCache::new(http.clone(), server_cfg.cert_ttl(), server_cfg.cert_idle());
  let promoters = PromoterDirectory::load(server_cfg.promoters_csv.as_deref())
    .context("failed to load promoter directory")?;

  let state = AppState::new(store, Verifier::new(certs), http, promoters, &server_cfg, metrics);
  let app = relay_api::router(state);
  let address = server_cfg.address();

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
