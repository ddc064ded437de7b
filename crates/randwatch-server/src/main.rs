//! randwatch server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), builds the
//! FRED client, the remote snapshot store, the git-synced user registry and
//! the repo sync agent, then serves the JSON API over HTTP.

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use randwatch_fred::FredClient;
use randwatch_gitsync::{FileRegistry, GitCli, SyncAgent, SyncConfig, SyncCoordinator};
use randwatch_server::{AppState, ServerConfig, runs::RunTracker};
use randwatch_store_rest::{RestConfig, RestStore};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// File name of the cross-process pull lock inside the synced repo.
const PULL_LOCK_FILE: &str = ".randwatch-pull.lock";

#[derive(Parser)]
#[command(author, version, about = "randwatch dashboard backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("RANDWATCH"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Outbound clients.
  let source = FredClient::new(server_cfg.fred_api_key.clone())
    .context("failed to build FRED client")?;
  let snapshots = RestStore::new(RestConfig {
    base_url:    server_cfg.store_url.clone(),
    api_key:     server_cfg.store_api_key.clone(),
    data_table:  server_cfg.data_table.clone(),
    users_table: server_cfg.users_table.clone(),
  })
  .context("failed to build snapshot store client")?;

  // The registry lives inside the synced working copy and shares the
  // coordinator with the agent, so its reads and writes wait out any
  // in-flight sync cycle.
  let coordinator = Arc::new(SyncCoordinator::new(
    server_cfg.repo_path.join(PULL_LOCK_FILE),
  ));
  let users = FileRegistry::new(
    server_cfg.repo_path.join(&server_cfg.registry_file),
    Arc::clone(&coordinator),
  );

  // Repo sync agent: periodic pulls plus a push after each registration.
  let agent = Arc::new(SyncAgent::new(
    GitCli::new(&server_cfg.repo_path),
    coordinator,
    SyncConfig {
      token:           server_cfg.git_token.clone(),
      fallback_remote: server_cfg.git_remote.clone(),
      branch_override: server_cfg.git_branch.clone(),
      ..SyncConfig::default()
    },
  ));
  tokio::spawn(Arc::clone(&agent).run_periodic());

  let (sync_tx, mut sync_rx) = mpsc::unbounded_channel::<String>();
  tokio::spawn(async move {
    while let Some(username) = sync_rx.recv().await {
      agent
        .push_cycle(&format!("randwatch: register user {username}"))
        .await;
    }
  });

  let state = AppState {
    source:    Arc::new(source),
    snapshots: Arc::new(snapshots),
    users:     Arc::new(users),
    runs:      Arc::new(RunTracker::new()),
    sync_tx:   Some(sync_tx),
  };

  let app = randwatch_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
