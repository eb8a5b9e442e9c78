//! `panorama`: keeps the Worker and Client 360 views in step with their
//! upstream collections.
//!
//! # Usage
//!
//! ```
//! panorama serve
//! panorama --config /etc/panorama.toml rebuild --namespace view-service --subject worker --inline
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use panorama_core::source::SubjectKind;
use panorama_engine::{Engine, rebuild::RebuildMode};
use panorama_server::{AppState, Settings};
use panorama_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "panorama", author, version, about = "Panorama 360 view materializer")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "panorama.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the change and rebuild endpoints over HTTP.
  Serve,
  /// Rewrite every entity document of one subject kind.
  Rebuild {
    /// Logical database to rebuild.
    #[arg(long)]
    namespace: String,

    /// `worker` or `client`.
    #[arg(long)]
    subject: SubjectKind,

    /// Recompute aggregates directly instead of relying on the change feed.
    #[arg(long)]
    inline: bool,
  },
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

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load settings from {:?}", cli.config))?;

  let store_path = settings.resolved_store_path();
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let engine = Arc::new(Engine::new(
    Arc::new(store),
    settings.collections.clone(),
    settings.rebuild.clone(),
  ));

  match cli.command {
    Command::Serve => {
      let app = panorama_server::router(AppState { engine });
      let address = format!("{}:{}", settings.host, settings.port);

      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }
    Command::Rebuild { namespace, subject, inline } => {
      let mode = if inline { RebuildMode::Inline } else { RebuildMode::Touch };
      let report = engine
        .rebuild(&namespace, subject, mode)
        .await
        .with_context(|| format!("rebuild of {subject} in {namespace} failed"))?;
      println!("{}", serde_json::to_string(&report)?);
    }
  }

  Ok(())
}
