//! linkshelf server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `LINKSHELF_*` environment variables, opens the SQLite store and media
//! directory, and serves the site and API over HTTP.
//!
//! # Seeding templates
//!
//! ```sh
//! cargo run -p linkshelf-server -- --seed-templates templates.json
//! ```
//!
//! The file holds a JSON array of templates; each is upserted by id before
//! the server starts listening.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use linkshelf_api::LogNotifier;
use linkshelf_core::{store::ProfileStore, template::Template};
use linkshelf_server::{AppState, ServerConfig};
use linkshelf_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "linkshelf profile server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Upsert the templates in this JSON file before serving.
  #[arg(long, value_name = "FILE")]
  seed_templates: Option<PathBuf>,
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
    .add_source(config::Environment::with_prefix("LINKSHELF"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.media_dir = expand_tilde(&server_cfg.media_dir);

  if let Some(parent) = server_cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  // Open SQLite store.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  if let Some(path) = &cli.seed_templates {
    seed_templates(&store, path).await?;
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  // Build application state.
  let state = AppState::new(server_cfg, store, Arc::new(LogNotifier))
    .await
    .context("failed to initialise media services")?;

  let app = linkshelf_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Upsert every template in the JSON array at `path`.
async fn seed_templates(store: &SqliteStore, path: &Path) -> anyhow::Result<()> {
  let raw = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read {}", path.display()))?;
  let templates: Vec<Template> = serde_json::from_str(&raw)
    .with_context(|| format!("failed to parse templates in {}", path.display()))?;

  let count = templates.len();
  for template in templates {
    let id = template.id.clone();
    store
      .put_template(template)
      .await
      .with_context(|| format!("failed to store template {id}"))?;
  }

  tracing::info!(count, path = %path.display(), "seeded templates");
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
