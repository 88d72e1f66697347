use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use geocat::{http, Config, MemoryStore, SearchRequest, SearchService};
use geocat_store::{load_catalog, load_collections};

#[derive(Parser)]
#[command(name = "geocat", about = "Catalog search with keyset pagination")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/geocat/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    debug: bool,

    /// Collection records: a JSON array or {"collections": [...]}.
    #[arg(long, global = true)]
    collections: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the search API over HTTP.
    Serve {
        /// FeatureCollection (.json) or one item per line (.ndjson).
        catalog: PathBuf,
        /// Listen address, overriding [server] bind.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one POST-style search request and print the response.
    Search {
        catalog: PathBuf,
        /// JSON request body; read from stdin when omitted.
        request: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if cli.debug { "debug" } else { "info" })
            }),
        )
        .init();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Serve { catalog, bind } => {
            let service = build_service(&config, &catalog, cli.collections.as_deref()).await?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            tracing::info!(addr = %listener.local_addr()?, "serving search API");
            axum::serve(listener, http::router(service))
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Command::Search { catalog, request } => {
            let service = build_service(&config, &catalog, cli.collections.as_deref()).await?;
            let body = match request {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut body = String::new();
                    tokio::io::stdin().read_to_string(&mut body).await?;
                    body
                }
            };
            let request: SearchRequest = serde_json::from_str(&body).context("parsing search request")?;
            let response = service.search(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}

async fn build_service(
    config: &Config,
    catalog: &Path,
    collections: Option<&Path>,
) -> anyhow::Result<Arc<SearchService<MemoryStore>>> {
    let registry = config.registry()?;
    let settings = config.settings()?;
    let items = load_catalog(catalog).await?;
    tracing::info!(items = items.len(), catalog = %catalog.display(), "catalog loaded");

    let mut store = MemoryStore::from_items(items);
    if let Some(path) = collections {
        let declared = load_collections(path).await?;
        tracing::info!(collections = declared.len(), path = %path.display(), "collections loaded");
        store = store.with_collections(declared);
    }

    Ok(Arc::new(SearchService::new(
        store,
        Arc::new(registry),
        Arc::new(settings),
    )))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
    }
}
