//! # biblib server
//!
//! Serves permissioned libraries of bibliographic identifiers. Each library
//! read reconciles stored identifiers against the search index and pages
//! the result for the caller.
//!
//! Storage is PostgreSQL unless `--in-memory` is given.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use biblib_config::{Config, ConfigLoad, ConfigLoader};
use biblib_core::{
    application::LibraryServices,
    database::{InMemoryLibraryStore, LibraryStore, PostgresLibraryStore},
    providers::{AdswsIdentityClient, BigQueryIndexClient},
};
use biblib_server::{AppState, create_app};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "biblib-server")]
#[command(about = "Permissioned libraries of bibliographic identifiers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to a TOML configuration file (falls back to BIBLIB_CONFIG_PATH)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Keep libraries in process memory instead of PostgreSQL
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_runtime_config(&cli.serve)?;

    if let Some(command) = cli.command {
        match command {
            Command::Db(DbCommand::Migrate) => {
                run_db_migrate(&config).await?;
                return Ok(());
            }
        }
    }

    run_server(config, cli.serve.in_memory).await
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Arc<Config>> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = args.config.clone() {
        loader = loader.with_config_path(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "configuration file loaded");
    }
    warnings.log();

    Ok(Arc::new(config))
}

async fn connect_postgres(config: &Config) -> anyhow::Result<PostgresLibraryStore> {
    let url = config
        .database
        .url
        .as_deref()
        .context("DATABASE_URL is not set; pass --in-memory to run without PostgreSQL")?;
    PostgresLibraryStore::connect(url)
        .await
        .context("failed to connect to PostgreSQL")
}

async fn run_db_migrate(config: &Config) -> anyhow::Result<()> {
    let store = connect_postgres(config).await?;
    store.migrate().await.context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

async fn run_server(config: Arc<Config>, in_memory: bool) -> anyhow::Result<()> {
    let store: Arc<dyn LibraryStore> = if in_memory {
        warn!("Using the in-memory store; libraries are lost on shutdown");
        Arc::new(InMemoryLibraryStore::new())
    } else {
        let store = connect_postgres(&config).await?;
        store.migrate().await.context("database migration failed")?;
        Arc::new(store)
    };

    let services_config = &config.services;
    let index = BigQueryIndexClient::new(
        &services_config.index_url,
        services_config.service_token.clone(),
        services_config.timeout,
    )
    .context("invalid index service configuration")?;
    let identity = AdswsIdentityClient::new(
        &services_config.identity_url,
        services_config.service_token.clone(),
        services_config.timeout,
    )
    .context("invalid identity service configuration")?;

    let services = LibraryServices::new(
        store,
        Arc::new(index),
        Arc::new(identity),
        config.read_path(),
    );
    let app = create_app(AppState::new(services));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    info!(%addr, "Starting biblib server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
