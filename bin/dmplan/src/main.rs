//! dmplan - data management plan API server.
//!
//! # Usage
//!
//! ```bash
//! # Start with default config
//! dmplan
//!
//! # Start with environment overrides
//! DATABASE_URL=postgres://localhost/dmplan CURSOR_SECRET=change-me dmplan
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use dmplan_core::metrics::init_metrics;
use dmplan_core::services::{
    CursorCodec, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PaginationConfig, PaginationEngine,
};
use dmplan_graphql::{ServerConfig, build_schema, serve_with_shutdown};
use dmplan_storage::{Database, DatabaseConfig, PgRepositories};

/// Secret used when none is configured. Tokens signed with it are forgeable.
const DEV_CURSOR_SECRET: &str = "dmplan-dev-cursor-secret";

/// dmplan CLI - data management plan API server.
#[derive(Parser, Debug)]
#[command(name = "dmplan")]
#[command(about = "dmplan - search and relationship API for data management plans")]
#[command(version)]
struct Cli {
    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/dmplan"
    )]
    database_url: String,

    /// GraphQL server bind address.
    #[arg(long, env = "GRAPHQL_HOST", default_value = "0.0.0.0")]
    graphql_host: String,

    /// GraphQL server port.
    #[arg(long, env = "GRAPHQL_PORT", default_value = "4000")]
    graphql_port: u16,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Secret used to sign pagination cursors.
    #[arg(long, env = "CURSOR_SECRET", hide_env_values = true)]
    cursor_secret: Option<String>,

    /// Page size when a search gives no limit.
    #[arg(long, env = "DEFAULT_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    default_page_size: i64,

    /// Largest page size a search may request.
    #[arg(long, env = "MAX_PAGE_SIZE", default_value_t = MAX_PAGE_SIZE)]
    max_page_size: i64,

    /// Disable the GraphiQL playground.
    #[arg(long, env = "DISABLE_PLAYGROUND")]
    disable_playground: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled = match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>() {
        Ok(metrics_addr) => {
            match PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                Ok(()) => {
                    init_metrics();
                    true
                }
                Err(e) => {
                    warn!("⚠️  Failed to start metrics exporter: {}. Continuing without metrics.", e);
                    false
                }
            }
        }
        Err(e) => {
            warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
            false
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting dmplan API");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    info!("🗄️  Connecting to database...");
    let db = Database::connect(&DatabaseConfig::for_api(&cli.database_url))
        .await
        .context("Failed to connect to database")?;

    db.migrate().await.context("Failed to run migrations")?;
    info!("🗄️  Database ready (migrations applied)");

    if cli.migrate_only {
        info!("🛑 --migrate-only flag set, exiting");
        db.close().await;
        return Ok(());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 🔐 PAGINATION
    // ─────────────────────────────────────────────────────────────────────────
    let secret = match cli.cursor_secret.as_deref().map(str::trim) {
        Some(secret) if !secret.is_empty() => secret.to_string(),
        _ => {
            warn!("⚠️  CURSOR_SECRET not set, using the development secret");
            DEV_CURSOR_SECRET.to_string()
        }
    };

    let pagination_config = PaginationConfig::new(cli.default_page_size, cli.max_page_size);
    if pagination_config.default_limit != cli.default_page_size
        || pagination_config.max_limit != cli.max_page_size
    {
        warn!(
            default_limit = pagination_config.default_limit,
            max_limit = pagination_config.max_limit,
            "⚠️  Page size settings adjusted"
        );
    }
    let engine = PaginationEngine::new(CursorCodec::new(secret), pagination_config);

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVICES START
    // ─────────────────────────────────────────────────────────────────────────
    let repositories = Arc::new(PgRepositories::new(&db));
    let schema = build_schema(repositories, engine);

    let graphql_config = ServerConfig {
        host: cli.graphql_host.clone(),
        port: cli.graphql_port,
        enable_playground: !cli.disable_playground,
    };

    info!("✅ dmplan ready");
    info!("   ⚡ GraphQL:  http://localhost:{}/graphql", cli.graphql_port);
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    let served = serve_with_shutdown(schema, graphql_config, shutdown_signal()).await;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    db.close().await;

    if let Err(e) = served {
        error!(error = %e, "❌ Server error");
        return Err(e).context("GraphQL server failed");
    }

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
