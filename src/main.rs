use fxrates::api::{self, AppState};
use fxrates::cache::{InMemoryRateUpdateCache, RateUpdateCache};
use fxrates::config::Config;
use fxrates::db::{init_db, RateRepository, RateUpdateRepository};
use fxrates::ratesapi::{ExchangeRateClient, RateClient};
use fxrates::refresh::RefreshScheduler;
use fxrates::service::RateService;
use fxrates::validator::CurrencyValidator;
use sqlx::sqlite::SqlitePool;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    info!("config loaded");

    // Root shutdown signal, fanned out to the listener, scheduler and workers.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // Initialize database under the startup deadline
    let pool = match timeout(
        STARTUP_TIMEOUT,
        init_db(&config.database_path, config.database_max_connections),
    )
    .await
    {
        Ok(Ok(pool)) => pool,
        Ok(Err(e)) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("Timed out initializing database");
            std::process::exit(1);
        }
    };
    info!("database connection successful");

    let supported_codes = match timeout(STARTUP_TIMEOUT, load_supported_codes(&pool)).await {
        Ok(Ok(codes)) => codes,
        Ok(Err(e)) => {
            eprintln!("Error loading supported currencies: {}", e);
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("Timed out loading supported currencies");
            std::process::exit(1);
        }
    };
    if supported_codes.is_empty() {
        eprintln!("Error loading supported currencies: no currencies available");
        std::process::exit(1);
    }

    // External rate client; the key lives in the URL path.
    let http = match reqwest::Client::builder()
        .timeout(config.http_client_timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let rates_url = format!(
        "{}/{}/latest",
        config.exchange_api_base_url.trim_end_matches('/'),
        config.exchange_api_key
    );
    let client: Arc<dyn RateClient> = Arc::new(ExchangeRateClient::new(http, rates_url));

    // Repositories, cache, service
    let rate_repo = Arc::new(RateRepository::new(pool.clone()));
    let update_repo = Arc::new(RateUpdateRepository::new(pool.clone()));
    let cache: Arc<dyn RateUpdateCache> =
        Arc::new(InMemoryRateUpdateCache::new(config.cache_max_items));
    let service = Arc::new(RateService::new(
        update_repo.clone(),
        rate_repo,
        cache.clone(),
    ));
    let validator = Arc::new(CurrencyValidator::new(supported_codes));

    // Scheduler tied to the root signal
    let scheduler = Arc::new(RefreshScheduler::new(
        update_repo,
        client,
        cache.clone(),
        config.scheduler_interval,
    ));
    scheduler.clone().start(shutdown_rx.clone()).await;
    info!("scheduler started");

    // Router and listener
    let app = api::create_router(AppState { service, validator });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("HTTP server listening on {}", addr);

    // Serve until the signal fires, then give in-flight requests a bounded
    // grace period to drain.
    let mut drain_rx = shutdown_rx.clone();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = drain_rx.changed().await;
            })
            .await
    };
    let mut grace_rx = shutdown_rx.clone();
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = async {
            let _ = grace_rx.changed().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } => {
            warn!("graceful shutdown grace period elapsed, closing");
        }
    }

    // Listener is down; stop background work before releasing storage.
    scheduler.shutdown().await;
    cache.close();
    pool.close().await;
    info!("shutdown complete");
}

/// Loads supported currency codes from the database.
async fn load_supported_codes(pool: &SqlitePool) -> Result<HashSet<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT code FROM currencies")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(code,)| code).collect())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
