//! Warden API server binary.
//!
//! Prints `{"port": N}` to stdout once bound so a supervising process can
//! discover an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use warden_api::{AppState, config::ApiConfig};
use warden_core::auth::jwt::{JwtCodec, TokenConfig, resolve_jwt_secret};
use warden_core::auth::password::BcryptHasher;
use warden_core::auth::service::AuthService;
use warden_core::config::SessionConfig;
use warden_core::mail::{GmailCredentials, GmailMailer, LogMailer, Mailer};
use warden_core::refresh::{MemoryRefreshTokenStore, PgRefreshTokenStore, RefreshTokenStore};
use warden_core::users::{MemoryUserDirectory, PgUserDirectory, UserDirectory};

const DEFAULT_LOG_FILTER: &str = "info,warden_api=debug,warden_core=debug";

/// Where users and refresh records live.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Store {
    /// PostgreSQL, with embedded migrations run at startup.
    Postgres,
    /// Process memory; everything is lost on exit.
    Memory,
}

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "warden_api_server", about = "Warden authentication API server")]
struct Args {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (0 = ephemeral).
    #[arg(long, env = "PORT", default_value_t = 3100)]
    port: u16,

    /// Storage backend.
    #[arg(long, env = "WARDEN_STORE", value_enum, default_value_t = Store::Postgres)]
    store: Store,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/warden"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// bcrypt work factor for new password hashes.
    #[arg(long, env = "BCRYPT_COST", default_value_t = warden_core::auth::password::BCRYPT_COST)]
    bcrypt_cost: u32,

    /// Seconds between sweeps of expired refresh records (0 disables).
    #[arg(long, env = "PURGE_INTERVAL_SECS", default_value_t = 3600)]
    purge_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the port message.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();
    info!(store = ?args.store, port = args.port, "starting warden_api_server");

    let (users, refresh_tokens): (Arc<dyn UserDirectory>, Arc<dyn RefreshTokenStore>) =
        match args.store {
            Store::Postgres => {
                info!(max_connections = args.max_connections, "configuring connection pool");
                let pool = PgPoolOptions::new()
                    .max_connections(args.max_connections)
                    .acquire_timeout(Duration::from_secs(30))
                    .connect(&args.database_url)
                    .await?;

                info!("running database migrations");
                warden_core::migrate::migrate(&pool).await?;

                let users: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(pool.clone()));
                let refresh: Arc<dyn RefreshTokenStore> = Arc::new(PgRefreshTokenStore::new(pool));
                (users, refresh)
            }
            Store::Memory => {
                warn!("using in-memory stores; accounts and sessions will not survive a restart");
                let users: Arc<dyn UserDirectory> = Arc::new(MemoryUserDirectory::new());
                let refresh: Arc<dyn RefreshTokenStore> = Arc::new(MemoryRefreshTokenStore::new());
                (users, refresh)
            }
        };

    let mailer: Arc<dyn Mailer> = match GmailCredentials::from_env() {
        Some(credentials) => {
            info!("sending mail through the Gmail API");
            Arc::new(GmailMailer::new(credentials))
        }
        None => {
            info!("Google credentials not set, verification mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let codec = JwtCodec::new(&TokenConfig {
        secret: resolve_jwt_secret(),
    })?;
    let session = SessionConfig::from_env();
    info!(
        access_ttl_secs = session.access_token_ttl.num_seconds(),
        refresh_ttl_days = session.refresh_token_ttl.num_days(),
        reuse_policy = ?session.reuse_policy,
        "session configuration"
    );

    let auth = AuthService::new(
        users,
        refresh_tokens.clone(),
        Arc::new(codec),
        Arc::new(BcryptHasher::with_cost(args.bcrypt_cost)),
        mailer,
        session,
    );

    if args.purge_interval_secs > 0 {
        spawn_purge(refresh_tokens, Duration::from_secs(args.purge_interval_secs));
    }

    let config = ApiConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        ..ApiConfig::from_env()
    };
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    let app = warden_api::router(AppState { auth, config });

    println!("{}", serde_json::json!({ "port": local_addr.port() }));
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Periodically drop refresh records past their expiry.
fn spawn_purge(store: Arc<dyn RefreshTokenStore>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "purged expired refresh records"),
                Err(e) => warn!("refresh record purge failed: {e}"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
