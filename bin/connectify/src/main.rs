//! # Connectify Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use anyhow::Context;
use cf_api::{build_schema, router, AppState, BroadcastBus, Services};
use cf_config::{LogFormat, Settings};
use cf_core::{AuthProvider, PostRepo, RetryPolicy, UserRepo};
use cf_mail::{LogTransport, TemplateMailer};
use tracing_subscriber::EnvFilter;

#[cfg(not(any(feature = "db-sqlite", feature = "db-memory")))]
compile_error!("enable one storage feature: `db-sqlite` or `db-memory`");

#[cfg(not(feature = "auth-jwt"))]
compile_error!("the `auth-jwt` feature is required");

#[cfg(feature = "auth-jwt")]
use cf_auth_jwt::JwtAuthProvider;

const EVENT_BUS_CAPACITY: usize = 1024;

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match settings.log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[cfg(feature = "db-sqlite")]
async fn open_stores(settings: &Settings) -> anyhow::Result<(Arc<dyn UserRepo>, Arc<dyn PostRepo>)> {
    let store = Arc::new(
        cf_db_sqlite::SqliteStore::new(&settings.database.url)
            .await
            .with_context(|| format!("failed to open {}", settings.database.url))?,
    );
    let users: Arc<dyn UserRepo> = store.clone();
    let posts: Arc<dyn PostRepo> = store;
    Ok((users, posts))
}

#[cfg(all(feature = "db-memory", not(feature = "db-sqlite")))]
async fn open_stores(_settings: &Settings) -> anyhow::Result<(Arc<dyn UserRepo>, Arc<dyn PostRepo>)> {
    tracing::warn!("using the in-memory store; data is lost on shutdown");
    let users: Arc<dyn UserRepo> = Arc::new(cf_db_memory::MemoryUserStore::new());
    let posts: Arc<dyn PostRepo> = Arc::new(cf_db_memory::MemoryPostStore::new());
    Ok((users, posts))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("invalid configuration")?;
    init_tracing(&settings);

    // 1. Initialize Database Implementation
    let (users, posts) = open_stores(&settings).await?;

    // 2. Initialize Auth Implementation
    let auth: Arc<dyn AuthProvider> = Arc::new(JwtAuthProvider::new(
        &settings.auth.jwt_secret,
        chrono::Duration::hours(settings.auth.token_ttl_hours),
    ));

    // 3. Mail and events
    let mailer = Arc::new(TemplateMailer::new(&settings.mail.from_address, Arc::new(LogTransport)));
    let bus = BroadcastBus::new(EVENT_BUS_CAPACITY);

    // 4. Wire the services into the schema (dynamic dispatch over the ports)
    let services = Services::new(
        users,
        posts,
        auth.clone(),
        mailer,
        Arc::new(bus.clone()),
        RetryPolicy::new(settings.retry.max_attempts),
    );
    let app = router(AppState {
        schema: build_schema(services, bus),
        auth,
    });

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("Connectify listening on http://{address} (GraphiQL at /graphql)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
