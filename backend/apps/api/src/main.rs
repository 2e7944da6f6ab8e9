//! API Server Entry Point
//!
//! Wires the auth routes onto a Postgres pool and runs the periodic
//! token/lockout cleanup next to the HTTP server. Startup failures use
//! `anyhow`; request errors render through `auth::AuthError`.

use anyhow::Context;
use auth::{AuthConfig, MaintenanceUseCase, PgAuthRepository, auth_router};
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let auth_config = load_auth_config()?;
    let auth_repo = PgAuthRepository::new(pool.clone());

    // First tick runs immediately, so this also covers startup cleanup
    spawn_maintenance(auth_repo.clone(), Arc::new(auth_config.clone()));

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api/v1/auth", auth_router(auth_repo, auth_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()
        .context("BIND_ADDR must be a socket address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Auth settings from the environment
///
/// Debug builds fall back to a random signing secret; release builds
/// refuse to start without `AUTH_JWT_SECRET`.
fn load_auth_config() -> anyhow::Result<AuthConfig> {
    let mut config = match env::var("AUTH_JWT_SECRET") {
        Ok(secret_b64) => AuthConfig {
            jwt_secret: general_purpose::STANDARD
                .decode(secret_b64.trim())
                .context("AUTH_JWT_SECRET must be base64")?,
            ..AuthConfig::default()
        },
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("AUTH_JWT_SECRET not set, using a random development secret");
            AuthConfig::development()
        }
        Err(_) => anyhow::bail!("AUTH_JWT_SECRET must be set in production"),
    };

    if !config.has_usable_secret() {
        anyhow::bail!(
            "AUTH_JWT_SECRET must decode to at least {} bytes",
            auth::application::config::MIN_JWT_SECRET_LEN
        );
    }

    if let Some(pepper) = env::var("AUTH_PASSWORD_PEPPER").ok().filter(|p| !p.is_empty()) {
        config.password_pepper = Some(pepper.into_bytes());
    }

    Ok(config)
}

/// Periodic token cleanup, plus a faster tick that releases lockouts
///
/// Failures are logged and retried on the next tick; they never stop the server.
fn spawn_maintenance(repo: PgAuthRepository, config: Arc<AuthConfig>) {
    let repo = Arc::new(repo);
    let cleanup_period = config.maintenance_interval;
    let release_period = config.lockout_release_interval;
    let use_case = Arc::new(MaintenanceUseCase::new(
        repo.clone(),
        repo.clone(),
        repo,
        config,
    ));

    let cleanup = Arc::clone(&use_case);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = cleanup.run().await {
                tracing::warn!(error = %e, "Auth maintenance failed, continuing anyway");
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(release_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match use_case.release_expired_lockouts().await {
                Ok(0) => {}
                Ok(released) => tracing::info!(released, "Expired lockouts released"),
                Err(e) => tracing::warn!(error = %e, "Lockout release failed"),
            }
        }
    });
}
