//! Blackjack Tracker - ticket settlement and wallet backend

use anyhow::{Context, Result};
use blackjack_tracker_backend::{
    api::{cors_layer, create_router, RouterConfig},
    auth::JwtHandler,
    config::Config,
    middleware::RateLimitLayer,
    store::Store,
};
use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::{net::TcpListener, time::interval};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = Config::parse();
    info!("Blackjack Tracker backend starting");

    let db_path = config.resolved_db_path();
    let store = Arc::new(
        Store::new(&db_path)
            .with_context(|| format!("Failed to open store at {}", db_path))?
            .with_hash_cost(config.bcrypt_cost),
    );

    if config.jwt_secret.len() < 32 {
        warn!("JWT_SECRET is shorter than 32 characters");
    }
    let jwt_handler = Arc::new(JwtHandler::new(
        config.jwt_secret.clone(),
        config.token_lifetime(),
    ));

    let rules = config.number_rules();
    info!(
        guess_max = ?rules.guess_max,
        dealer_max = rules.dealer_max,
        "Ticket number rules"
    );

    let limiter = RateLimitLayer::new(config.rate_limit());
    tokio::spawn(rate_limit_cleanup(limiter.clone()));

    let app = create_router(RouterConfig {
        store,
        jwt_handler,
        rules,
        limiter,
        cors: cors_layer(&config.cors_origin)?,
    });

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("API server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

/// Drops stale rate-limit windows and expired bans once per window.
async fn rate_limit_cleanup(limiter: RateLimitLayer) {
    let mut ticker = interval(limiter.config().window);
    loop {
        ticker.tick().await;
        limiter.cleanup();
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blackjack_tracker_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents), then the crate directory
    let _ = dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
