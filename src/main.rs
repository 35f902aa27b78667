use axum::{
    Router, middleware,
    routing::{get, post},
};
use clap::Parser;
use std::sync::Arc;
use tokio::signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod auth;
mod config;
mod error;
mod handlers;
mod metrics;
mod models;
mod rate_limit;
mod service;
mod state;
mod stats;
mod store;
mod validate;

use config::{Args, env_secret};
use handlers::{health_handler, metrics_handler, signup_handler, stats_handler};
use rate_limit::{RateLimiter, SystemClock, sweeper};
use state::AppState;
use store::{MemoryStore, RestStore, WaitlistStore};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let store: Arc<dyn WaitlistStore> = match &args.store_url {
        Some(url) => {
            let api_key = env_secret("WAITLIST_STORE_KEY")
                .expect("WAITLIST_STORE_KEY required when --store-url is set");
            info!(url, "using REST store");
            Arc::new(RestStore::new(reqwest::Client::new(), url.clone(), api_key))
        }
        None => {
            warn!("no store URL configured; using in-memory store (nothing persists)");
            Arc::new(MemoryStore::new())
        }
    };

    let limiter = if args.no_rate_limit {
        warn!("submission rate limiting disabled");
        None
    } else {
        info!(
            max = args.rate_limit,
            window_secs = args.rate_window,
            "rate limiting enabled"
        );
        Some(Arc::new(RateLimiter::new(
            args.rate_limit,
            args.rate_window,
            Arc::new(SystemClock),
        )))
    };

    let admin_password = env_secret("ADMIN_PASSWORD");
    if admin_password.is_none() {
        warn!("ADMIN_PASSWORD not set; stats endpoint is unprotected");
    }

    let state = Arc::new(AppState {
        store,
        limiter: limiter.clone(),
        recent_limit: args.recent_limit,
        stats_row_cap: args.stats_row_cap,
        admin_password,
    });

    // expired-entry sweep keeps the limiter map bounded
    if let Some(limiter) = limiter {
        let every = args.sweep_interval;
        tokio::spawn(async move {
            sweeper(limiter, every).await;
        });
    }

    let stats_routes = Router::new()
        .route("/api/waitlist/stats", get(stats_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    let app = Router::new()
        .route("/api/waitlist", post(signup_handler))
        .merge(stats_routes)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let address = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("failed to bind listener");
    info!("waitlist service running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    info!("server shut down");
}

async fn shutdown_signal() {
    let interrupt = async {
        ctrl_c().await.expect("failed to install Ctrl+C handler");
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
