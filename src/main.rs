use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portfolio_gateway::{
    AppState, RateLimiter, SystemClock, WindowStore,
    config::Args,
    handlers::router,
    metrics::{CHECK_LIMITER, CLIENT_LIMITER},
    sweeper::spawn_sweeper,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portfolio_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments
    let args = Args::parse();
    let client_rule = args.rule()?;
    let sweep_interval = args.sweep_interval()?;

    // separate stores so a checked identifier never shares a window with a client IP
    let client_limiter = RateLimiter::new(WindowStore::new(), Arc::new(SystemClock));
    let check_limiter = RateLimiter::new(WindowStore::new(), Arc::new(SystemClock));
    let sweepers = [
        spawn_sweeper(CLIENT_LIMITER, client_limiter.clone(), sweep_interval),
        spawn_sweeper(CHECK_LIMITER, check_limiter.clone(), sweep_interval),
    ];

    let state = Arc::new(AppState {
        client_limiter,
        check_limiter,
        client_rule,
        trust_forwarded_for: args.trust_forwarded_for,
        trusted_clients: args.trusted_clients.clone(),
    });

    let app = router(state);

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Gateway running on http://{}", addr);
    tracing::info!(
        "Client rate limit: {} requests per {} ms",
        client_rule.max_requests(),
        client_rule.window_ms()
    );
    if args.trust_forwarded_for {
        tracing::info!("Keying clients by x-forwarded-for");
    }
    if !args.trusted_clients.is_empty() {
        tracing::info!("Trusted clients exempt from the client limit: {:?}", args.trusted_clients);
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    for sweeper in &sweepers {
        sweeper.abort();
    }
    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
