use marketplace_route_gate::{
    AppState, Navigator,
    config::{AppConfig, Env},
    create_router,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, builds the navigator and serves HTTP.
/// Any startup failure is fatal.
#[tokio::main]
async fn main() {
    // 1. Configuration (Fail-Fast)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise guard decisions are visible at debug.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketplace_route_gate=debug,tower_http=info".into());

    // 3. Log format by environment: pretty locally, JSON in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.seller_auto_promote {
        tracing::warn!("GUARD_SELLER_AUTO_PROMOTE is on: any token grants seller routes");
    }

    // 4. Route Table & Guard
    let navigator = match Navigator::from_config(&config) {
        Ok(navigator) => navigator,
        Err(e) => {
            tracing::error!(error = %e, "route table failed to build");
            std::process::exit(1);
        }
    };
    tracing::info!(routes = navigator.table().len(), "route table loaded");

    // 5. Router and Server Startup
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(navigator, config));

    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %bind_addr, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}
