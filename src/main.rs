use ilmo::{
    AppState, GraphqlRepository, MockRepository,
    config::{AppConfig, Env},
    create_router,
    repository::RepositoryState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, the data service client and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins over the defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ilmo=debug,tower_http=info,axum=info".into());

    // 3. Log format by environment: pretty for humans, JSON for the log pipeline.
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
    if config.telemetry_enabled() {
        tracing::info!("Error reporting enabled; failures are tagged with telemetry=true");
    }

    // 4. Data Service
    // Production always has an endpoint (checked by AppConfig::load). Local mode without
    // one runs against the in-memory demo service.
    let repo = match &config.graphql_url {
        Some(endpoint) => {
            tracing::info!(%endpoint, "Using GraphQL data service");
            Arc::new(GraphqlRepository::new(endpoint, config.current_user_poll)) as RepositoryState
        }
        None => {
            tracing::warn!("GRAPHQL_URL not set, serving the in-memory demo data service");
            Arc::new(MockRepository::demo(config.jwt_secret.clone())) as RepositoryState
        }
    };

    // 5. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState { repo, config };

    // 6. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}
