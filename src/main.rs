use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ward_core::{RecordClient, Repositories, StoreConfig, StoreEnv};

/// Main entry point for the ward records server
///
/// Resolves the record store from the environment once, then serves the REST API.
///
/// # Environment Variables
/// - `WARD_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `WARD_STORE`: `remote` (default) or `memory`
/// - `APPER_BASE_URL`, `APPER_PROJECT_ID`, `APPER_PUBLIC_KEY`: hosted store connection
/// - `APPER_TIMEOUT_SECS`: per-request timeout (default: 30)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the store configuration is incomplete or invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ward=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("WARD_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let store = StoreConfig::from_env(StoreEnv::from_process_env())?.open()?;
    let repos = Repositories::new(RecordClient::with_tracing(store));
    let app = api_rest::router(repos);

    tracing::info!("-- Starting ward REST API on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
