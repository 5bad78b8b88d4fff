use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use rx_core::{CoreConfig, ReminderScheduler, config::data_dir_from_env_value};

/// Main entry point for the rxtrack server
///
/// Serves the REST API and Swagger UI, and arms reminders on this process's runtime.
///
/// # Environment Variables
/// - `RX_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `RX_DATA_DIR`: Directory for the local store (default: "rx_data")
/// - `RUST_LOG`: Log filter
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rx_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("RX_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = CoreConfig::new(data_dir_from_env_value(std::env::var("RX_DATA_DIR").ok()))?;
    let store = cfg.open_store()?;

    tracing::info!("++ Using data directory {}", cfg.data_dir().display());
    tracing::info!("++ Starting rxtrack REST on {}", rest_addr);

    let app = router(AppState::new(store, ReminderScheduler::default()));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
