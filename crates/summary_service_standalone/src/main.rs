use summary_service::config::ServiceConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .with_file(false),
        )
        .init();

    let config = ServiceConfig::from_env();
    tracing::info!("Starting standalone summary service on port {}", config.port);

    if let Err(e) = summary_service::server::run(config).await {
        tracing::error!("Failed to run summary service: {}", e);
        std::process::exit(1);
    }
}
