use csv_ingestion::{config::AppConfig, web_service::WebService};
use tracing::{info, debug};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("csv_ingestion=debug".parse()?)
            .add_directive("hyper=info".parse()?)
            .add_directive("reqwest=info".parse()?))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting CSV ingestion service");
    let config = AppConfig::load()?;
    debug!("Configuration: {:?}", config);

    let service = WebService::new(&config)?;
    info!("Web service initialized successfully");

    service.run().await
}
