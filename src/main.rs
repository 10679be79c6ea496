/// Clinic Records Service
///
/// Patients, doctors, appointments and the doctor-authored resolutions
/// written for them, served over HTTP with token-based identity.

mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod identity;
mod metrics;
mod resolution;
mod server;
mod specialization;
#[cfg(test)]
mod test_support;

use config::{LogFormat, LoggingConfig, ServerConfig};
use context::AppContext;
use error::ClinicResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ClinicResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    init_logging(&config.logging);

    tracing::info!(
        "Clinic records service v{} starting",
        config.service.version
    );

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
