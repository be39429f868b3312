use anyhow::{Context, Result};
use store_concurrency::config::Settings;
use store_concurrency::Application;
use tracing::{error, info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    let settings = Settings::new().context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if settings.logging.format == "compact" {
        subscriber.compact().init();
    } else {
        subscriber.init();
    }

    info!("Starting store concurrency run");

    let app = Application::from_settings(settings).await?;
    match app.run().await {
        Ok(report) => {
            info!(%report, "Invariant held for the whole run");
            Ok(())
        }
        Err(err) => {
            error!(kind = %err.kind(), "Run failed: {err}");
            Err(err).context("Concurrency verification failed")
        }
    }
}
