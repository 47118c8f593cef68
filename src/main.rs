use anyhow::Result;
use bowser::api::FuelCheckClient;
use bowser::{Config, PollCoordinator};
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    bowser::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Bowser FuelCheck aggregation engine starting up");

    let client = Arc::new(
        FuelCheckClient::new(&config.api)
            .map_err(|e| anyhow::anyhow!("Failed to create API client: {}", e))?,
    );
    let mut coordinator = PollCoordinator::new(client);

    // The coordinator has no scheduler of its own; this loop owns cadence and
    // guarantees at most one in-flight cycle. The first tick fires
    // immediately.
    let mut ticker = interval(Duration::from_secs(config.polling.interval_hours * 3600));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tokio::select! {
                    // Shutdown mid-cycle drops the future: in-flight requests
                    // are abandoned and no partial snapshot is published.
                    result = coordinator.run_cycle(&config) => match result {
                        Ok(report) => info!(
                            "Poll cycle complete: {}/{} requests ok, {} entities",
                            report.successes, report.requests, report.entities
                        ),
                        Err(e) => warn!("Poll cycle failed: {}", e),
                    },
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown requested mid-cycle, abandoning cycle");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested, exiting");
                break;
            }
        }
    }

    Ok(())
}
