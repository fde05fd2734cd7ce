use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use regpulse_common::{Config, FirmProfile};
use regpulse_engine::{JsonFileSource, Orchestrator, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("regpulse=info".parse()?))
        .init();

    info!("RegPulse dashboard build starting...");

    let config = Config::from_env();
    let source = Arc::new(JsonFileSource::new(&config.updates_path));
    let orchestrator = Orchestrator::new(source, Arc::new(SystemClock), config.cache_ttl_minutes);

    let profile = config
        .firm_profile
        .as_ref()
        .map(|id| FirmProfile { id: id.clone(), sectors: Vec::new() });

    let dashboard = orchestrator.dashboard(profile.as_ref()).await?;
    println!("{}", serde_json::to_string_pretty(dashboard.as_ref())?);

    Ok(())
}
