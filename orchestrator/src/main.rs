//! Main entry point for the polling service
//!
//! Wires the Modbus adapter factory and the JSON file store into the
//! supervisor, polls until Ctrl+C and shuts down gracefully.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::debug;

use orchestrator::services::{JsonFileStore, JsonMachineRegistry, ModbusAdapterFactory};
use orchestrator::{Collaborators, Orchestrator, OrchestratorResult, PollingConfig};
use shared::logging;

const COMPONENT: &str = "orchestrator";

/// Polls textile machine controllers and records production data
#[derive(Parser)]
#[command(name = "orchestrator")]
#[command(about = "Polls dyeing and drying machine controllers over Modbus TCP")]
pub struct Args {
    /// JSON file listing the machines to poll
    #[arg(long, env = "MACHINE_REGISTRY", default_value = "machines.json")]
    pub registry: PathBuf,

    /// Directory holding alarm definitions, recipes and the production logs
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Poll period per machine in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Process data log period in milliseconds
    #[arg(long, env = "LOG_INTERVAL_MS", default_value = "5000")]
    pub log_interval_ms: u64,

    /// Bound on every single device request in milliseconds
    #[arg(long, env = "DEVICE_TIMEOUT_MS", default_value = "5000")]
    pub device_timeout_ms: u64,
}

impl Args {
    fn polling_config(&self) -> PollingConfig {
        PollingConfig::default()
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_log_interval(Duration::from_millis(self.log_interval_ms))
            .with_device_timeout(Duration::from_millis(self.device_timeout_ms))
    }
}

#[tokio::main]
async fn main() -> OrchestratorResult<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));
    logging::log_startup(COMPONENT, "textile machine polling service");

    let config = args.polling_config();
    debug!("Polling configuration: {:?}", config);

    let store = Arc::new(JsonFileStore::new(&args.data_dir));
    let collaborators = Collaborators {
        alarms: store.clone(),
        production: store.clone(),
        process_log: store.clone(),
        recipes: store,
    };
    let factory = ModbusAdapterFactory::new(config.device_timeout());
    let registry = JsonMachineRegistry::new(&args.registry);

    let mut orchestrator = Orchestrator::new(factory, collaborators, config);
    if let Err(err) = orchestrator.start_from_registry(&registry).await {
        logging::log_error(COMPONENT, "Starting polling", &err);
        return Err(err);
    }

    match signal::ctrl_c().await {
        Ok(()) => logging::log_shutdown(COMPONENT, "Received Ctrl+C signal"),
        Err(err) => logging::log_error(COMPONENT, "Signal handling", &err),
    }

    orchestrator.stop().await;

    logging::log_success(COMPONENT, "Polling service stopped gracefully");
    Ok(())
}
