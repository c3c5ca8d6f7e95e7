//! Polling supervisor
//!
//! Owns the set of machine workers: builds an adapter per registry entry,
//! spawns one worker per machine, runs the periodic process-data log and
//! tears everything down again on stop. Readers query the cached snapshots
//! and subscribe to the event stream through the supervisor.

use std::collections::HashMap;
use std::sync::Arc;

use shared::{
    logging, machine_debug, machine_error, machine_warn, AlarmDefinition, MachineConfig, MachineEvent, MachineId,
    MachineStatus,
};
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::PollingConfig;
use crate::core::AlarmCatalog;
use crate::error::OrchestratorResult;
use crate::state::{Collaborators, SharedState};
use crate::traits::{AdapterFactory, MachineAdapter, MachineRegistry, ProcessLogRepository};
use crate::worker::MachineWorker;

const COMPONENT: &str = "orchestrator";

/// Supervisor of all machine workers
pub struct Orchestrator<F>
where
    F: AdapterFactory + 'static,
{
    factory: F,
    collaborators: Collaborators,
    config: PollingConfig,

    /// Live cache, alarm view and event fan-out
    state: SharedState,

    adapters: HashMap<MachineId, Arc<dyn MachineAdapter>>,
    workers: JoinSet<()>,
    log_task: Option<JoinHandle<()>>,

    /// Present while polling runs
    token: Option<CancellationToken>,
}

impl<F> Orchestrator<F>
where
    F: AdapterFactory + 'static,
{
    pub fn new(factory: F, collaborators: Collaborators, config: PollingConfig) -> Self {
        Self {
            factory,
            collaborators,
            config,
            state: SharedState::new(),
            adapters: HashMap::new(),
            workers: JoinSet::new(),
            log_task: None,
            token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Start polling `machines`, stopping any previous run first
    ///
    /// Machines whose adapter cannot be built are logged and skipped.
    ///
    /// # Returns
    /// Number of machines being polled
    pub async fn start(&mut self, machines: Vec<MachineConfig>) -> OrchestratorResult<usize> {
        self.stop().await;

        logging::log_startup(COMPONENT, &format!("polling for {} machines", machines.len()));

        if let Err(err) = self.reload_alarm_definitions().await {
            logging::log_error(COMPONENT, "Loading alarm definitions", &err);
        }

        let token = CancellationToken::new();
        for machine in machines {
            let adapter = match self.factory.create(&machine) {
                Ok(adapter) => adapter,
                Err(err) => {
                    machine_error!(machine.id, "No adapter for {} ({}): {}", machine.name, machine.machine_type, err);
                    continue;
                }
            };

            self.state.insert_machine(MachineStatus::for_machine(&machine)).await;
            self.adapters.insert(machine.id, Arc::clone(&adapter));

            machine_debug!(machine.id, "Worker for {} at {}", machine.name, machine.endpoint());
            let worker = MachineWorker::new(
                machine,
                adapter,
                self.state.clone(),
                self.collaborators.clone(),
                self.config.clone(),
            );
            self.workers.spawn(worker.run(token.child_token()));
        }

        self.log_task = Some(self.spawn_process_log(token.child_token()));
        self.token = Some(token);

        let started = self.adapters.len();
        logging::log_success(COMPONENT, &format!("Polling {started} machines"));
        Ok(started)
    }

    /// Start polling every enabled machine of `registry`
    pub async fn start_from_registry(&mut self, registry: &dyn MachineRegistry) -> OrchestratorResult<usize> {
        let machines = registry.enabled_machines().await?;
        self.start(machines).await
    }

    /// Cancel all workers and wait for them, bounded by the shutdown grace
    ///
    /// Safe to call when polling never started.
    pub async fn stop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };

        logging::log_shutdown(COMPONENT, "stopping polling");
        token.cancel();

        if let Some(log_task) = self.log_task.take() {
            if let Err(err) = log_task.await {
                debug!("Process log task ended abnormally: {}", err);
            }
        }

        let grace = self.config.shutdown_grace();
        let workers = &mut self.workers;
        let drained = timeout(grace, async {
            while let Some(result) = workers.join_next().await {
                if let Err(err) = result {
                    warn!("Polling worker ended abnormally: {}", err);
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!("Workers still running after {:?}, aborting", grace);
            self.workers.abort_all();
            while self.workers.join_next().await.is_some() {}
        }

        for (id, adapter) in self.adapters.drain() {
            if let Err(err) = adapter.disconnect().await {
                machine_warn!(id, "Disconnect on stop failed: {}", err);
            }
        }
        self.state.clear().await;

        logging::log_success(COMPONENT, "Polling stopped");
    }

    pub async fn status(&self, id: MachineId) -> Option<MachineStatus> {
        self.state.status(id).await
    }

    /// Snapshots of all polled machines, ordered by id
    pub async fn statuses(&self) -> Vec<MachineStatus> {
        self.state.statuses().await
    }

    /// Known definitions of a machine's tracked alarms, most severe first
    pub async fn active_alarms(&self, id: MachineId) -> Vec<AlarmDefinition> {
        self.state.active_alarm_definitions(id).await
    }

    /// Replace the alarm catalog from the alarm repository
    ///
    /// # Returns
    /// Number of definitions loaded
    pub async fn reload_alarm_definitions(&self) -> OrchestratorResult<usize> {
        let definitions = self.collaborators.alarms.load_definitions().await?;
        let catalog = AlarmCatalog::new(definitions);
        let loaded = catalog.len();
        self.state.replace_catalog(catalog).await;
        debug!("Loaded {} alarm definitions", loaded);
        Ok(loaded)
    }

    /// Adapter of a polled machine, for control paths outside the poll loop
    pub fn adapter(&self, id: MachineId) -> Option<Arc<dyn MachineAdapter>> {
        self.adapters.get(&id).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MachineEvent> {
        self.state.subscribe()
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    fn spawn_process_log(&self, token: CancellationToken) -> JoinHandle<()> {
        let state = self.state.clone();
        let process_log = Arc::clone(&self.collaborators.process_log);
        let first = Instant::now() + self.config.log_initial_delay();
        let period = self.config.log_interval();

        tokio::spawn(async move {
            let mut ticker = interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => log_process_data(&state, process_log.as_ref()).await,
                }
            }
        })
    }
}

/// One process-data record per connected machine
async fn log_process_data(state: &SharedState, process_log: &dyn ProcessLogRepository) {
    for status in state.connected_statuses().await {
        let result = if status.recipe_mode {
            process_log.log_recipe_data(&status).await
        } else {
            process_log.log_manual_data(&status).await
        };
        if let Err(err) = result {
            machine_warn!(status.machine_id, "Process data not logged: {}", err);
        }
    }
}
