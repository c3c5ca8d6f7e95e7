//! Test helpers and builder patterns for orchestrator tests
//!
//! `RecordingStore` stands in for every persistence collaborator and keeps
//! what it was asked to write. `FakeAdapter` serves whatever snapshot the
//! test sets and counts device calls, which keeps multi-tick scenarios far
//! shorter than scripting a mock for each tick.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use orchestrator::traits::MockAdapterFactory;
use orchestrator::{
    AlarmCatalog, AlarmRepository, Collaborators, MachineAdapter, MachineWorker, Orchestrator, OrchestratorError,
    OrchestratorResult, PollingConfig, ProcessLogRepository, ProductionRepository, RecipeRepository, SharedState,
};
use shared::{
    AlarmDefinition, AlarmHistoryState, BatchEndRecord, BatchSummary, ChemicalConsumption, MachineConfig,
    MachineEvent, MachineId, MachineStatus, MachineType, PlcOperator, Recipe, StepRecord,
};
use tokio::sync::broadcast;

use super::fixtures::TestFixtures;

/// One call made to the persistence collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    AlarmHistory { number: u16, state: AlarmHistoryState },
    BatchStart { batch: String, recipe: String },
    BatchEnd(BatchEndRecord),
    BatchSummary { batch: String, summary: BatchSummary },
    Step { batch: String, record: StepRecord },
    Chemical(ChemicalConsumption),
    RecipeLog(MachineId),
    ManualLog(MachineId),
}

/// In-memory persistence that records every write
#[derive(Default)]
pub struct RecordingStore {
    definitions: Vec<AlarmDefinition>,
    recipes: Mutex<HashMap<String, Recipe>>,
    recorded: Mutex<Vec<Recorded>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            definitions: TestFixtures::alarm_definitions(),
            ..Default::default()
        }
    }

    pub fn with_recipe(self, recipe: Recipe) -> Self {
        self.recipes.lock().unwrap().insert(recipe.name.clone(), recipe);
        self
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            alarms: self.clone(),
            production: self.clone(),
            process_log: self.clone(),
            recipes: self.clone(),
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn alarm_history(&self) -> Vec<(u16, AlarmHistoryState)> {
        self.recorded()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::AlarmHistory { number, state } => Some((number, state)),
                _ => None,
            })
            .collect()
    }

    pub fn batch_starts(&self) -> Vec<String> {
        self.recorded()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::BatchStart { batch, .. } => Some(batch),
                _ => None,
            })
            .collect()
    }

    pub fn batch_ends(&self) -> Vec<BatchEndRecord> {
        self.recorded()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::BatchEnd(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<(String, BatchSummary)> {
        self.recorded()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::BatchSummary { batch, summary } => Some((batch, summary)),
                _ => None,
            })
            .collect()
    }

    pub fn steps(&self) -> Vec<(String, StepRecord)> {
        self.recorded()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::Step { batch, record } => Some((batch, record)),
                _ => None,
            })
            .collect()
    }

    pub fn process_logs(&self) -> Vec<Recorded> {
        self.recorded()
            .into_iter()
            .filter(|entry| matches!(entry, Recorded::RecipeLog(_) | Recorded::ManualLog(_)))
            .collect()
    }

    fn push(&self, entry: Recorded) {
        self.recorded.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl AlarmRepository for RecordingStore {
    async fn load_definitions(&self) -> OrchestratorResult<Vec<AlarmDefinition>> {
        Ok(self.definitions.clone())
    }

    async fn write_alarm_history(
        &self,
        _machine_id: MachineId,
        definition: &AlarmDefinition,
        state: AlarmHistoryState,
    ) -> OrchestratorResult<()> {
        self.push(Recorded::AlarmHistory {
            number: definition.number,
            state,
        });
        Ok(())
    }
}

#[async_trait]
impl ProductionRepository for RecordingStore {
    async fn start_batch(&self, status: &MachineStatus) -> OrchestratorResult<()> {
        self.push(Recorded::BatchStart {
            batch: status.batch_number.clone(),
            recipe: status.recipe_name.clone(),
        });
        Ok(())
    }

    async fn end_batch(&self, record: &BatchEndRecord) -> OrchestratorResult<()> {
        self.push(Recorded::BatchEnd(record.clone()));
        Ok(())
    }

    async fn update_batch_summary(
        &self,
        _machine_id: MachineId,
        batch_number: &str,
        summary: BatchSummary,
    ) -> OrchestratorResult<()> {
        self.push(Recorded::BatchSummary {
            batch: batch_number.to_string(),
            summary,
        });
        Ok(())
    }

    async fn log_step(&self, status: &MachineStatus, record: &StepRecord) -> OrchestratorResult<()> {
        self.push(Recorded::Step {
            batch: status.batch_number.clone(),
            record: record.clone(),
        });
        Ok(())
    }

    async fn log_chemical_consumption(
        &self,
        _status: &MachineStatus,
        consumption: &ChemicalConsumption,
    ) -> OrchestratorResult<()> {
        self.push(Recorded::Chemical(consumption.clone()));
        Ok(())
    }
}

#[async_trait]
impl ProcessLogRepository for RecordingStore {
    async fn log_recipe_data(&self, status: &MachineStatus) -> OrchestratorResult<()> {
        self.push(Recorded::RecipeLog(status.machine_id));
        Ok(())
    }

    async fn log_manual_data(&self, status: &MachineStatus) -> OrchestratorResult<()> {
        self.push(Recorded::ManualLog(status.machine_id));
        Ok(())
    }
}

#[async_trait]
impl RecipeRepository for RecordingStore {
    async fn recipe_by_name(&self, name: &str) -> OrchestratorResult<Option<Recipe>> {
        Ok(self.recipes.lock().unwrap().get(name).cloned())
    }
}

/// Adapter serving a test-controlled snapshot
pub struct FakeAdapter {
    machine_type: MachineType,
    connect_fails: AtomicBool,
    /// `None` makes the live read fail
    snapshot: Mutex<Option<MachineStatus>>,
    recipe: Mutex<Option<Recipe>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    increments: AtomicUsize,
    resets: AtomicUsize,
}

impl FakeAdapter {
    pub fn new(machine_type: MachineType) -> Arc<Self> {
        Arc::new(Self {
            machine_type,
            connect_fails: AtomicBool::new(false),
            snapshot: Mutex::new(Some(TestFixtures::idle_snapshot())),
            recipe: Mutex::new(None),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            increments: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
        })
    }

    pub fn set_snapshot(&self, snapshot: MachineStatus) {
        *self.snapshot.lock().unwrap() = Some(snapshot);
    }

    pub fn fail_reads(&self) {
        *self.snapshot.lock().unwrap() = None;
    }

    pub fn fail_connects(&self, fail: bool) {
        self.connect_fails.store(fail, Ordering::SeqCst);
    }

    /// Recipe image returned by `read_recipe`
    pub fn set_recipe(&self, recipe: Recipe) {
        *self.recipe.lock().unwrap() = Some(recipe);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    fn endpoint(&self) -> String {
        format!("fake-{}", self.machine_type)
    }
}

#[async_trait]
impl MachineAdapter for FakeAdapter {
    fn machine_type(&self) -> MachineType {
        self.machine_type
    }

    async fn connect(&self) -> OrchestratorResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.connect_fails.load(Ordering::SeqCst) {
            return Err(OrchestratorError::TransportError {
                endpoint: self.endpoint(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn disconnect(&self) -> OrchestratorResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_live_status(&self) -> OrchestratorResult<MachineStatus> {
        self.snapshot.lock().unwrap().clone().ok_or_else(|| OrchestratorError::Timeout {
            endpoint: self.endpoint(),
            timeout: Duration::from_secs(5),
        })
    }

    async fn read_recipe(&self) -> OrchestratorResult<Recipe> {
        self.recipe
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| OrchestratorError::protocol(0, "no recipe loaded"))
    }

    async fn write_recipe(&self, _recipe: &Recipe, _slot: Option<u16>) -> OrchestratorResult<()> {
        Ok(())
    }

    async fn read_recipe_names(&self) -> OrchestratorResult<BTreeMap<u16, String>> {
        Ok(BTreeMap::new())
    }

    async fn write_recipe_name(&self, _slot: u16, _name: &str) -> OrchestratorResult<()> {
        Ok(())
    }

    async fn read_operators(&self) -> OrchestratorResult<Vec<PlcOperator>> {
        Ok(Vec::new())
    }

    async fn read_operator(&self, slot: u8) -> OrchestratorResult<PlcOperator> {
        Err(OrchestratorError::SlotOutOfRange {
            slot: u16::from(slot),
            min: 0,
            max: 0,
        })
    }

    async fn write_operator(&self, _operator: &PlcOperator) -> OrchestratorResult<()> {
        Ok(())
    }

    async fn read_batch_summary(&self) -> OrchestratorResult<BatchSummary> {
        if self.machine_type == MachineType::Drying {
            return Err(OrchestratorError::unsupported("batch summary", self.machine_type));
        }
        Ok(BatchSummary {
            water: 1200,
            electricity: 85,
            steam: 430,
        })
    }

    async fn reset_counters(&self) -> OrchestratorResult<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn increment_production_counter(&self) -> OrchestratorResult<()> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn acknowledge_alarm(&self) -> OrchestratorResult<()> {
        Ok(())
    }
}

/// One worker driven tick by tick with a fixed clock
pub struct WorkerHarness {
    pub worker: MachineWorker,
    pub adapter: Arc<FakeAdapter>,
    pub store: Arc<RecordingStore>,
    pub state: SharedState,
    pub events: broadcast::Receiver<MachineEvent>,
}

impl WorkerHarness {
    pub async fn new(machine: MachineConfig, store: RecordingStore) -> Self {
        Self::with_config(machine, store, PollingConfig::default()).await
    }

    pub async fn with_config(machine: MachineConfig, store: RecordingStore, config: PollingConfig) -> Self {
        let adapter = FakeAdapter::new(machine.machine_type);
        let store = Arc::new(store);
        let state = SharedState::new();
        let events = state.subscribe();

        let definitions = store.load_definitions().await.unwrap();
        state.replace_catalog(AlarmCatalog::new(definitions)).await;
        state.insert_machine(MachineStatus::for_machine(&machine)).await;

        let worker = MachineWorker::new(
            machine,
            adapter.clone(),
            state.clone(),
            store.collaborators(),
            config,
        );

        Self {
            worker,
            adapter,
            store,
            state,
            events,
        }
    }

    pub async fn dyeing() -> Self {
        Self::new(
            TestFixtures::dyeing_machine(),
            RecordingStore::new().with_recipe(TestFixtures::heating_recipe()),
        )
        .await
    }

    /// Dyeing worker that connected on tick 0
    pub async fn connected() -> Self {
        let mut harness = Self::dyeing().await;
        harness.tick(0).await;
        harness.drain_events();
        harness
    }

    pub async fn tick(&mut self, secs: i64) {
        self.worker.tick(TestFixtures::at(secs)).await;
    }

    /// Tick once per second over `from..=to`
    pub async fn tick_range(&mut self, from: i64, to: i64) {
        for secs in from..=to {
            self.tick(secs).await;
        }
    }

    pub fn status(&self) -> &MachineStatus {
        self.worker.status()
    }

    /// Events published since the last drain
    pub fn drain_events(&mut self) -> Vec<MachineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Builder pattern for creating test orchestrators with sensible defaults
pub struct OrchestratorBuilder {
    adapters: HashMap<MachineId, Arc<FakeAdapter>>,
    store: RecordingStore,
    config: PollingConfig,
}

impl OrchestratorBuilder {
    /// Fast timings so a run settles within a few hundred milliseconds
    pub fn new() -> Self {
        let config = PollingConfig::default()
            .with_poll_interval(Duration::from_millis(20))
            .with_log_interval(Duration::from_millis(40))
            .with_log_initial_delay(Duration::from_millis(10))
            .with_shutdown_grace(Duration::from_millis(500));

        Self {
            adapters: HashMap::new(),
            store: RecordingStore::new(),
            config,
        }
    }

    pub fn with_adapter(mut self, machine: &MachineConfig, adapter: Arc<FakeAdapter>) -> Self {
        self.adapters.insert(machine.id, adapter);
        self
    }

    pub fn with_store(mut self, store: RecordingStore) -> Self {
        self.store = store;
        self
    }

    /// Build the orchestrator; machines without a fake adapter fail creation
    pub fn build(self) -> (Orchestrator<MockAdapterFactory>, Arc<RecordingStore>) {
        let adapters = self.adapters;
        let mut factory = MockAdapterFactory::new();
        factory.expect_create().returning(move |machine: &MachineConfig| {
            match adapters.get(&machine.id) {
                Some(adapter) => Ok(adapter.clone() as Arc<dyn MachineAdapter>),
                None => Err(OrchestratorError::ConfigurationError {
                    field: format!("no adapter for {}", machine.id),
                }),
            }
        });

        let store = Arc::new(self.store);
        let orchestrator = Orchestrator::new(factory, store.collaborators(), self.config);
        (orchestrator, store)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait until `condition` holds or `within` elapses
pub async fn eventually<F, Fut>(within: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition().await
}
