//! Runtime state shared between the supervisor, its workers and readers
//!
//! Each machine's entries are written only by that machine's worker. Keys
//! are added and removed only by the supervisor's start and stop paths, so
//! workers update existing entries and never create them.

use std::collections::HashMap;
use std::sync::Arc;

use shared::{AlarmDefinition, MachineEvent, MachineId, MachineStatus};
use tokio::sync::{broadcast, RwLock};

use crate::core::AlarmCatalog;
use crate::traits::{AlarmRepository, ProcessLogRepository, ProductionRepository, RecipeRepository};

const EVENT_CAPACITY: usize = 1024;

/// Persistence collaborators handed to every worker
#[derive(Clone)]
pub struct Collaborators {
    pub alarms: Arc<dyn AlarmRepository>,
    pub production: Arc<dyn ProductionRepository>,
    pub process_log: Arc<dyn ProcessLogRepository>,
    pub recipes: Arc<dyn RecipeRepository>,
}

/// Live cache, active-alarm view, alarm catalog and event fan-out
#[derive(Clone)]
pub struct SharedState {
    statuses: Arc<RwLock<HashMap<MachineId, MachineStatus>>>,
    active_alarms: Arc<RwLock<HashMap<MachineId, Vec<u16>>>>,
    catalog: Arc<RwLock<AlarmCatalog>>,
    events: broadcast::Sender<MachineEvent>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            statuses: Arc::new(RwLock::new(HashMap::new())),
            active_alarms: Arc::new(RwLock::new(HashMap::new())),
            catalog: Arc::new(RwLock::new(AlarmCatalog::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MachineEvent> {
        self.events.subscribe()
    }

    /// Fan an event out; having no subscriber is not an error
    pub fn publish(&self, event: MachineEvent) {
        let _ = self.events.send(event);
    }

    /// Register a machine's cache entries
    pub async fn insert_machine(&self, status: MachineStatus) {
        let id = status.machine_id;
        self.active_alarms.write().await.insert(id, Vec::new());
        self.statuses.write().await.insert(id, status);
    }

    /// Replace an existing snapshot; returns false once the machine was removed
    pub async fn update_status(&self, status: &MachineStatus) -> bool {
        let mut statuses = self.statuses.write().await;
        match statuses.get_mut(&status.machine_id) {
            Some(entry) => {
                *entry = status.clone();
                true
            }
            None => false,
        }
    }

    pub async fn status(&self, id: MachineId) -> Option<MachineStatus> {
        self.statuses.read().await.get(&id).cloned()
    }

    /// All snapshots ordered by machine id
    pub async fn statuses(&self) -> Vec<MachineStatus> {
        let mut statuses: Vec<MachineStatus> = self.statuses.read().await.values().cloned().collect();
        statuses.sort_by_key(|status| status.machine_id);
        statuses
    }

    pub async fn connected_statuses(&self) -> Vec<MachineStatus> {
        let mut statuses = self.statuses().await;
        statuses.retain(MachineStatus::is_connected);
        statuses
    }

    pub async fn set_active_alarms(&self, id: MachineId, numbers: Vec<u16>) {
        if let Some(entry) = self.active_alarms.write().await.get_mut(&id) {
            *entry = numbers;
        }
    }

    /// Tracked alarm numbers of a machine
    pub async fn active_alarm_numbers(&self, id: MachineId) -> Vec<u16> {
        self.active_alarms.read().await.get(&id).cloned().unwrap_or_default()
    }

    pub async fn replace_catalog(&self, catalog: AlarmCatalog) {
        *self.catalog.write().await = catalog;
    }

    pub async fn alarm_definition(&self, number: u16) -> Option<AlarmDefinition> {
        self.catalog.read().await.get(number).cloned()
    }

    pub async fn alarm_text(&self, number: u16) -> String {
        self.catalog.read().await.text_for(number)
    }

    /// Known definitions of the machine's tracked alarms, most severe first
    pub async fn active_alarm_definitions(&self, id: MachineId) -> Vec<AlarmDefinition> {
        let numbers = self.active_alarm_numbers(id).await;
        self.catalog.read().await.sorted_definitions(&numbers)
    }

    /// Drop every machine entry
    pub async fn clear(&self) {
        self.statuses.write().await.clear();
        self.active_alarms.write().await.clear();
    }
}
