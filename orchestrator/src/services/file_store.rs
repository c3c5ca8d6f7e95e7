//! JSON file backed persistence
//!
//! Reference implementation of the persistence collaborators. Definitions
//! and recipes are plain JSON documents, every record the polling core
//! emits is appended as one JSON object per line.
//!
//! ```text
//! <base>/alarms.json            alarm catalog
//! <base>/recipes/<name>.json    named recipes
//! <base>/alarm_history.jsonl
//! <base>/batches.jsonl          batch start / end / summary records
//! <base>/steps.jsonl
//! <base>/chemicals.jsonl
//! <base>/process_log.jsonl
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use shared::{
    AlarmDefinition, AlarmHistoryState, BatchEndRecord, BatchSummary, ChemicalConsumption, MachineId,
    MachineStatus, Recipe, StepRecord,
};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::{AlarmRepository, ProcessLogRepository, ProductionRepository, RecipeRepository};

pub const ALARM_DEFINITIONS_FILE: &str = "alarms.json";
pub const RECIPES_DIR: &str = "recipes";
pub const ALARM_HISTORY_FILE: &str = "alarm_history.jsonl";
pub const BATCHES_FILE: &str = "batches.jsonl";
pub const STEPS_FILE: &str = "steps.jsonl";
pub const CHEMICALS_FILE: &str = "chemicals.jsonl";
pub const PROCESS_LOG_FILE: &str = "process_log.jsonl";

pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn recipe_path(&self, name: &str) -> PathBuf {
        let file_name: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_dir.join(RECIPES_DIR).join(format!("{file_name}.json"))
    }

    /// Store a named recipe, replacing any previous version
    pub async fn save_recipe(&self, recipe: &Recipe) -> OrchestratorResult<()> {
        let path = self.recipe_path(&recipe.name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        fs::write(&path, serde_json::to_string_pretty(recipe)?).await?;
        debug!(recipe = %recipe.name, "Saved recipe to {}", path.display());
        Ok(())
    }

    /// Every entry of a JSON-lines file, oldest first
    pub async fn read_entries(&self, file_name: &str) -> OrchestratorResult<Vec<Value>> {
        let path = self.base_dir.join(file_name);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(OrchestratorError::from))
            .collect()
    }

    async fn append(&self, file_name: &str, entry: &impl Serialize) -> OrchestratorResult<()> {
        let line = serde_json::to_string(entry)?;
        let write = async {
            fs::create_dir_all(&self.base_dir).await?;
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.base_dir.join(file_name))
                .await?;
            file.write_all(format!("{line}\n").as_bytes()).await?;
            file.flush().await
        };
        write
            .await
            .map_err(|e| OrchestratorError::persistence(file_name, e.to_string()))
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Fields identifying the batch a record belongs to
fn batch_fields(status: &MachineStatus) -> Value {
    json!({
        "machine_id": status.machine_id,
        "machine_name": status.machine_name,
        "batch_number": status.batch_number,
    })
}

fn merge(mut base: Value, extra: Value) -> Value {
    if let (Value::Object(base), Value::Object(extra)) = (&mut base, extra) {
        base.extend(extra);
    }
    base
}

#[async_trait]
impl AlarmRepository for JsonFileStore {
    async fn load_definitions(&self) -> OrchestratorResult<Vec<AlarmDefinition>> {
        let path = self.base_dir.join(ALARM_DEFINITIONS_FILE);
        if !path.exists() {
            debug!("No alarm catalog at {}", path.display());
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_alarm_history(
        &self,
        machine_id: MachineId,
        definition: &AlarmDefinition,
        state: AlarmHistoryState,
    ) -> OrchestratorResult<()> {
        let entry = json!({
            "machine_id": machine_id,
            "alarm_id": definition.id,
            "alarm_number": definition.number,
            "state": state,
            "timestamp": timestamp(),
        });
        self.append(ALARM_HISTORY_FILE, &entry).await
    }
}

#[async_trait]
impl ProductionRepository for JsonFileStore {
    async fn start_batch(&self, status: &MachineStatus) -> OrchestratorResult<()> {
        let entry = merge(
            batch_fields(status),
            json!({
                "event": "start",
                "recipe_name": status.recipe_name,
                "operator_name": status.operator_name,
                "order_number": status.order_number,
                "customer_number": status.customer_number,
                "timestamp": timestamp(),
            }),
        );
        self.append(BATCHES_FILE, &entry).await
    }

    async fn end_batch(&self, record: &BatchEndRecord) -> OrchestratorResult<()> {
        let entry = merge(json!({ "event": "end" }), serde_json::to_value(record)?);
        self.append(BATCHES_FILE, &entry).await
    }

    async fn update_batch_summary(
        &self,
        machine_id: MachineId,
        batch_number: &str,
        summary: BatchSummary,
    ) -> OrchestratorResult<()> {
        let entry = json!({
            "event": "summary",
            "machine_id": machine_id,
            "batch_number": batch_number,
            "water": summary.water,
            "electricity": summary.electricity,
            "steam": summary.steam,
            "timestamp": timestamp(),
        });
        self.append(BATCHES_FILE, &entry).await
    }

    async fn log_step(&self, status: &MachineStatus, record: &StepRecord) -> OrchestratorResult<()> {
        let entry = merge(
            batch_fields(status),
            json!({
                "step_number": record.step_number,
                "step_name": record.name,
                "theoretical": shared::format_duration(u64::from(record.theoretical_secs)),
                "working": record.working_display(),
                "pause": shared::format_duration(u64::from(record.pause_secs)),
                "deviation": record.deviation_display(),
                "skipped": record.skipped,
                "timestamp": timestamp(),
            }),
        );
        self.append(STEPS_FILE, &entry).await
    }

    async fn log_chemical_consumption(
        &self,
        status: &MachineStatus,
        consumption: &ChemicalConsumption,
    ) -> OrchestratorResult<()> {
        let entry = merge(
            batch_fields(status),
            json!({
                "step_number": consumption.step_number,
                "chemical": consumption.chemical,
                "liters": consumption.liters,
                "timestamp": timestamp(),
            }),
        );
        self.append(CHEMICALS_FILE, &entry).await
    }
}

#[async_trait]
impl ProcessLogRepository for JsonFileStore {
    async fn log_recipe_data(&self, status: &MachineStatus) -> OrchestratorResult<()> {
        let entry = merge(
            batch_fields(status),
            json!({
                "mode": "recipe",
                "step_number": status.step_number,
                "temperature": status.temperature,
                "water_level": status.water_level,
                "rpm": status.rpm,
                "process_percentage": status.process_percentage,
                "timestamp": timestamp(),
            }),
        );
        self.append(PROCESS_LOG_FILE, &entry).await
    }

    async fn log_manual_data(&self, status: &MachineStatus) -> OrchestratorResult<()> {
        let entry = json!({
            "mode": "manual",
            "machine_id": status.machine_id,
            "machine_name": status.machine_name,
            "temperature": status.temperature,
            "water_level": status.water_level,
            "rpm": status.rpm,
            "timestamp": timestamp(),
        });
        self.append(PROCESS_LOG_FILE, &entry).await
    }
}

#[async_trait]
impl RecipeRepository for JsonFileStore {
    async fn recipe_by_name(&self, name: &str) -> OrchestratorResult<Option<Recipe>> {
        let path = self.recipe_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}
