//! Tests for the JSON file store

use chrono::Utc;
use shared::{
    AlarmDefinition, AlarmHistoryState, BatchEndRecord, BatchSummary, ChemicalConsumption, MachineId, Recipe,
    RecipeStep, StepRecord,
};
use tokio::fs;
use tokio_test::assert_ok;

use super::common::{running_status, temp_store};
use crate::services::file_store::{
    ALARM_DEFINITIONS_FILE, ALARM_HISTORY_FILE, BATCHES_FILE, CHEMICALS_FILE, PROCESS_LOG_FILE, STEPS_FILE,
};
use crate::traits::{AlarmRepository, ProcessLogRepository, ProductionRepository, RecipeRepository};

#[tokio::test]
async fn test_missing_catalog_is_empty() {
    let (store, _dir) = temp_store();

    let definitions = assert_ok!(store.load_definitions().await);

    assert!(definitions.is_empty());
}

#[tokio::test]
async fn test_load_catalog() {
    let (store, _dir) = temp_store();
    let catalog = r#"[
        {"id": 1, "number": 4, "severity": 2, "text": "Door open"},
        {"id": 2, "number": 29, "severity": 5, "text": "Fan overload"}
    ]"#;
    fs::write(store.base_dir().join(ALARM_DEFINITIONS_FILE), catalog).await.unwrap();

    let definitions = assert_ok!(store.load_definitions().await);

    assert_eq!(definitions.len(), 2);
    assert_eq!(definitions[1].text, "Fan overload");
}

#[tokio::test]
async fn test_malformed_catalog_fails() {
    let (store, _dir) = temp_store();
    fs::write(store.base_dir().join(ALARM_DEFINITIONS_FILE), "{not json").await.unwrap();

    assert!(store.load_definitions().await.is_err());
}

#[tokio::test]
async fn test_alarm_history_appends_in_order() {
    let (store, _dir) = temp_store();
    let definition = AlarmDefinition {
        id: 12,
        number: 4,
        severity: 2,
        text: "Door open".to_string(),
    };

    assert_ok!(store.write_alarm_history(MachineId(7), &definition, AlarmHistoryState::Active).await);
    assert_ok!(store.write_alarm_history(MachineId(7), &definition, AlarmHistoryState::Inactive).await);

    let entries = assert_ok!(store.read_entries(ALARM_HISTORY_FILE).await);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["state"], "ACTIVE");
    assert_eq!(entries[1]["state"], "INACTIVE");
    assert_eq!(entries[0]["alarm_id"], 12);
}

#[tokio::test]
async fn test_batch_lifecycle_records() {
    let (store, _dir) = temp_store();
    let status = running_status("B-77");

    assert_ok!(store.start_batch(&status).await);
    assert_ok!(
        store
            .end_batch(&BatchEndRecord {
                machine_id: MachineId(7),
                batch_number: "B-77".to_string(),
                actual_quantity: 350,
                alarm_secs: 30,
                pause_secs: 12,
                downtime_secs: 42,
                theoretical_secs: 5400,
                ended_at: Utc::now(),
            })
            .await
    );
    assert_ok!(
        store
            .update_batch_summary(MachineId(7), "B-77", BatchSummary { water: 10, electricity: 20, steam: 30 })
            .await
    );

    let entries = assert_ok!(store.read_entries(BATCHES_FILE).await);
    let events: Vec<&str> = entries.iter().filter_map(|entry| entry["event"].as_str()).collect();
    assert_eq!(events, vec!["start", "end", "summary"]);
    assert_eq!(entries[0]["recipe_name"], "NAVY");
    assert_eq!(entries[1]["downtime_secs"], 42);
    assert_eq!(entries[2]["steam"], 30);
}

#[tokio::test]
async fn test_step_and_chemical_logs() {
    let (store, _dir) = temp_store();
    let status = running_status("B-77");
    let mut record = StepRecord::open(4, "Heating", 300);
    record.working_secs = Some(330);
    record.deviation_secs = Some(30);

    assert_ok!(store.log_step(&status, &record).await);
    assert_ok!(
        store
            .log_chemical_consumption(
                &status,
                &ChemicalConsumption {
                    step_number: 5,
                    chemical: "ACID".to_string(),
                    liters: 12,
                },
            )
            .await
    );

    let steps = assert_ok!(store.read_entries(STEPS_FILE).await);
    assert_eq!(steps[0]["working"], "00:05:30");
    assert_eq!(steps[0]["deviation"], "+00:00:30");
    assert_eq!(steps[0]["batch_number"], "B-77");

    let chemicals = assert_ok!(store.read_entries(CHEMICALS_FILE).await);
    assert_eq!(chemicals[0]["chemical"], "ACID");
}

#[tokio::test]
async fn test_process_log_modes() {
    let (store, _dir) = temp_store();
    let mut status = running_status("B-77");

    assert_ok!(store.log_recipe_data(&status).await);
    status.recipe_mode = false;
    assert_ok!(store.log_manual_data(&status).await);

    let entries = assert_ok!(store.read_entries(PROCESS_LOG_FILE).await);
    assert_eq!(entries[0]["mode"], "recipe");
    assert_eq!(entries[0]["step_number"], 4);
    assert_eq!(entries[1]["mode"], "manual");
}

#[tokio::test]
async fn test_recipe_lookup_by_name() {
    let (store, _dir) = temp_store();
    let recipe = Recipe::new("NAVY 2/1", vec![RecipeStep::new(1, vec![0; 25])]);

    assert_eq!(assert_ok!(store.recipe_by_name("NAVY 2/1").await), None);

    assert_ok!(store.save_recipe(&recipe).await);
    let loaded = assert_ok!(store.recipe_by_name("NAVY 2/1").await);

    assert_eq!(loaded, Some(recipe));
}
