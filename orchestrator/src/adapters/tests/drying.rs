//! Drying adapter register map tests

use std::sync::Arc;
use std::time::Duration;

use shared::{MachineId, MachineProfile, MachineType, Recipe, RecipeStep};
use tokio_test::{assert_err, assert_ok};

use super::common::{FakeRegisterBank, Write};
use crate::adapters::drying::drying_map as km;
use crate::adapters::{map, DryingMachineAdapter};
use crate::error::OrchestratorError;
use crate::traits::MachineAdapter;

fn adapter(bank: &Arc<FakeRegisterBank>) -> DryingMachineAdapter<Arc<FakeRegisterBank>> {
    DryingMachineAdapter::new(
        MachineId(2),
        Arc::clone(bank),
        MachineProfile::for_type(MachineType::Drying),
    )
    .with_settle_delay(Duration::ZERO)
}

fn parameters() -> Recipe {
    Recipe::new("DRY-60", vec![RecipeStep::new(1, vec![80, 12, 60, 30, 10, 1])])
}

#[tokio::test]
async fn test_live_status_applies_alarm_offset() {
    let bank = Arc::new(FakeRegisterBank::new());
    bank.set_word(map::ALARM_NUMBER, 4).set_word(map::STEP_NUMBER, 9);

    let status = assert_ok!(adapter(&bank).read_live_status().await);

    assert!(status.has_alarm);
    assert_eq!(status.alarm_number, 29);
    // Drying programs expose no step number
    assert_eq!(status.step_number, 0);
    assert!(status.step_data.is_empty());
}

#[tokio::test]
async fn test_live_status_without_alarm() {
    let bank = Arc::new(FakeRegisterBank::new());

    let status = assert_ok!(adapter(&bank).read_live_status().await);

    assert!(!status.has_alarm);
    assert_eq!(status.alarm_number, 0);
}

#[tokio::test]
async fn test_write_recipe_validates_slot_first() {
    let bank = Arc::new(FakeRegisterBank::new());
    let drying = adapter(&bank);

    for slot in [None, Some(0), Some(21)] {
        let err = assert_err!(drying.write_recipe(&parameters(), slot).await);
        assert!(matches!(err, OrchestratorError::SlotOutOfRange { .. }));
    }
    assert!(bank.writes().is_empty());
}

#[tokio::test]
async fn test_write_recipe_refused_while_running() {
    let bank = Arc::new(FakeRegisterBank::new());
    bank.set_coil(km::coils::RUNNING, true);

    let err = assert_err!(adapter(&bank).write_recipe(&parameters(), Some(3)).await);

    assert!(matches!(err, OrchestratorError::MachineBusy { .. }));
    assert!(bank.writes().is_empty());
}

#[tokio::test]
async fn test_write_recipe_selects_slot_then_loads() {
    let bank = Arc::new(FakeRegisterBank::new());

    assert_ok!(adapter(&bank).write_recipe(&parameters(), Some(3)).await);

    assert_eq!(
        bank.writes(),
        vec![
            Write::Registers(km::SLOT_SELECT, vec![3]),
            Write::Coil(km::coils::LOAD_RECIPE, true),
            Write::Registers(km::PARAMETERS, vec![80, 12, 60, 30, 10, 1]),
        ]
    );
}

#[tokio::test]
async fn test_read_recipe_is_single_parameter_step() {
    let bank = Arc::new(FakeRegisterBank::new());
    bank.set_words(km::PARAMETERS, &[70, 10, 45, 25, 5, 1]);

    let recipe = assert_ok!(adapter(&bank).read_recipe().await);

    assert_eq!(recipe.steps.len(), 1);
    assert_eq!(recipe.steps[0].words, vec![70, 10, 45, 25, 5, 1]);
}

#[tokio::test]
async fn test_name_table_has_twenty_slots() {
    let bank = Arc::new(FakeRegisterBank::new());
    let drying = adapter(&bank);

    assert!(matches!(
        drying.write_recipe_name(21, "X").await,
        Err(OrchestratorError::SlotOutOfRange { slot: 21, min: 1, max: 20 })
    ));
    assert_ok!(drying.write_recipe_name(20, "COTTON").await);

    let names = assert_ok!(drying.read_recipe_names().await);
    assert_eq!(names.get(&20).map(String::as_str), Some("COTTON"));
}

#[tokio::test]
async fn test_unsupported_capabilities() {
    let bank = Arc::new(FakeRegisterBank::new());
    let drying = adapter(&bank);

    assert!(assert_err!(drying.read_operators().await).is_unsupported());
    assert!(assert_err!(drying.read_batch_summary().await).is_unsupported());
    assert!(assert_err!(drying.reset_counters().await).is_unsupported());
    assert!(assert_err!(drying.increment_production_counter().await).is_unsupported());
    assert!(assert_err!(drying.acknowledge_alarm().await).is_unsupported());
}
