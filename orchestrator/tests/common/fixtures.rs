//! Test fixtures and data for orchestrator tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use shared::{AlarmDefinition, MachineConfig, MachineStatus, MachineType, Recipe, RecipeStep};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const DYEING_ID: u32 = 7;
    pub const DRYING_ID: u32 = 8;
    pub const BATCH: &'static str = "B-1001";
    pub const RECIPE: &'static str = "NAVY";

    /// Alarm numbers present in the test catalog
    pub const DOOR_OPEN: u16 = 4;
    pub const LOW_WATER: u16 = 7;

    /// Heating bit of the default control-word layout
    pub const HEATING: u16 = 0b10;

    pub fn dyeing_machine() -> MachineConfig {
        MachineConfig::new(Self::DYEING_ID, "BY-07", MachineType::Dyeing, "10.0.0.7")
    }

    pub fn drying_machine() -> MachineConfig {
        MachineConfig::new(Self::DRYING_ID, "KR-08", MachineType::Drying, "10.0.0.8")
    }

    /// Fixed wall clock `secs` seconds into the test
    pub fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
    }

    pub fn alarm_definitions() -> Vec<AlarmDefinition> {
        vec![
            AlarmDefinition {
                id: 104,
                number: Self::DOOR_OPEN,
                severity: 2,
                text: "Door open".to_string(),
            },
            AlarmDefinition {
                id: 107,
                number: Self::LOW_WATER,
                severity: 4,
                text: "Low water level".to_string(),
            },
        ]
    }

    /// Step heating for `minutes`
    pub fn heating_step(number: u16, minutes: i16) -> RecipeStep {
        let mut words = vec![0i16; 25];
        words[4] = minutes;
        words[24] = Self::HEATING as i16;
        RecipeStep::new(number, words)
    }

    /// Two heating steps: 300 s and 600 s
    pub fn heating_recipe() -> Recipe {
        Recipe::new(Self::RECIPE, vec![Self::heating_step(1, 5), Self::heating_step(2, 10)])
    }

    /// Drying parameters: 40 min drying plus 5 min cooling
    pub fn drying_parameters() -> Recipe {
        let mut words = vec![0i16; 6];
        words[0] = 80;
        words[2] = 40;
        words[4] = 5;
        Recipe::new("", vec![RecipeStep::new(1, words)])
    }

    /// Device fields of an idle machine in manual mode
    pub fn idle_snapshot() -> MachineStatus {
        MachineStatus {
            manual_mode: true,
            temperature: 25,
            ..Default::default()
        }
    }

    /// Device fields of a machine running `batch` at `step`
    pub fn running_snapshot(batch: &str, step: u16) -> MachineStatus {
        MachineStatus {
            recipe_mode: true,
            in_production: true,
            batch_number: batch.to_string(),
            recipe_name: Self::RECIPE.to_string(),
            step_number: step,
            step_control_word: if step == 0 { 0 } else { Self::HEATING },
            temperature: 60,
            actual_quantity: 420,
            ..Default::default()
        }
    }
}
