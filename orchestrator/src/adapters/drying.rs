//! Drying machine adapter
//!
//! A drying program runs one parameter set: temperature, humidity, duration,
//! rpm, cooling time and a control word in holding registers 0..=5. Twenty
//! parameter sets are addressed by slot; uploading selects the slot, waits
//! for the program to settle and raises the load coil before writing.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use shared::{
    BatchSummary, MachineId, MachineProfile, MachineStatus, MachineType, PlcOperator, Recipe, RecipeStep,
};

use super::registers::{optional, read_flag, read_paced, read_word, read_words, MAX_READ_WORDS};
use super::{codec, map, read_counters, read_job_texts, read_process_values};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::{MachineAdapter, RegisterClient};

/// Registers only the drying program has
pub mod drying_map {
    pub use shared::drying_parameters::WORDS as PARAMETER_WORDS;

    pub const PARAMETERS: u16 = 0;
    pub const SLOT_SELECT: u16 = 3017;
    pub const SLOTS: u16 = 20;
    pub const NAME_TABLE: u16 = 4000;
    pub const NAME_WORDS: u16 = 6;

    pub mod coils {
        pub const RUNNING: u16 = 1;
        pub const LOAD_RECIPE: u16 = 2;
    }
}

use drying_map as km;

pub struct DryingMachineAdapter<C: RegisterClient> {
    machine_id: MachineId,
    client: C,
    profile: MachineProfile,
    /// Wait between selecting a slot and loading it
    settle: Duration,
}

impl<C: RegisterClient> DryingMachineAdapter<C> {
    pub fn new(machine_id: MachineId, client: C, profile: MachineProfile) -> Self {
        Self {
            machine_id,
            client,
            profile,
            settle: Duration::from_millis(500),
        }
    }

    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    fn unsupported<T>(capability: &str) -> OrchestratorResult<T> {
        Err(OrchestratorError::unsupported(capability, MachineType::Drying))
    }
}

#[async_trait]
impl<C: RegisterClient> MachineAdapter for DryingMachineAdapter<C> {
    fn machine_type(&self) -> MachineType {
        MachineType::Drying
    }

    async fn connect(&self) -> OrchestratorResult<()> {
        self.client.connect().await
    }

    async fn disconnect(&self) -> OrchestratorResult<()> {
        self.client.disconnect().await
    }

    /// Drying programs report no step number, water level or step data
    async fn read_live_status(&self) -> OrchestratorResult<MachineStatus> {
        let client = &self.client;
        let id = self.machine_id;
        let mut status = MachineStatus::default();

        status.step_control_word = read_word(client, map::STEP_CONTROL_WORD).await?;
        status.recipe_mode = read_flag(client, map::coils::RECIPE_MODE).await?;
        status.paused = optional(id, "paused", read_flag(client, map::coils::PAUSED).await);

        let raw_alarm = optional(id, "alarm_number", read_word(client, map::ALARM_NUMBER).await);
        status.alarm_number = self.profile.alarm_number(raw_alarm);
        status.has_alarm = status.alarm_number != 0;

        read_process_values(client, id, &mut status).await;
        read_job_texts(client, id, &mut status).await;
        read_counters(client, &mut status).await?;

        Ok(status)
    }

    async fn read_recipe(&self) -> OrchestratorResult<Recipe> {
        let words = read_words(&self.client, km::PARAMETERS, km::PARAMETER_WORDS as u16).await?;
        let name = optional(
            self.machine_id,
            "recipe_name",
            super::registers::read_text(&self.client, map::RECIPE_NAME, map::TEXT_WORDS).await,
        );

        let step = RecipeStep::new(1, words.into_iter().map(|word| word as i16).collect());
        Ok(Recipe::new(name, vec![step]))
    }

    async fn write_recipe(&self, recipe: &Recipe, slot: Option<u16>) -> OrchestratorResult<()> {
        let slot = slot.unwrap_or(0);
        OrchestratorError::check_slot(slot, 1, km::SLOTS)?;

        let step = recipe.steps.first().ok_or_else(|| OrchestratorError::InvalidRecipe {
            reason: "drying recipe has no parameter step".to_string(),
        })?;
        if step.words.len() < km::PARAMETER_WORDS {
            return Err(OrchestratorError::InvalidRecipe {
                reason: format!(
                    "drying parameters need {} words, got {}",
                    km::PARAMETER_WORDS,
                    step.words.len()
                ),
            });
        }

        if read_flag(&self.client, km::coils::RUNNING).await? {
            return Err(OrchestratorError::MachineBusy {
                operation: "recipe upload".to_string(),
            });
        }

        self.client.write_register(km::SLOT_SELECT, slot).await?;
        tokio::time::sleep(self.settle).await;
        self.client.write_coil(km::coils::LOAD_RECIPE, true).await?;

        let parameters: Vec<u16> = step.words[..km::PARAMETER_WORDS]
            .iter()
            .map(|word| *word as u16)
            .collect();
        self.client.write_registers(km::PARAMETERS, &parameters).await
    }

    async fn read_recipe_names(&self) -> OrchestratorResult<BTreeMap<u16, String>> {
        let words = read_paced(
            &self.client,
            km::NAME_TABLE,
            (km::SLOTS * km::NAME_WORDS) as usize,
            MAX_READ_WORDS,
            Duration::ZERO,
        )
        .await?;

        Ok(words
            .chunks(km::NAME_WORDS as usize)
            .enumerate()
            .filter_map(|(index, entry)| {
                let name = codec::decode_text(entry);
                (!name.is_empty()).then_some((index as u16 + 1, name))
            })
            .collect())
    }

    async fn write_recipe_name(&self, slot: u16, name: &str) -> OrchestratorResult<()> {
        OrchestratorError::check_slot(slot, 1, km::SLOTS)?;
        let address = km::NAME_TABLE + (slot - 1) * km::NAME_WORDS;
        self.client
            .write_registers(address, &codec::encode_text(name, (km::NAME_WORDS * 2) as usize))
            .await
    }

    async fn read_operators(&self) -> OrchestratorResult<Vec<PlcOperator>> {
        Self::unsupported("read_operators")
    }

    async fn read_operator(&self, _slot: u8) -> OrchestratorResult<PlcOperator> {
        Self::unsupported("read_operator")
    }

    async fn write_operator(&self, _operator: &PlcOperator) -> OrchestratorResult<()> {
        Self::unsupported("write_operator")
    }

    async fn read_batch_summary(&self) -> OrchestratorResult<BatchSummary> {
        Self::unsupported("read_batch_summary")
    }

    async fn reset_counters(&self) -> OrchestratorResult<()> {
        Self::unsupported("reset_counters")
    }

    async fn increment_production_counter(&self) -> OrchestratorResult<()> {
        Self::unsupported("increment_production_counter")
    }

    async fn acknowledge_alarm(&self) -> OrchestratorResult<()> {
        Self::unsupported("acknowledge_alarm")
    }
}
