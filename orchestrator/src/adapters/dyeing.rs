//! Dyeing / finishing machine adapter
//!
//! The controller keeps one working recipe as a 98-step image of 25-word
//! steps, a 99-entry recipe name table and a 5-slot operator table. Writes to
//! each table are announced through an arm register first.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use shared::{
    BatchSummary, MachineId, MachineProfile, MachineStatus, MachineType, PlcOperator, Recipe,
};

use super::registers::{optional, read_flag, read_paced, read_text, read_word, read_words, write_paced};
use super::{codec, map, read_counters, read_job_texts, read_process_values};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::{MachineAdapter, RegisterClient};

/// Registers only the dyeing program has
pub mod dyeing_map {
    /// Parameter words of the step being executed
    pub const LIVE_STEP_DATA: u16 = 70;
    pub const RECIPE_IMAGE: u16 = 100;
    pub const RECIPE_STEPS: usize = 98;
    pub const RECIPE_IMAGE_NAME: u16 = 2550;
    pub const RECIPE_IMAGE_NAME_BYTES: usize = 10;
    pub const RECIPE_WRITE_ARM: u16 = 3209;
    pub const OPERATOR_WRITE_ARM: u16 = 3210;
    pub const OPERATOR_READ_REQUEST: u16 = 3211;
    pub const OPERATOR_TABLE: u16 = 3087;
    pub const OPERATOR_SLOTS: u8 = 5;
    pub const NAME_TABLE: u16 = 3212;
    pub const NAME_SLOTS: u16 = 99;
    pub const NAME_WORDS: u16 = 6;
    pub const NAME_WRITE_ARM: u16 = 3813;
    pub const WRITE_CHUNK: usize = 100;
    pub const READ_CHUNK: u16 = 60;
}

use dyeing_map as dm;

pub struct DyeingMachineAdapter<C: RegisterClient> {
    machine_id: MachineId,
    client: C,
    profile: MachineProfile,
    /// Pause between chunks of a bulk transfer
    pacing: Duration,
}

impl<C: RegisterClient> DyeingMachineAdapter<C> {
    pub fn new(machine_id: MachineId, client: C, profile: MachineProfile) -> Self {
        Self {
            machine_id,
            client,
            profile,
            pacing: Duration::from_millis(20),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    fn words_per_step(&self) -> usize {
        self.profile.layout.words_per_step
    }

    fn validate_recipe(&self, recipe: &Recipe) -> OrchestratorResult<()> {
        if recipe.steps.len() != dm::RECIPE_STEPS {
            return Err(OrchestratorError::InvalidRecipe {
                reason: format!("expected {} steps, got {}", dm::RECIPE_STEPS, recipe.steps.len()),
            });
        }
        for step in &recipe.steps {
            if step.number == 0 || step.number as usize > dm::RECIPE_STEPS {
                return Err(OrchestratorError::InvalidRecipe {
                    reason: format!("step number {} outside 1..={}", step.number, dm::RECIPE_STEPS),
                });
            }
            if step.words.len() != self.words_per_step() {
                return Err(OrchestratorError::InvalidRecipe {
                    reason: format!(
                        "step {} has {} words, expected {}",
                        step.number,
                        step.words.len(),
                        self.words_per_step()
                    ),
                });
            }
        }
        Ok(())
    }

    fn image_of(&self, recipe: &Recipe) -> Vec<u16> {
        let width = self.words_per_step();
        let mut image = vec![0u16; dm::RECIPE_STEPS * width];
        for step in &recipe.steps {
            let offset = (step.number as usize - 1) * width;
            for (slot, word) in image[offset..offset + width].iter_mut().zip(&step.words) {
                *slot = *word as u16;
            }
        }
        image
    }
}

#[async_trait]
impl<C: RegisterClient> MachineAdapter for DyeingMachineAdapter<C> {
    fn machine_type(&self) -> MachineType {
        MachineType::Dyeing
    }

    async fn connect(&self) -> OrchestratorResult<()> {
        self.client.connect().await
    }

    async fn disconnect(&self) -> OrchestratorResult<()> {
        self.client.disconnect().await
    }

    async fn read_live_status(&self) -> OrchestratorResult<MachineStatus> {
        let client = &self.client;
        let id = self.machine_id;
        let mut status = MachineStatus::default();

        status.step_control_word = read_word(client, map::STEP_CONTROL_WORD).await?;
        status.step_number = optional(id, "step_number", read_word(client, map::STEP_NUMBER).await);
        status.recipe_mode = read_flag(client, map::coils::RECIPE_MODE).await?;
        status.paused = optional(id, "paused", read_flag(client, map::coils::PAUSED).await);

        let raw_alarm = optional(id, "alarm_number", read_word(client, map::ALARM_NUMBER).await);
        status.alarm_number = self.profile.alarm_number(raw_alarm);
        status.has_alarm = status.alarm_number != 0;

        status.water_level = optional(id, "water_level", read_word(client, map::WATER_LEVEL).await);
        read_process_values(client, id, &mut status).await;
        read_job_texts(client, id, &mut status).await;

        status.water_total = u32::from(read_word(client, map::WATER_TOTAL).await?);
        read_counters(client, &mut status).await?;

        let width = self.words_per_step() as u16;
        status.step_data = read_words(client, dm::LIVE_STEP_DATA, width)
            .await?
            .into_iter()
            .map(|word| word as i16)
            .collect();

        Ok(status)
    }

    async fn read_recipe(&self) -> OrchestratorResult<Recipe> {
        let width = self.words_per_step();
        let image = read_paced(
            &self.client,
            dm::RECIPE_IMAGE,
            dm::RECIPE_STEPS * width,
            dm::READ_CHUNK,
            self.pacing,
        )
        .await?;
        let signed: Vec<i16> = image.into_iter().map(|word| word as i16).collect();

        let name_words = (dm::RECIPE_IMAGE_NAME_BYTES / 2) as u16;
        let name = optional(
            self.machine_id,
            "recipe_image_name",
            read_text(&self.client, dm::RECIPE_IMAGE_NAME, name_words).await,
        );

        Ok(Recipe::from_image(name, &signed, width))
    }

    async fn write_recipe(&self, recipe: &Recipe, _slot: Option<u16>) -> OrchestratorResult<()> {
        self.validate_recipe(recipe)?;
        let image = self.image_of(recipe);

        self.client.write_register(dm::RECIPE_WRITE_ARM, 1).await?;
        write_paced(&self.client, dm::RECIPE_IMAGE, &image, dm::WRITE_CHUNK, self.pacing).await?;
        self.client
            .write_registers(
                dm::RECIPE_IMAGE_NAME,
                &codec::encode_text(&recipe.name, dm::RECIPE_IMAGE_NAME_BYTES),
            )
            .await
    }

    async fn read_recipe_names(&self) -> OrchestratorResult<BTreeMap<u16, String>> {
        let words = read_paced(
            &self.client,
            dm::NAME_TABLE,
            (dm::NAME_SLOTS * dm::NAME_WORDS) as usize,
            dm::READ_CHUNK,
            self.pacing,
        )
        .await?;

        Ok(words
            .chunks(dm::NAME_WORDS as usize)
            .enumerate()
            .filter_map(|(index, entry)| {
                let name = codec::decode_text(entry);
                (!name.is_empty()).then_some((index as u16 + 1, name))
            })
            .collect())
    }

    async fn write_recipe_name(&self, slot: u16, name: &str) -> OrchestratorResult<()> {
        OrchestratorError::check_slot(slot, 1, dm::NAME_SLOTS)?;
        let address = dm::NAME_TABLE + (slot - 1) * dm::NAME_WORDS;

        self.client.write_register(dm::NAME_WRITE_ARM, 1).await?;
        self.client
            .write_registers(address, &codec::encode_text(name, (dm::NAME_WORDS * 2) as usize))
            .await
    }

    async fn read_operators(&self) -> OrchestratorResult<Vec<PlcOperator>> {
        let entry = codec::OPERATOR_WORDS;
        let words = read_words(
            &self.client,
            dm::OPERATOR_TABLE,
            (dm::OPERATOR_SLOTS as usize * entry) as u16,
        )
        .await?;

        Ok(words
            .chunks_exact(entry)
            .enumerate()
            .map(|(slot, entry)| codec::decode_operator(slot as u8, entry))
            .collect())
    }

    async fn read_operator(&self, slot: u8) -> OrchestratorResult<PlcOperator> {
        OrchestratorError::check_slot(u16::from(slot), 0, u16::from(dm::OPERATOR_SLOTS - 1))?;
        let entry = codec::OPERATOR_WORDS as u16;

        // The program copies the requested slot into the table when the
        // request flag is set and the slot's own register is raised.
        self.client.write_register(dm::OPERATOR_READ_REQUEST, 1).await?;
        self.client.write_register(u16::from(slot), 1).await?;

        let words = read_words(&self.client, dm::OPERATOR_TABLE + u16::from(slot) * entry, entry).await?;
        Ok(codec::decode_operator(slot, &words))
    }

    async fn write_operator(&self, operator: &PlcOperator) -> OrchestratorResult<()> {
        OrchestratorError::check_slot(u16::from(operator.slot), 0, u16::from(dm::OPERATOR_SLOTS - 1))?;
        let address = dm::OPERATOR_TABLE + u16::from(operator.slot) * codec::OPERATOR_WORDS as u16;

        self.client.write_register(dm::OPERATOR_WRITE_ARM, 1).await?;
        self.client
            .write_registers(address, &codec::encode_operator(operator))
            .await
    }

    async fn read_batch_summary(&self) -> OrchestratorResult<BatchSummary> {
        Ok(BatchSummary {
            water: u32::from(read_word(&self.client, map::WATER_TOTAL).await?),
            electricity: u32::from(read_word(&self.client, map::ELECTRICITY_TOTAL).await?),
            steam: u32::from(read_word(&self.client, map::STEAM_TOTAL).await?),
        })
    }

    async fn reset_counters(&self) -> OrchestratorResult<()> {
        self.client.write_register(map::DOWNTIME_SECONDS, 0).await?;
        self.client.write_register(map::DEFECTIVE_PRODUCTION, 0).await
    }

    async fn increment_production_counter(&self) -> OrchestratorResult<()> {
        let count = read_word(&self.client, map::TOTAL_PRODUCTION).await?;
        self.client
            .write_register(map::TOTAL_PRODUCTION, count.wrapping_add(1))
            .await
    }

    async fn acknowledge_alarm(&self) -> OrchestratorResult<()> {
        Err(OrchestratorError::unsupported("acknowledge_alarm", MachineType::Dyeing))
    }
}
