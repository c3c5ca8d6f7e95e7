//! Recipe step decoding and theoretical durations
//!
//! A step may combine several operations through its control word. The
//! operations run concurrently on the machine, so a step's theoretical
//! duration is the longest of its active operations, not their sum.

use shared::{decode_text, dosing_flags, drying_parameters, Operation, OperationBits, Recipe, RecipeStep, StepLayout};

use crate::error::{OrchestratorError, OrchestratorResult};

pub const FILL_SECONDS_PER_LITER: f64 = 0.5;
/// Fixed pre-fill of the dosing tank before dissolving
pub const PREFILL_SECONDS: u32 = 60;
pub const DRAIN_SECONDS: u32 = 120;

/// Name shown while the controller reports an empty control word
pub const WAITING_STEP_NAME: &str = "Waiting";
pub const UNDEFINED_STEP_NAME: &str = "Undefined step";

/// Dosing parameters of one step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DosingParameters {
    pub chemical: String,
    pub liters: u16,
    pub flags: u16,
    pub dissolve_secs: u16,
    pub dosing_secs: u16,
}

impl DosingParameters {
    pub fn prefill(&self) -> bool {
        self.flags & (dosing_flags::MACHINE_WATER_PREFILL | dosing_flags::CLEAN_WATER_PREFILL) != 0
    }

    pub fn tank1(&self) -> bool {
        self.flags & dosing_flags::TANK1_DOSING != 0
    }

    pub fn seconds(&self) -> u32 {
        let mut secs = u32::from(self.dissolve_secs);
        if self.prefill() {
            secs += PREFILL_SECONDS;
        }
        if self.tank1() {
            secs += u32::from(self.dosing_secs);
        }
        secs
    }
}

/// Decoded parameter words of one step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepParameters {
    pub control_word: u16,
    pub fill_liters: u16,
    pub heating_minutes: u16,
    pub run_minutes: u16,
    pub squeeze_minutes: u16,
    pub dosing: DosingParameters,
}

impl StepParameters {
    /// Decode `words` according to `layout`
    ///
    /// # Panics
    /// Panics when `words` is narrower than the layout; callers validate
    /// recipe widths with [`validate_recipe`] first.
    pub fn decode(words: &[i16], layout: &StepLayout) -> Self {
        let word = |index: usize| words[index] as u16;
        let name_end = layout.chemical_name + layout.chemical_name_words;

        Self {
            control_word: word(layout.control_word),
            fill_liters: word(layout.fill_liters),
            heating_minutes: word(layout.heating_minutes),
            run_minutes: word(layout.run_minutes),
            squeeze_minutes: word(layout.squeeze_minutes),
            dosing: DosingParameters {
                chemical: decode_signed_text(&words[layout.chemical_name..name_end]),
                liters: word(layout.dosing_liters),
                flags: word(layout.dosing_flags),
                dissolve_secs: word(layout.dissolve_seconds),
                dosing_secs: word(layout.dosing_seconds),
            },
        }
    }

    pub fn of_step(step: &RecipeStep, layout: &StepLayout) -> Self {
        Self::decode(&step.words, layout)
    }

    fn operation_seconds(&self, operation: Operation) -> u32 {
        match operation {
            Operation::WaterFill => (f64::from(self.fill_liters) * FILL_SECONDS_PER_LITER) as u32,
            Operation::Dosing => self.dosing.seconds(),
            Operation::Heating => u32::from(self.heating_minutes) * 60,
            Operation::Running => u32::from(self.run_minutes) * 60,
            Operation::Draining => DRAIN_SECONDS,
            Operation::Squeezing => u32::from(self.squeeze_minutes) * 60,
        }
    }

    /// Longest active operation; 0 when no bit is set
    pub fn theoretical_seconds(&self, bits: &OperationBits) -> u32 {
        bits.active(self.control_word)
            .into_iter()
            .map(|operation| self.operation_seconds(operation))
            .max()
            .unwrap_or(0)
    }

    /// Whether starting this step consumes a chemical
    pub fn consumes_chemical(&self, bits: &OperationBits) -> bool {
        self.control_word & bits.dosing != 0 && !self.dosing.chemical.is_empty() && self.dosing.liters > 0
    }
}

fn decode_signed_text(words: &[i16]) -> String {
    let words: Vec<u16> = words.iter().map(|word| *word as u16).collect();
    decode_text(&words)
}

/// Operation names joined with " + ", `None` for an empty control word
pub fn step_name(control_word: u16, bits: &OperationBits) -> Option<String> {
    let operations = bits.active(control_word);
    if operations.is_empty() {
        return None;
    }
    Some(
        operations
            .iter()
            .map(Operation::label)
            .collect::<Vec<_>>()
            .join(" + "),
    )
}

/// Step name for the live screen
pub fn live_step_name(control_word: u16, bits: &OperationBits) -> String {
    step_name(control_word, bits).unwrap_or_else(|| WAITING_STEP_NAME.to_string())
}

/// Reject layouts reaching past their own step width and recipes whose
/// steps are narrower than the layout
pub fn validate_recipe(recipe: &Recipe, layout: &StepLayout) -> OrchestratorResult<()> {
    if !layout.fits() {
        return Err(OrchestratorError::ConfigurationError {
            field: format!(
                "step layout reads word {} but steps are {} words wide",
                layout.highest_word(),
                layout.words_per_step
            ),
        });
    }
    if let Some(step) = recipe
        .steps
        .iter()
        .find(|step| step.words.len() < layout.words_per_step)
    {
        return Err(OrchestratorError::InvalidRecipe {
            reason: format!(
                "step {} of {} has {} words, layout needs {}",
                step.number,
                recipe.name,
                step.words.len(),
                layout.words_per_step
            ),
        });
    }
    Ok(())
}

/// Drying cycle: drying time plus cooling time of the parameter step
pub fn drying_cycle_seconds(recipe: &Recipe) -> OrchestratorResult<u32> {
    let step = recipe
        .steps
        .first()
        .filter(|step| step.words.len() >= drying_parameters::WORDS)
        .ok_or_else(|| OrchestratorError::InvalidRecipe {
            reason: format!("{} carries no drying parameters", recipe.name),
        })?;

    let minutes = u32::from(step.word(drying_parameters::DURATION_MINUTES))
        + u32::from(step.word(drying_parameters::COOLING_MINUTES));
    Ok(minutes * 60)
}
