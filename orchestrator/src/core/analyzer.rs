//! Live production-step analyzer
//!
//! Follows the step number a controller reports while a batch runs and turns
//! it into timing records. A new step number is only believed once it has
//! been reported, with a non-zero control word, for the whole debounce
//! window; controllers flicker through intermediate numbers while jumping.
//!
//! The analyzer never performs I/O. `process` returns what happened on a
//! tick and the caller persists it.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use shared::{ChemicalConsumption, MachineStatus, Recipe, StepLayout, StepRecord};

use super::recipe::{self, StepParameters, UNDEFINED_STEP_NAME};
use crate::error::OrchestratorResult;

const SKIPPED_SUFFIX: &str = " (skipped)";

/// The part of a snapshot the analyzer looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSample {
    pub step_number: u16,
    pub control_word: u16,
    pub paused: bool,
}

impl From<&MachineStatus> for StepSample {
    fn from(status: &MachineStatus) -> Self {
        Self {
            step_number: status.step_number,
            control_word: status.step_control_word,
            paused: status.paused,
        }
    }
}

/// Result of one analyzer tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepUpdate {
    /// Closed records in step order: the previous step, then skipped ones
    pub finalized: Vec<StepRecord>,
    /// Record opened for the newly confirmed step
    pub started: Option<StepRecord>,
    pub consumption: Option<ChemicalConsumption>,
}

impl StepUpdate {
    pub fn is_empty(&self) -> bool {
        self.finalized.is_empty() && self.started.is_none() && self.consumption.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingStep {
    number: u16,
    since: DateTime<Utc>,
}

/// Step timing state of one active batch
pub struct StepAnalyzer {
    recipe: Recipe,
    layout: StepLayout,
    debounce: Duration,
    /// Theoretical seconds by step number
    theoretical: BTreeMap<u16, u32>,
    records: Vec<StepRecord>,
    current_step: u16,
    step_started_at: DateTime<Utc>,
    pending: Option<PendingStep>,
    pause_started_at: Option<DateTime<Utc>>,
    paused_secs: i64,
}

impl StepAnalyzer {
    /// Build an analyzer for a batch starting at `now`
    ///
    /// Fails with `InvalidRecipe` when a step is narrower than `layout`, and
    /// with `ConfigurationError` when `layout` reads past its own step width.
    pub fn new(recipe: Recipe, layout: StepLayout, debounce: Duration, now: DateTime<Utc>) -> OrchestratorResult<Self> {
        recipe::validate_recipe(&recipe, &layout)?;

        let theoretical = recipe
            .steps
            .iter()
            .map(|step| {
                let secs = StepParameters::of_step(step, &layout).theoretical_seconds(&layout.bits);
                (step.number, secs)
            })
            .collect();

        Ok(Self {
            recipe,
            layout,
            debounce,
            theoretical,
            records: Vec::new(),
            current_step: 0,
            step_started_at: now,
            pending: None,
            pause_started_at: None,
            paused_secs: 0,
        })
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Confirmed step, 0 before the first confirmation
    pub fn current_step(&self) -> u16 {
        self.current_step
    }

    /// Start of the confirmed step, or of the batch before the first one
    pub fn current_step_started_at(&self) -> DateTime<Utc> {
        self.step_started_at
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn total_theoretical_seconds(&self) -> u32 {
        self.theoretical.values().sum()
    }

    /// Theoretical seconds of every step numbered `from` or later
    pub fn remaining_theoretical_seconds(&self, from: u16) -> u32 {
        self.theoretical.range(from..).map(|(_, secs)| *secs).sum()
    }

    /// Theoretical seconds of the confirmed step, 0 before the first one
    pub fn current_step_theoretical_seconds(&self) -> u32 {
        self.theoretical.get(&self.current_step).copied().unwrap_or(0)
    }

    pub fn process(&mut self, sample: StepSample, now: DateTime<Utc>) -> StepUpdate {
        let mut update = StepUpdate::default();
        self.track_pause(sample.paused, now);

        if sample.step_number == self.current_step {
            self.pending = None;
            return update;
        }

        let pending = match self.pending {
            Some(pending) if pending.number == sample.step_number => pending,
            _ => PendingStep {
                number: sample.step_number,
                since: now,
            },
        };

        if sample.control_word == 0 {
            // The candidate must hold with a live control word for the whole window.
            self.pending = Some(PendingStep { since: now, ..pending });
            return update;
        }

        if pending.number != 0 && now - pending.since >= self.debounce {
            self.pending = None;
            self.confirm(pending.number, sample.control_word, sample.paused, now, &mut update);
        } else {
            self.pending = Some(pending);
        }

        update
    }

    /// Close the running step at batch end
    pub fn finish(&mut self, now: DateTime<Utc>) -> Option<StepRecord> {
        let record = self.finalize_current(now);
        self.current_step = 0;
        self.pending = None;
        self.pause_started_at = None;
        self.paused_secs = 0;
        record
    }

    fn track_pause(&mut self, paused: bool, now: DateTime<Utc>) {
        match (paused, self.pause_started_at) {
            (true, None) => self.pause_started_at = Some(now),
            (false, Some(started)) => {
                self.paused_secs += (now - started).num_seconds();
                self.pause_started_at = None;
            }
            _ => {}
        }
    }

    fn confirm(&mut self, number: u16, live_control_word: u16, paused: bool, now: DateTime<Utc>, update: &mut StepUpdate) {
        let previous = self.current_step;
        if let Some(record) = self.finalize_current(now) {
            update.finalized.push(record);
        }

        // Back-fill only forward jumps that land inside the recipe
        if previous != 0 && number > previous && number <= self.last_recipe_step() {
            for skipped in previous + 1..number {
                let record = self.skipped_record(skipped);
                self.records.push(record.clone());
                update.finalized.push(record);
            }
        }

        self.current_step = number;
        self.step_started_at = now;
        self.paused_secs = 0;
        self.pause_started_at = paused.then_some(now);

        let (record, consumption) = self.open_record(number, live_control_word);
        self.records.push(record.clone());
        update.started = Some(record);
        update.consumption = consumption;
    }

    fn last_recipe_step(&self) -> u16 {
        self.theoretical.keys().next_back().copied().unwrap_or(0)
    }

    fn finalize_current(&mut self, now: DateTime<Utc>) -> Option<StepRecord> {
        if self.current_step == 0 {
            return None;
        }

        if let Some(started) = self.pause_started_at {
            self.paused_secs += (now - started).num_seconds();
            self.pause_started_at = Some(now);
        }

        let working = (now - self.step_started_at).num_seconds().max(0);
        let paused = self.paused_secs.clamp(0, working);

        let record = self.records.iter_mut().rev().find(|record| record.is_open())?;
        record.working_secs = Some(working as u32);
        record.pause_secs = paused as u32;
        record.deviation_secs = Some(working - paused - i64::from(record.theoretical_secs));
        Some(record.clone())
    }

    fn open_record(&self, number: u16, live_control_word: u16) -> (StepRecord, Option<ChemicalConsumption>) {
        let bits = &self.layout.bits;
        let Some(step) = self.recipe.step(number) else {
            let name = recipe::step_name(live_control_word, bits).unwrap_or_else(|| UNDEFINED_STEP_NAME.to_string());
            return (StepRecord::open(number, name, 0), None);
        };

        let params = StepParameters::of_step(step, &self.layout);
        let name = recipe::step_name(params.control_word, bits).unwrap_or_else(|| UNDEFINED_STEP_NAME.to_string());
        let record = StepRecord::open(number, name, params.theoretical_seconds(bits));

        let consumption = params.consumes_chemical(bits).then(|| ChemicalConsumption {
            step_number: number,
            chemical: params.dosing.chemical.clone(),
            liters: u32::from(params.dosing.liters),
        });

        (record, consumption)
    }

    fn skipped_record(&self, number: u16) -> StepRecord {
        let control_word = self
            .recipe
            .step(number)
            .map(|step| step.word(self.layout.control_word))
            .unwrap_or(0);
        let name = recipe::step_name(control_word, &self.layout.bits).unwrap_or_else(|| UNDEFINED_STEP_NAME.to_string());

        StepRecord {
            step_number: number,
            name: format!("{name}{SKIPPED_SUFFIX}"),
            theoretical_secs: self.theoretical.get(&number).copied().unwrap_or(0),
            working_secs: Some(0),
            pause_secs: 0,
            deviation_secs: Some(0),
            skipped: true,
        }
    }
}
