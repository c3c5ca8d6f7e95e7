//! Per-variant register profile
//!
//! A recipe step is a fixed-width array of signed words. Which word holds the
//! control word, which bit of it means which operation, and where each
//! operation's parameters live are all properties of the controller program,
//! so they are carried as data instead of being baked into the analyzer.

use serde::{Deserialize, Serialize};

use super::MachineType;

/// Operations a recipe step can combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    WaterFill,
    Heating,
    Running,
    Dosing,
    Draining,
    Squeezing,
}

impl Operation {
    /// Display order used when naming a combined step
    pub const ALL: [Operation; 6] = [
        Operation::WaterFill,
        Operation::Heating,
        Operation::Running,
        Operation::Dosing,
        Operation::Draining,
        Operation::Squeezing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Operation::WaterFill => "Water Fill",
            Operation::Heating => "Heating",
            Operation::Running => "Running",
            Operation::Dosing => "Dosing",
            Operation::Draining => "Draining",
            Operation::Squeezing => "Squeezing",
        }
    }
}

/// Control-word bit mask of each operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationBits {
    pub water_fill: u16,
    pub heating: u16,
    pub running: u16,
    pub dosing: u16,
    pub draining: u16,
    pub squeezing: u16,
}

impl Default for OperationBits {
    fn default() -> Self {
        Self {
            water_fill: 1 << 0,
            heating: 1 << 1,
            running: 1 << 2,
            dosing: 1 << 3,
            draining: 1 << 4,
            squeezing: 1 << 5,
        }
    }
}

impl OperationBits {
    pub fn mask(&self, operation: Operation) -> u16 {
        match operation {
            Operation::WaterFill => self.water_fill,
            Operation::Heating => self.heating,
            Operation::Running => self.running,
            Operation::Dosing => self.dosing,
            Operation::Draining => self.draining,
            Operation::Squeezing => self.squeezing,
        }
    }

    /// Operations whose bit is set in `control_word`, in display order
    pub fn active(&self, control_word: u16) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| {
                let mask = self.mask(*op);
                mask != 0 && control_word & mask != 0
            })
            .collect()
    }
}

/// Word offsets inside one recipe step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLayout {
    pub words_per_step: usize,
    pub control_word: usize,
    pub bits: OperationBits,
    pub fill_liters: usize,
    pub heating_temperature: usize,
    pub heating_minutes: usize,
    pub squeeze_minutes: usize,
    pub run_minutes: usize,
    /// First word of the ASCII chemical name
    pub chemical_name: usize,
    pub chemical_name_words: usize,
    pub dosing_flags: usize,
    pub dissolve_seconds: usize,
    pub dosing_liters: usize,
    pub dosing_seconds: usize,
}

impl Default for StepLayout {
    fn default() -> Self {
        Self {
            words_per_step: 25,
            control_word: 24,
            bits: OperationBits::default(),
            fill_liters: 1,
            heating_temperature: 3,
            heating_minutes: 4,
            squeeze_minutes: 9,
            run_minutes: 18,
            chemical_name: 10,
            chemical_name_words: 3,
            dosing_flags: 13,
            dissolve_seconds: 14,
            dosing_liters: 15,
            dosing_seconds: 16,
        }
    }
}

impl StepLayout {
    /// Highest word index any parameter reads
    pub fn highest_word(&self) -> usize {
        [
            self.control_word,
            self.fill_liters,
            self.heating_temperature,
            self.heating_minutes,
            self.squeeze_minutes,
            self.run_minutes,
            (self.chemical_name + self.chemical_name_words).saturating_sub(1),
            self.dosing_flags,
            self.dissolve_seconds,
            self.dosing_liters,
            self.dosing_seconds,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Whether every parameter index lies inside a step
    pub fn fits(&self) -> bool {
        self.highest_word() < self.words_per_step
    }
}

/// Word offsets of the drying parameter block
///
/// Words 0, 1, 3 and 5 hold temperature, humidity, drum rpm and the control
/// word; only the cycle times are interpreted here.
pub mod drying_parameters {
    pub const WORDS: usize = 6;
    pub const DURATION_MINUTES: usize = 2;
    pub const COOLING_MINUTES: usize = 4;
}

/// Bits of the dosing flag word
pub mod dosing_flags {
    pub const MACHINE_WATER_PREFILL: u16 = 1 << 0;
    pub const CLEAN_WATER_PREFILL: u16 = 1 << 1;
    pub const TANK1_DOSING: u16 = 1 << 2;
}

/// Everything that differs between controller programs of one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineProfile {
    /// Added to a non-zero raw alarm number before lookup
    pub alarm_offset: u16,
    pub layout: StepLayout,
}

impl MachineProfile {
    pub fn for_type(machine_type: MachineType) -> Self {
        match machine_type {
            MachineType::Dyeing => Self {
                alarm_offset: 0,
                layout: StepLayout::default(),
            },
            MachineType::Drying => Self {
                alarm_offset: 25,
                layout: StepLayout::default(),
            },
        }
    }

    /// Apply the variant's alarm offset; zero stays zero
    pub fn alarm_number(&self, raw: u16) -> u16 {
        if raw == 0 {
            0
        } else {
            raw.saturating_add(self.alarm_offset)
        }
    }
}
