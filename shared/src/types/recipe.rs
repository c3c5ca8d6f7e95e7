//! Recipes and per-step production records

use serde::{Deserialize, Serialize};

/// One step of a recipe as stored on the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeStep {
    /// 1-based step number
    pub number: u16,
    pub words: Vec<i16>,
}

impl RecipeStep {
    pub fn new(number: u16, words: Vec<i16>) -> Self {
        Self { number, words }
    }

    /// Raw word at `index`, reinterpreted as unsigned
    ///
    /// # Panics
    /// Panics when `index` is outside the step; step widths are validated
    /// before a recipe reaches the analyzer.
    pub fn word(&self, index: usize) -> u16 {
        self.words[index] as u16
    }
}

/// Decode ASCII text stored low byte first, trimming padding
pub fn decode_text(words: &[u16]) -> String {
    let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
    let text: String = bytes
        .iter()
        .map(|byte| if byte.is_ascii() { *byte as char } else { '\u{FFFD}' })
        .collect();
    text.trim_matches(|c: char| c == '\0' || c == ' ' || c == '\u{FFFD}')
        .to_string()
}

/// Ordered list of steps with a name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub steps: Vec<RecipeStep>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, steps: Vec<RecipeStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Build a recipe from a flat word image of fixed-width steps
    pub fn from_image(name: impl Into<String>, image: &[i16], words_per_step: usize) -> Self {
        let steps = image
            .chunks(words_per_step.max(1))
            .enumerate()
            .map(|(index, words)| RecipeStep::new(index as u16 + 1, words.to_vec()))
            .collect();
        Self::new(name, steps)
    }

    pub fn step(&self, number: u16) -> Option<&RecipeStep> {
        self.steps.iter().find(|step| step.number == number)
    }

    /// Flatten back into a contiguous word image
    pub fn image(&self) -> Vec<u16> {
        self.steps
            .iter()
            .flat_map(|step| step.words.iter().map(|word| *word as u16))
            .collect()
    }
}

/// Timing record of one production step within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_number: u16,
    pub name: String,
    pub theoretical_secs: u32,
    /// `None` while the step is still running
    pub working_secs: Option<u32>,
    pub pause_secs: u32,
    /// Net working time minus theoretical time
    pub deviation_secs: Option<i64>,
    pub skipped: bool,
}

impl StepRecord {
    pub fn open(step_number: u16, name: impl Into<String>, theoretical_secs: u32) -> Self {
        Self {
            step_number,
            name: name.into(),
            theoretical_secs,
            working_secs: None,
            pause_secs: 0,
            deviation_secs: None,
            skipped: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.working_secs.is_none()
    }

    /// Working time for display; open steps read "in progress"
    pub fn working_display(&self) -> String {
        match self.working_secs {
            Some(secs) => format_duration(u64::from(secs)),
            None => "in progress".to_string(),
        }
    }

    pub fn deviation_display(&self) -> String {
        self.deviation_secs.map(format_deviation).unwrap_or_default()
    }
}

/// Chemical dosed at the start of a dosing step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemicalConsumption {
    pub step_number: u16,
    pub chemical: String,
    pub liters: u32,
}

/// `hh:mm:ss`, hours are not wrapped at 24
pub fn format_duration(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Signed `hh:mm:ss` with an explicit sign
pub fn format_deviation(secs: i64) -> String {
    let sign = if secs >= 0 { '+' } else { '-' };
    format!("{sign}{}", format_duration(secs.unsigned_abs()))
}
