//! Alarm catalog and per-machine alarm tracking
//!
//! Controllers expose a single alarm register, so several alarms that fire in
//! turn show up as the register changing value. The tracker remembers every
//! number seen recently and expires it once the register has not shown it
//! for the timeout. A zero reading means the operator cleared everything.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use shared::AlarmDefinition;

/// Alarm definitions keyed by alarm number
#[derive(Debug, Clone, Default)]
pub struct AlarmCatalog {
    definitions: HashMap<u16, AlarmDefinition>,
}

impl AlarmCatalog {
    pub fn new(definitions: Vec<AlarmDefinition>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .map(|definition| (definition.number, definition))
                .collect(),
        }
    }

    pub fn get(&self, number: u16) -> Option<&AlarmDefinition> {
        self.definitions.get(&number)
    }

    /// Display text, with a placeholder for numbers missing from the catalog
    pub fn text_for(&self, number: u16) -> String {
        self.get(number)
            .map(|definition| definition.text.clone())
            .unwrap_or_else(|| format!("UNDEFINED ALARM ({number})"))
    }

    /// Known definitions of `numbers`, most severe first, then by number
    pub fn sorted_definitions(&self, numbers: &[u16]) -> Vec<AlarmDefinition> {
        let mut definitions: Vec<AlarmDefinition> = numbers
            .iter()
            .filter_map(|number| self.get(*number).cloned())
            .collect();
        definitions.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.number.cmp(&b.number)));
        definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// What changed on one observation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmChanges {
    /// Number seen for the first time since it was last cleared
    pub raised: Option<u16>,
    /// Numbers not seen for longer than the timeout
    pub expired: Vec<u16>,
    /// Numbers cleared by a zero reading
    pub reset: Vec<u16>,
}

impl AlarmChanges {
    /// Every number that went inactive, expired first
    pub fn cleared(&self) -> impl Iterator<Item = u16> + '_ {
        self.expired.iter().chain(self.reset.iter()).copied()
    }
}

/// Alarm number -> last time the register showed it
#[derive(Debug, Clone)]
pub struct AlarmTracker {
    active: HashMap<u16, DateTime<Utc>>,
    timeout: Duration,
}

impl AlarmTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            active: HashMap::new(),
            timeout,
        }
    }

    pub fn observe(&mut self, alarm_number: u16, now: DateTime<Utc>) -> AlarmChanges {
        let mut changes = AlarmChanges::default();

        if alarm_number != 0 && self.active.insert(alarm_number, now).is_none() {
            changes.raised = Some(alarm_number);
        }

        let timeout = self.timeout;
        changes.expired = self
            .active
            .iter()
            .filter(|(_, last_seen)| now - **last_seen > timeout)
            .map(|(number, _)| *number)
            .collect();
        changes.expired.sort_unstable();
        for number in &changes.expired {
            self.active.remove(number);
        }

        if alarm_number == 0 {
            changes.reset = self.active.drain().map(|(number, _)| number).collect();
            changes.reset.sort_unstable();
        }

        changes
    }

    /// Most recently seen alarm; ties go to the higher number
    pub fn visible(&self) -> Option<u16> {
        self.active
            .iter()
            .max_by_key(|(number, last_seen)| (**last_seen, **number))
            .map(|(number, _)| *number)
    }

    pub fn active_numbers(&self) -> Vec<u16> {
        let mut numbers: Vec<u16> = self.active.keys().copied().collect();
        numbers.sort_unstable();
        numbers
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
