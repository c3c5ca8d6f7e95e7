//! Batch lifecycle detection and per-batch accounting

use chrono::{DateTime, Utc};
use shared::{BatchEndRecord, MachineId, MachineStatus, StepRecord};

use super::analyzer::{StepAnalyzer, StepSample, StepUpdate};
use super::progress;

/// What a snapshot means for the tracked batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchTransition {
    None,
    /// A new batch number appeared in recipe mode
    Start,
    /// Recipe mode dropped while a batch was tracked
    End,
}

/// Compare a snapshot against the tracked batch number
pub fn detect(tracked: Option<&str>, status: &MachineStatus) -> BatchTransition {
    let number = status.batch_number.trim();
    if status.recipe_mode && !number.is_empty() && tracked != Some(number) {
        return BatchTransition::Start;
    }
    if !status.recipe_mode && tracked.is_some() {
        return BatchTransition::End;
    }
    BatchTransition::None
}

/// State of the batch a machine is running
pub struct ActiveBatch {
    pub number: String,
    pub started_at: DateTime<Utc>,
    pub total_theoretical_secs: u32,
    pub alarm_secs: u32,
    pub pause_secs: u32,
    /// Sub-second remainders not yet credited to the counters above
    alarm_carry_ms: u64,
    pause_carry_ms: u64,
    /// Missing for machine families without step numbers
    analyzer: Option<StepAnalyzer>,
}

impl ActiveBatch {
    /// Batch followed step by step
    pub fn stepped(number: impl Into<String>, analyzer: StepAnalyzer, now: DateTime<Utc>) -> Self {
        Self {
            number: number.into(),
            started_at: now,
            total_theoretical_secs: analyzer.total_theoretical_seconds(),
            alarm_secs: 0,
            pause_secs: 0,
            alarm_carry_ms: 0,
            pause_carry_ms: 0,
            analyzer: Some(analyzer),
        }
    }

    /// Batch timed as one cycle from its start
    pub fn timed(number: impl Into<String>, total_theoretical_secs: u32, now: DateTime<Utc>) -> Self {
        Self {
            number: number.into(),
            started_at: now,
            total_theoretical_secs,
            alarm_secs: 0,
            pause_secs: 0,
            alarm_carry_ms: 0,
            pause_carry_ms: 0,
            analyzer: None,
        }
    }

    pub fn analyzer(&self) -> Option<&StepAnalyzer> {
        self.analyzer.as_ref()
    }

    /// Feed a snapshot to the step analyzer, if any
    pub fn analyze(&mut self, status: &MachineStatus, now: DateTime<Utc>) -> StepUpdate {
        match self.analyzer.as_mut() {
            Some(analyzer) => analyzer.process(StepSample::from(status), now),
            None => StepUpdate::default(),
        }
    }

    /// Add one poll interval to the alarm or pause counter; alarm wins
    ///
    /// Intervals that are not whole seconds are carried over, so a 500 ms
    /// poll credits one second every second tick.
    pub fn count_tick(&mut self, has_alarm: bool, paused: bool, interval_ms: u64) {
        if has_alarm {
            credit(&mut self.alarm_secs, &mut self.alarm_carry_ms, interval_ms);
        } else if paused {
            credit(&mut self.pause_secs, &mut self.pause_carry_ms, interval_ms);
        }
    }

    pub fn progress(&self, now: DateTime<Utc>) -> u8 {
        match &self.analyzer {
            Some(analyzer) => {
                let remaining = analyzer.remaining_theoretical_seconds(analyzer.current_step());
                let completed = self.total_theoretical_secs.saturating_sub(remaining);
                let elapsed = (now - analyzer.current_step_started_at()).num_seconds().max(0) as u64;
                progress::process_percentage(
                    self.total_theoretical_secs,
                    completed,
                    elapsed,
                    analyzer.current_step_theoretical_seconds(),
                )
            }
            None => {
                let elapsed = (now - self.started_at).num_seconds().max(0) as u64;
                progress::cycle_percentage(self.total_theoretical_secs, elapsed)
            }
        }
    }

    /// Close the batch: the trailing step record and the end aggregates
    pub fn close(mut self, machine_id: MachineId, actual_quantity: u32, now: DateTime<Utc>) -> (Option<StepRecord>, BatchEndRecord) {
        let trailing = self.analyzer.as_mut().and_then(|analyzer| analyzer.finish(now));
        let record = BatchEndRecord {
            machine_id,
            batch_number: self.number,
            actual_quantity,
            alarm_secs: self.alarm_secs,
            pause_secs: self.pause_secs,
            downtime_secs: self.alarm_secs.saturating_add(self.pause_secs),
            theoretical_secs: self.total_theoretical_secs,
            ended_at: now,
        };
        (trailing, record)
    }
}

fn credit(secs: &mut u32, carry_ms: &mut u64, interval_ms: u64) {
    let total = carry_ms.saturating_add(interval_ms);
    *carry_ms = total % 1_000;
    let whole = u32::try_from(total / 1_000).unwrap_or(u32::MAX);
    *secs = secs.saturating_add(whole);
}
