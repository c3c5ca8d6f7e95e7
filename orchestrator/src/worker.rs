//! Per-machine polling worker
//!
//! One worker owns everything that belongs to a single machine: its
//! connection state, active batch, step analyzer and alarm tracker. Other
//! tasks only ever see what the worker publishes to [`SharedState`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    machine_debug, machine_info, machine_warn, AlarmHistoryState, ConnectionState, LiveNotice, MachineConfig,
    MachineEvent, MachineProfile, MachineStatus, NoticeKind, Recipe,
};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::PollingConfig;
use crate::core::batch::{self, ActiveBatch, BatchTransition};
use crate::core::{recipe, AlarmTracker, ConnectionTracker, StepAnalyzer};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::state::{Collaborators, SharedState};
use crate::traits::MachineAdapter;

pub struct MachineWorker {
    machine: MachineConfig,
    profile: MachineProfile,
    adapter: Arc<dyn MachineAdapter>,
    state: SharedState,
    collaborators: Collaborators,
    config: PollingConfig,
    connection: ConnectionTracker,
    alarms: AlarmTracker,
    batch: Option<ActiveBatch>,
    /// Last published snapshot
    status: MachineStatus,
    /// Device round-trips left running after a batch end
    followups: Vec<JoinHandle<()>>,
}

impl MachineWorker {
    pub fn new(
        machine: MachineConfig,
        adapter: Arc<dyn MachineAdapter>,
        state: SharedState,
        collaborators: Collaborators,
        config: PollingConfig,
    ) -> Self {
        Self {
            profile: machine.profile(),
            status: MachineStatus::for_machine(&machine),
            connection: ConnectionTracker::new(config.reconnect_backoff()),
            alarms: AlarmTracker::new(config.alarm_timeout()),
            machine,
            adapter,
            state,
            collaborators,
            config,
            batch: None,
            followups: Vec::new(),
        }
    }

    pub fn status(&self) -> &MachineStatus {
        &self.status
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn active_batch(&self) -> Option<&ActiveBatch> {
        self.batch.as_ref()
    }

    /// Poll until `token` is cancelled
    pub async fn run(mut self, token: CancellationToken) {
        let mut ticker = interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        machine_debug!(self.machine.id, "Polling {} every {:?}", self.machine.endpoint(), self.config.poll_interval());

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.tick(Utc::now()).await,
            }
        }

        self.wait_followups().await;
        machine_debug!(self.machine.id, "Polling stopped");
    }

    /// One poll cycle: reconnect when needed, otherwise read and process
    pub async fn tick(&mut self, now: DateTime<Utc>) {
        self.followups.retain(|handle| !handle.is_finished());

        if self.connection.is_connected() {
            match self.adapter.read_live_status().await {
                Ok(snapshot) => self.process_snapshot(snapshot, now).await,
                Err(err) => self.connection_lost(err, now).await,
            }
        } else {
            self.reconnect(now).await;
        }

        self.publish_status().await;
    }

    /// Wait for detached batch-end device calls
    pub async fn wait_followups(&mut self) {
        for handle in self.followups.drain(..) {
            let _ = handle.await;
        }
    }

    async fn reconnect(&mut self, now: DateTime<Utc>) {
        if !self.connection.should_attempt(now) {
            return;
        }

        self.connection.begin_attempt(now);
        self.set_connection_state(ConnectionState::Connecting).await;

        match self.adapter.connect().await {
            Ok(()) => {
                self.connection.succeeded();
                self.set_connection_state(ConnectionState::Connected).await;
                machine_info!(self.machine.id, "🔌 Connected to {}", self.machine.endpoint());
                self.notice("Communication re-established", NoticeKind::Success);
            }
            Err(err) => {
                self.connection.failed();
                self.set_connection_state(ConnectionState::Disconnected).await;
                machine_debug!(self.machine.id, "Connect to {} failed: {}", self.machine.endpoint(), err);
            }
        }
    }

    async fn connection_lost(&mut self, err: OrchestratorError, now: DateTime<Utc>) {
        machine_warn!(self.machine.id, "⚠️ Live status read failed: {}", err);

        self.connection.lost(now);
        if let Err(err) = self.adapter.disconnect().await {
            machine_debug!(self.machine.id, "Disconnect after failed read: {}", err);
        }
        self.set_connection_state(ConnectionState::ConnectionLost).await;
        self.notice("Communication lost", NoticeKind::Warning);
    }

    async fn set_connection_state(&mut self, state: ConnectionState) {
        self.status.connection_state = state;
        self.status.process_percentage = 0;
        self.state.update_status(&self.status).await;
        self.state.publish(MachineEvent::ConnectionStateChanged {
            machine_id: self.machine.id,
            status: Box::new(self.status.clone()),
        });
    }

    async fn process_snapshot(&mut self, mut snapshot: MachineStatus, now: DateTime<Utc>) {
        snapshot.machine_id = self.machine.id;
        snapshot.machine_name = self.machine.name.clone();
        snapshot.connection_state = ConnectionState::Connected;
        snapshot.step_name = recipe::live_step_name(snapshot.step_control_word, &self.profile.layout.bits);
        snapshot.process_percentage = match &self.batch {
            Some(batch) if snapshot.recipe_mode => batch.progress(now),
            _ => 0,
        };

        self.analyze_steps(&snapshot, now).await;
        self.track_batch(&snapshot, now).await;
        self.track_alarms(&mut snapshot, now).await;

        if let Some(batch) = self.batch.as_mut() {
            batch.count_tick(snapshot.has_alarm, snapshot.paused, self.config.poll_interval_ms);
        }

        let alarm_changed =
            snapshot.has_alarm != self.status.has_alarm || snapshot.alarm_number != self.status.alarm_number;
        self.status = snapshot;

        if alarm_changed {
            self.state.update_status(&self.status).await;
            self.state.publish(MachineEvent::AlarmStateChanged {
                machine_id: self.machine.id,
                status: Box::new(self.status.clone()),
            });
        }
    }

    async fn analyze_steps(&mut self, snapshot: &MachineStatus, now: DateTime<Utc>) {
        if !snapshot.recipe_mode || !snapshot.has_batch() {
            return;
        }
        let Some(batch) = self.batch.as_mut() else {
            return;
        };

        let update = batch.analyze(snapshot, now);
        if update.is_empty() {
            return;
        }

        let context = batch_context(snapshot, &batch.number);
        for record in &update.finalized {
            machine_debug!(
                self.machine.id,
                "Step {} closed: {} worked, {} deviation",
                record.step_number,
                record.working_display(),
                record.deviation_display()
            );
            if let Err(err) = self.collaborators.production.log_step(&context, record).await {
                machine_warn!(self.machine.id, "Step {} not persisted: {}", record.step_number, err);
            }
        }
        if let Some(started) = &update.started {
            machine_debug!(self.machine.id, "Step {} confirmed: {}", started.step_number, started.name);
        }
        if let Some(consumption) = &update.consumption {
            if let Err(err) = self
                .collaborators
                .production
                .log_chemical_consumption(&context, consumption)
                .await
            {
                machine_warn!(self.machine.id, "Chemical consumption not persisted: {}", err);
            }
        }
    }

    async fn track_batch(&mut self, snapshot: &MachineStatus, now: DateTime<Utc>) {
        let tracked = self.batch.as_ref().map(|batch| batch.number.as_str());
        match batch::detect(tracked, snapshot) {
            BatchTransition::None => {}
            BatchTransition::Start => {
                if let Some(previous) = self.batch.take() {
                    self.close_batch(previous, snapshot, now).await;
                }
                self.start_batch(snapshot, now).await;
            }
            BatchTransition::End => {
                if let Some(finished) = self.batch.take() {
                    let number = finished.number.clone();
                    self.close_batch(finished, snapshot, now).await;
                    self.spawn_batch_followup(number);
                }
            }
        }
    }

    async fn start_batch(&mut self, snapshot: &MachineStatus, now: DateTime<Utc>) {
        let number = snapshot.batch_number.trim().to_string();
        machine_info!(self.machine.id, "📦 Batch {} started, recipe '{}'", number, snapshot.recipe_name);

        if let Err(err) = self.collaborators.production.start_batch(snapshot).await {
            machine_warn!(self.machine.id, "Batch {} start not persisted: {}", number, err);
        }

        let batch = match self.load_batch(&number, snapshot, now).await {
            Ok(batch) => batch,
            Err(err) => {
                // Keep the batch tracked so it still gets an end record.
                machine_warn!(self.machine.id, "Batch {} runs without a recipe: {}", number, err);
                ActiveBatch::timed(number, 0, now)
            }
        };
        machine_debug!(self.machine.id, "Batch theoretical time {} s", batch.total_theoretical_secs);
        self.batch = Some(batch);
    }

    async fn load_batch(&self, number: &str, snapshot: &MachineStatus, now: DateTime<Utc>) -> OrchestratorResult<ActiveBatch> {
        if !self.machine.machine_type.tracks_steps() {
            let parameters = self.adapter.read_recipe().await?;
            let total = recipe::drying_cycle_seconds(&parameters)?;
            return Ok(ActiveBatch::timed(number, total, now));
        }

        let recipe = self.batch_recipe(&snapshot.recipe_name).await?;
        let analyzer = StepAnalyzer::new(recipe, self.profile.layout.clone(), self.config.step_debounce(), now)?;
        Ok(ActiveBatch::stepped(number, analyzer, now))
    }

    /// Recipe store first, then the image loaded on the controller
    async fn batch_recipe(&self, name: &str) -> OrchestratorResult<Recipe> {
        let name = name.trim();
        if !name.is_empty() {
            match self.collaborators.recipes.recipe_by_name(name).await {
                Ok(Some(recipe)) => return Ok(recipe),
                Ok(None) => {
                    machine_debug!(self.machine.id, "Recipe '{}' not stored, reading controller image", name);
                }
                Err(err) => {
                    machine_warn!(self.machine.id, "Recipe store lookup failed: {}", err);
                }
            }
        }

        let mut recipe = self.adapter.read_recipe().await?;
        recipe.name = name.to_string();
        Ok(recipe)
    }

    async fn close_batch(&self, batch: ActiveBatch, snapshot: &MachineStatus, now: DateTime<Utc>) {
        let context = batch_context(snapshot, &batch.number);
        let (trailing, record) = batch.close(self.machine.id, snapshot.actual_quantity, now);

        if let Some(step) = trailing {
            if let Err(err) = self.collaborators.production.log_step(&context, &step).await {
                machine_warn!(self.machine.id, "Step {} not persisted: {}", step.step_number, err);
            }
        }
        if let Err(err) = self.collaborators.production.end_batch(&record).await {
            machine_warn!(self.machine.id, "Batch {} end not persisted: {}", record.batch_number, err);
        }

        machine_info!(
            self.machine.id,
            "🏁 Batch {} ended: {} produced, {} s downtime",
            record.batch_number,
            record.actual_quantity,
            record.downtime_secs
        );
    }

    fn spawn_batch_followup(&mut self, batch_number: String) {
        let machine_id = self.machine.id;
        let adapter = Arc::clone(&self.adapter);
        let production = Arc::clone(&self.collaborators.production);

        let handle = tokio::spawn(async move {
            match adapter.read_batch_summary().await {
                Ok(summary) => {
                    if let Err(err) = production.update_batch_summary(machine_id, &batch_number, summary).await {
                        machine_warn!(machine_id, "Batch {} summary not persisted: {}", batch_number, err);
                    }
                }
                Err(err) => log_followup_failure(machine_id, "batch summary", &err),
            }
            if let Err(err) = adapter.increment_production_counter().await {
                log_followup_failure(machine_id, "production counter", &err);
            }
            if let Err(err) = adapter.reset_counters().await {
                log_followup_failure(machine_id, "counter reset", &err);
            }
        });
        self.followups.push(handle);
    }

    async fn track_alarms(&mut self, snapshot: &mut MachineStatus, now: DateTime<Utc>) {
        let changes = self.alarms.observe(snapshot.alarm_number, now);

        if let Some(number) = changes.raised {
            self.alarm_raised(number).await;
        }
        for number in changes.cleared() {
            self.alarm_cleared(number).await;
        }
        if changes.raised.is_some() || !changes.expired.is_empty() || !changes.reset.is_empty() {
            self.state.set_active_alarms(self.machine.id, self.alarms.active_numbers()).await;
        }

        match self.alarms.visible() {
            Some(number) => {
                snapshot.has_alarm = true;
                snapshot.alarm_number = number;
                snapshot.alarm_text = self.state.alarm_text(number).await;
            }
            None => {
                snapshot.has_alarm = false;
                snapshot.alarm_number = 0;
                snapshot.alarm_text.clear();
            }
        }
    }

    async fn alarm_raised(&self, number: u16) {
        let text = self.state.alarm_text(number).await;
        machine_warn!(self.machine.id, "🚨 Alarm {} raised: {}", number, text);

        self.write_alarm_history(number, AlarmHistoryState::Active).await;
        self.state.publish(MachineEvent::AlarmRaised {
            machine_id: self.machine.id,
            alarm_number: number,
            text: text.clone(),
        });
        self.notice(text, NoticeKind::Alarm);
    }

    async fn alarm_cleared(&self, number: u16) {
        let text = self.state.alarm_text(number).await;
        machine_info!(self.machine.id, "Alarm {} cleared", number);

        self.write_alarm_history(number, AlarmHistoryState::Inactive).await;
        self.state.publish(MachineEvent::AlarmCleared {
            machine_id: self.machine.id,
            alarm_number: number,
            text: text.clone(),
        });
        self.notice(format!("{text} - cleared"), NoticeKind::Info);
    }

    /// History needs a catalog entry; unknown numbers are only published
    async fn write_alarm_history(&self, number: u16, state: AlarmHistoryState) {
        let Some(definition) = self.state.alarm_definition(number).await else {
            machine_debug!(self.machine.id, "Alarm {} has no definition, history skipped", number);
            return;
        };
        if let Err(err) = self
            .collaborators
            .alarms
            .write_alarm_history(self.machine.id, &definition, state)
            .await
        {
            machine_warn!(self.machine.id, "Alarm {} {} not persisted: {}", number, state, err);
        }
    }

    fn notice(&self, message: impl Into<String>, kind: NoticeKind) {
        self.state.publish(MachineEvent::Notice(LiveNotice::new(
            Some(self.machine.id),
            self.machine.name.clone(),
            message,
            kind,
        )));
    }

    async fn publish_status(&self) {
        if !self.state.update_status(&self.status).await {
            return;
        }
        self.state.publish(MachineEvent::StatusRefreshed {
            machine_id: self.machine.id,
            status: Box::new(self.status.clone()),
        });
    }
}

/// Snapshot carrying the batch number records belong to
fn batch_context(snapshot: &MachineStatus, batch_number: &str) -> MachineStatus {
    let mut context = snapshot.clone();
    context.batch_number = batch_number.to_string();
    context
}

fn log_followup_failure(machine_id: shared::MachineId, what: &str, err: &OrchestratorError) {
    if err.is_unsupported() {
        machine_debug!(machine_id, "Skipping {}: {}", what, err);
    } else {
        machine_warn!(machine_id, "Batch end {} failed: {}", what, err);
    }
}
