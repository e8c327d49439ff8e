// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Drains the queue into the store of record.
//!
//! A [`SyncController`] owns one queue, one executor and one connectivity
//! monitor. Cycles run on demand, when connectivity comes back, and on an
//! interval while online. At most one cycle runs at a time per controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ps_core::stats::start_of_day;
use ps_core::{
    ClockSource, Enqueued, NewOperation, OfflineOperation, QueueStore, SyncStats, SyncStatus,
    SystemClock, TieredQueue,
};

use super::connectivity::{ConnectivityEvent, ConnectivityMonitor};
use super::executor::{ApplyOutcome, OperationExecutor};
use super::remote::RemoteStore;
use crate::error::{Error, Result};

/// Default time between cycles while online.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Default retention for synced operations, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Queue shared between the controller and its callers.
pub type SharedQueue<P, F> = Arc<Mutex<TieredQueue<P, F>>>;

/// Controller tuning.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub interval: Duration,
    pub retention_days: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            interval: DEFAULT_SYNC_INTERVAL,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// Outcome of one sync cycle.
///
/// `success` is false only when the cycle did not run because another one
/// was already in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub success: bool,
    /// Operations now `synced`, including skipped ones.
    pub synced: usize,
    pub failed: usize,
    pub abandoned: usize,
    /// Operations marked synced without a remote write.
    pub skipped: usize,
    /// Fallback records moved into the primary queue.
    pub merged: usize,
}

/// Where a submitted operation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Applied directly; nothing was queued.
    Applied,
    Queued(Enqueued),
}

/// Releases the cycle flag when a cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct IntervalTimer {
    token: CancellationToken,
    _task: JoinHandle<()>,
}

/// Sync orchestrator for one queue.
pub struct SyncController<P, F, R> {
    queue: SharedQueue<P, F>,
    executor: OperationExecutor<R>,
    monitor: ConnectivityMonitor,
    settings: SyncSettings,
    clock: Arc<dyn ClockSource>,
    running: AtomicBool,
    timer: std::sync::Mutex<Option<IntervalTimer>>,
}

impl<P, F, R> SyncController<P, F, R>
where
    P: QueueStore + 'static,
    F: QueueStore + 'static,
    R: RemoteStore + 'static,
{
    pub fn new(
        queue: SharedQueue<P, F>,
        executor: OperationExecutor<R>,
        monitor: ConnectivityMonitor,
        settings: SyncSettings,
    ) -> Self {
        SyncController {
            queue,
            executor,
            monitor,
            settings,
            clock: Arc::new(SystemClock),
            running: AtomicBool::new(false),
            timer: std::sync::Mutex::new(None),
        }
    }

    /// Replaces the wall clock used for timestamps and cutoffs.
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn queue(&self) -> &SharedQueue<P, F> {
        &self.queue
    }

    pub fn executor(&self) -> &OperationExecutor<R> {
        &self.executor
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Returns true while a cycle is in progress.
    pub fn is_syncing(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns true while the interval timer is armed.
    pub fn timer_running(&self) -> bool {
        self.timer_slot().is_some()
    }

    /// Captures an operation, applying it right away when online.
    ///
    /// Falls back to the queue when offline or when the direct apply fails.
    pub async fn submit(&self, op: NewOperation) -> Result<SubmitOutcome> {
        op.validate()?;

        if self.monitor.is_online() {
            let unsaved = op.clone().into_operation("unsaved".to_string());
            match self.executor.apply(&unsaved).await {
                Ok(_) => return Ok(SubmitOutcome::Applied),
                Err(e) => {
                    debug!(error = %e, "direct apply failed, queueing operation");
                }
            }
        }

        let enqueued = self.queue.lock().await.enqueue(op)?;
        debug!(id = %enqueued.id, tier = %enqueued.tier, "operation queued");
        Ok(SubmitOutcome::Queued(enqueued))
    }

    /// Runs a cycle now, or fails with [`Error::Offline`].
    pub async fn force_sync(&self, owner_id: &str) -> Result<SyncReport> {
        if !self.monitor.is_online() {
            return Err(Error::Offline);
        }
        self.run_cycle(owner_id).await
    }

    /// Drains the owner's queue once.
    ///
    /// Returns an unsuccessful, empty report if another cycle is running.
    /// Per-operation failures are recorded on the operation and never end
    /// the cycle early.
    pub async fn run_cycle(&self, owner_id: &str) -> Result<SyncReport> {
        let Some(_guard) = CycleGuard::acquire(&self.running) else {
            debug!(owner = owner_id, "sync cycle already running");
            return Ok(SyncReport::default());
        };

        if let Err(e) = self.queue.lock().await.ensure_primary() {
            debug!(owner = owner_id, error = %e, "primary queue still unavailable");
        }
        self.recover_interrupted(owner_id).await;

        let ops = self.queue.lock().await.list_drainable(owner_id)?;
        let mut report = SyncReport {
            success: true,
            ..SyncReport::default()
        };

        for op in &ops {
            self.sync_one(op, &mut report).await;
        }

        let merged = self.queue.lock().await.merge_fallback(owner_id);
        match merged {
            Ok(count) => report.merged = count,
            Err(e) => warn!(owner = owner_id, error = %e, "fallback merge failed"),
        }

        info!(
            owner = owner_id,
            synced = report.synced,
            failed = report.failed,
            abandoned = report.abandoned,
            merged = report.merged,
            "sync cycle complete"
        );
        Ok(report)
    }

    /// Fails operations a previous process left in `syncing`.
    ///
    /// Only called while holding the cycle flag, so no attempt of ours is
    /// in flight.
    async fn recover_interrupted(&self, owner_id: &str) {
        let now = self.clock.now();
        let mut queue = self.queue.lock().await;
        let stuck = match queue.list(owner_id, Some(SyncStatus::Syncing)) {
            Ok(stuck) => stuck,
            Err(e) => {
                debug!(owner = owner_id, error = %e, "could not look for interrupted operations");
                return;
            }
        };
        for op in stuck {
            match queue.mark_failed(&op.id, "interrupted before completion", now) {
                Ok(()) => warn!(id = %op.id, "recovered interrupted operation"),
                Err(e) => warn!(id = %op.id, error = %e, "could not recover interrupted operation"),
            }
        }
    }

    async fn sync_one(&self, op: &OfflineOperation, report: &mut SyncReport) {
        if op.retries_exhausted() {
            let reason = format!(
                "retry limit reached after {} attempts: {}",
                op.retry_count,
                op.error_message.as_deref().unwrap_or("unknown error")
            );
            let marked = self
                .queue
                .lock()
                .await
                .mark_abandoned(&op.id, &reason, self.clock.now());
            match marked {
                Ok(()) => {
                    warn!(id = %op.id, retries = op.retry_count, "operation abandoned");
                    report.abandoned += 1;
                }
                Err(e) => warn!(id = %op.id, error = %e, "could not abandon operation"),
            }
            return;
        }

        let started = self
            .queue
            .lock()
            .await
            .mark_syncing(&op.id, self.clock.now());
        if let Err(e) = started {
            warn!(id = %op.id, error = %e, "could not start operation");
            return;
        }

        let result = self.executor.apply(op).await;

        let now = self.clock.now();
        let mut queue = self.queue.lock().await;
        match result {
            Ok(outcome) => match queue.mark_synced(&op.id, now) {
                Ok(()) => {
                    debug!(id = %op.id, "operation synced");
                    report.synced += 1;
                    if matches!(outcome, ApplyOutcome::Skipped { .. }) {
                        report.skipped += 1;
                    }
                }
                Err(e) => warn!(id = %op.id, error = %e, "could not mark operation synced"),
            },
            Err(apply_err) => {
                let message = apply_err.to_string();
                debug!(id = %op.id, error = %message, "operation failed");
                match queue.mark_failed(&op.id, &message, now) {
                    Ok(()) => report.failed += 1,
                    Err(e) => warn!(id = %op.id, error = %e, "could not mark operation failed"),
                }
            }
        }
    }

    /// Deletes the owner's synced operations older than `older_than_days`
    /// (default: the configured retention).
    pub async fn cleanup(&self, owner_id: &str, older_than_days: Option<u32>) -> Result<usize> {
        let days = older_than_days.unwrap_or(self.settings.retention_days);
        let cutoff = ChronoDuration::try_days(i64::from(days))
            .and_then(|window| self.clock.now().checked_sub_signed(window));
        let Some(cutoff) = cutoff else {
            debug!(owner = owner_id, days, "retention window reaches past any record");
            return Ok(0);
        };
        let deleted = self.queue.lock().await.purge(owner_id, cutoff)?;
        info!(owner = owner_id, days, deleted, "purged synced operations");
        Ok(deleted)
    }

    /// Health summary for the owner's queue.
    pub async fn stats(&self, owner_id: &str) -> Result<SyncStats> {
        let since = start_of_day(self.clock.now());
        let queue = self.queue.lock().await;
        let counts = queue.counts(owner_id, since)?;
        let fallback_pending = queue.fallback_len(owner_id)?;
        Ok(SyncStats::from_counts(counts, fallback_pending))
    }

    /// Runs cycles for `owner_id` on connectivity edges and on the interval.
    ///
    /// If already online, a cycle runs immediately.
    pub fn start(self: &Arc<Self>, owner_id: impl Into<String>) -> ControllerHandle {
        let owner_id = owner_id.into();
        let token = CancellationToken::new();
        let this = Arc::clone(self);
        let loop_token = token.clone();

        let task = tokio::spawn(async move {
            let mut events = this.monitor.subscribe();
            if this.monitor.is_online() {
                this.on_online(&owner_id).await;
            }

            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    event = events.next() => match event {
                        Some(ConnectivityEvent::BecameOnline) => this.on_online(&owner_id).await,
                        Some(ConnectivityEvent::BecameOffline) => {
                            debug!(owner = %owner_id, "offline, pausing interval sync");
                            this.stop_timer();
                        }
                        None => break,
                    },
                }
            }

            this.stop_timer();
            debug!(owner = %owner_id, "sync controller stopped");
        });

        ControllerHandle { token, task }
    }

    async fn on_online(self: &Arc<Self>, owner_id: &str) {
        self.start_timer(owner_id);
        self.run_logged(owner_id).await;
    }

    async fn run_logged(&self, owner_id: &str) {
        if let Err(e) = self.run_cycle(owner_id).await {
            warn!(owner = owner_id, error = %e, "sync cycle failed");
        }
    }

    fn start_timer(self: &Arc<Self>, owner_id: &str) {
        let interval = self.settings.interval;
        let token = CancellationToken::new();
        let this = Arc::clone(self);
        let owner_id = owner_id.to_string();
        let tick_token = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // Cancellation is only observed between cycles
                tokio::select! {
                    _ = tick_token.cancelled() => break,
                    _ = ticker.tick() => this.run_logged(&owner_id).await,
                }
            }
        });

        let previous = self.timer_slot().replace(IntervalTimer { token, _task: task });
        if let Some(previous) = previous {
            previous.token.cancel();
        }
    }

    fn stop_timer(&self) {
        if let Some(timer) = self.timer_slot().take() {
            timer.token.cancel();
        }
    }

    fn timer_slot(&self) -> MutexGuard<'_, Option<IntervalTimer>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a running controller loop.
pub struct ControllerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ControllerHandle {
    /// Stops the loop and the interval timer, waiting for the loop to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
