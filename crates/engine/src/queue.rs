// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable execution queue.
//!
//! Owns the ordered list of plan-execution requests and enforces the
//! single-active-plan invariant together with [`ExecutionLock`]. Status is
//! re-resolved from scratch on each poll (run record plus task snapshot)
//! rather than patched incrementally, so interleaved polls and pushes
//! converge on the same answer.

use crate::bus::{ChangeBus, StateChange};
use crate::error::EngineError;
use crate::lock::ExecutionLock;
use crate::scheduler::PollTarget;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use usher_backend::{BackendApi, BackendError, ConfirmRequest, RunSummary};
use usher_core::{
    resolve_status, Clock, Config, ExecutionState, IdGen, PlanId, QueueItem, QueueItemId, RunId,
    UnifiedStatus,
};
use usher_storage::{KvStore, StateStore};

/// Where an enqueue request came from.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOrigin {
    /// Workspace root proposed by the caller. Internal artifact paths are
    /// rejected; a usable candidate becomes the learned base workspace.
    pub workspace_candidate: Option<String>,
    pub chat_id: Option<String>,
    pub chat_title: Option<String>,
}

#[derive(Debug, Default)]
struct QueueInner {
    items: Vec<QueueItem>,
    paused: bool,
}

#[derive(Clone)]
pub struct ExecutionQueue<B, S, C, G>
where
    B: BackendApi,
    S: KvStore,
    C: Clock + Clone,
    G: IdGen,
{
    inner: Arc<Mutex<QueueInner>>,
    lock: ExecutionLock<B, S, C>,
    backend: B,
    store: StateStore<S>,
    bus: ChangeBus,
    clock: C,
    ids: G,
    config: Config,
}

impl<B, S, C, G> ExecutionQueue<B, S, C, G>
where
    B: BackendApi,
    S: KvStore,
    C: Clock + Clone,
    G: IdGen,
{
    /// Load the persisted queue and paused flag.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backend: B,
        store: StateStore<S>,
        lock: ExecutionLock<B, S, C>,
        bus: ChangeBus,
        clock: C,
        ids: G,
        config: Config,
    ) -> Result<Self, EngineError> {
        let inner = QueueInner {
            items: store.load_queue()?,
            paused: store.load_queue_paused()?,
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
            lock,
            backend,
            store,
            bus,
            clock,
            ids,
            config,
        })
    }

    /// Snapshot of the queue items for display.
    pub fn items(&self) -> Vec<QueueItem> {
        self.inner.lock().items.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    pub fn set_paused(&self, paused: bool) -> Result<(), EngineError> {
        self.inner.lock().paused = paused;
        self.store.save_queue_paused(paused)?;
        self.bus.publish(StateChange::Queue);
        Ok(())
    }

    /// Add a plan-execution request.
    ///
    /// Rejected while any plan is active (the lock guard is the
    /// serialization point). Re-enqueueing a plan already present is a
    /// no-op returning the existing item id, unless that item failed —
    /// terminal failure allows a retry.
    pub fn enqueue(
        &self,
        plan_id: &PlanId,
        plan_text: &str,
        origin: EnqueueOrigin,
    ) -> Result<QueueItemId, EngineError> {
        let decision = self.lock.can_start_new_plan();
        if let Some(reason) = decision.reason() {
            return Err(EngineError::Blocked {
                reason: reason.to_string(),
            });
        }

        {
            let inner = self.inner.lock();
            if let Some(existing) = inner
                .items
                .iter()
                .find(|i| i.plan_id == *plan_id && i.status != ExecutionState::Failed)
            {
                debug!(plan_id = %plan_id, "plan already queued, not re-adding");
                return Ok(existing.id.clone());
            }
        }

        let base_workspace = self.resolve_base_workspace(origin.workspace_candidate.as_deref())?;

        let mut item = QueueItem::new(
            QueueItemId::new(self.ids.next()),
            plan_id.clone(),
            plan_text,
            self.clock.epoch_ms(),
        );
        item.base_workspace = base_workspace;
        item.chat_id = origin.chat_id.map(Into::into);
        item.chat_title = origin.chat_title;
        let id = item.id.clone();

        info!(plan_id = %plan_id, item_id = %id, "plan enqueued");
        self.persist_with(|inner| inner.items.push(item))?;
        Ok(id)
    }

    /// Capture the base workspace at enqueue time: explicit candidate,
    /// previously learned base, or the configured workspace, in that
    /// order. Staged/run-scratch artifact paths are never accepted.
    fn resolve_base_workspace(
        &self,
        candidate: Option<&str>,
    ) -> Result<Option<String>, EngineError> {
        if let Some(candidate) = candidate {
            if is_artifact_path(candidate) {
                warn!(path = %candidate, "rejecting artifact path as base workspace");
            } else {
                self.store.save_base_workspace(candidate)?;
                return Ok(Some(candidate.to_string()));
            }
        }
        if let Some(learned) = self.store.load_base_workspace()? {
            return Ok(Some(learned));
        }
        Ok(self.config.workspace.clone())
    }

    /// Start the first queued item, if the slot is free.
    ///
    /// Returns the started run id, or `None` when there was nothing to do
    /// (slot held by the lock, queue paused, empty, or an item already in
    /// flight). The lock guard is re-checked here: pending reviews hold
    /// the slot even after the active run went terminal.
    pub async fn start_next_queued(&self) -> Result<Option<RunId>, EngineError> {
        let decision = self.lock.can_start_new_plan();
        if let Some(reason) = decision.reason() {
            debug!(reason = %reason, "slot not free, not starting");
            return Ok(None);
        }
        let item = {
            let mut inner = self.inner.lock();
            if inner.paused || inner.items.iter().any(QueueItem::is_in_flight) {
                return Ok(None);
            }
            let Some(item) = inner
                .items
                .iter_mut()
                .find(|i| i.status == ExecutionState::Queued)
            else {
                return Ok(None);
            };
            item.mark_starting(self.clock.epoch_ms());
            item.clone()
        };
        self.persist()?;
        self.lock.lock_for_plan(&item.plan_id, None)?;
        info!(plan_id = %item.plan_id, item_id = %item.id, "starting plan");

        let confirmed = self
            .backend
            .confirm_plan(&ConfirmRequest {
                plan_id: item.plan_id.clone(),
                workspace: item.base_workspace.clone(),
                mode: self.config.mode.clone(),
                policy: self.config.policy.clone(),
            })
            .await;

        let run_id = match confirmed {
            Ok(outcome) => match outcome.run_id {
                Some(run_id) => Some(run_id),
                // Some backends start asynchronously and only surface the
                // id via the run list.
                None => self.recover_run_id(&item.plan_id).await,
            },
            Err(error) => {
                warn!(plan_id = %item.plan_id, error = %error, "confirm failed");
                self.fail_item(&item.id)?;
                self.lock.force_unlock()?;
                return Err(error.into());
            }
        };

        let Some(run_id) = run_id else {
            warn!(plan_id = %item.plan_id, "confirm returned no run id and none found in run list");
            self.fail_item(&item.id)?;
            self.lock.force_unlock()?;
            return Err(EngineError::RunIdUnresolved {
                plan_id: item.plan_id.as_str().to_string(),
            });
        };

        self.update_item(&item.id, |i| i.mark_running(run_id.clone()))?;
        self.lock.set_active_run(&run_id)?;
        info!(plan_id = %item.plan_id, run_id = %run_id, "plan running");

        // Seed status/review once so a run that finished instantly is
        // routed without waiting for the first poll cycle.
        match self.backend.get_run(&run_id, Some(&item.plan_id)).await {
            Ok(record) => {
                let status = resolve_status(record.status.as_deref(), None);
                let now = self.clock.epoch_ms();
                self.update_item(&item.id, |i| i.apply_status(status, now))?;
                self.route_terminal(&item.plan_id, &run_id, status)?;
            }
            Err(error) => {
                // Right after confirm the record may not be readable yet;
                // the poll cycle settles it either way.
                debug!(run_id = %run_id, error = %error, "seed fetch failed");
            }
        }
        Ok(Some(run_id))
    }

    /// Fall back to the run list when confirm answered without a run id.
    async fn recover_run_id(&self, plan_id: &PlanId) -> Option<RunId> {
        match self.backend.list_runs(self.config.workspace.as_deref()).await {
            Ok(list) => list
                .iter()
                .find(|s| s.plan_id.as_ref() == Some(plan_id))
                .map(|s| s.run_id.clone()),
            Err(error) => {
                debug!(plan_id = %plan_id, error = %error, "run list fallback failed");
                None
            }
        }
    }

    /// Reconcile every non-queued, non-settled item against the backend,
    /// then advance the queue when the slot is free.
    pub async fn poll_queue(&self) -> Result<(), EngineError> {
        let pollable: Vec<QueueItem> = self
            .inner
            .lock()
            .items
            .iter()
            .filter(|i| {
                i.status != ExecutionState::Queued && i.status != ExecutionState::Completed
            })
            .cloned()
            .collect();

        let run_list = if pollable.is_empty() {
            None
        } else {
            match self.backend.list_runs(self.config.workspace.as_deref()).await {
                Ok(list) => Some(list),
                Err(error) => {
                    debug!(error = %error, "run list unavailable this cycle");
                    None
                }
            }
        };

        for item in pollable {
            self.poll_item(&item, run_list.as_deref()).await?;
        }

        self.advance().await;
        Ok(())
    }

    async fn poll_item(
        &self,
        item: &QueueItem,
        run_list: Option<&[RunSummary]>,
    ) -> Result<(), EngineError> {
        let active_plan = self.lock.snapshot().active_plan_id;
        let holds_lock = active_plan.as_ref() == Some(&item.plan_id);

        // Re-resolve the run id against the run list: a stale id (absent
        // remotely while the list holds a different run for this plan)
        // moves the item back to retrying with the refreshed id.
        let run_id = match self.refresh_run_id(item, run_list, holds_lock)? {
            Some(run_id) => run_id,
            None => return Ok(()),
        };

        let record = match self.backend.get_run(&run_id, Some(&item.plan_id)).await {
            Ok(record) => record,
            Err(BackendError::NotFound) => {
                warn!(run_id = %run_id, "run disappeared server-side, failing item");
                self.fail_item(&item.id)?;
                if holds_lock {
                    self.lock.force_unlock()?;
                }
                return Ok(());
            }
            Err(error) => {
                // Transport trouble: leave the item for the next cycle.
                debug!(run_id = %run_id, error = %error, "run fetch failed");
                return Ok(());
            }
        };

        let tasks = match self.backend.get_plan(&item.plan_id).await {
            Ok(detail) => Some(detail.tasks),
            Err(error) => {
                debug!(plan_id = %item.plan_id, error = %error, "task snapshot unavailable");
                None
            }
        };

        let status = resolve_status(record.status.as_deref(), tasks.as_deref());
        let was_terminal = item.is_terminal();
        let now = self.clock.epoch_ms();
        self.update_item(&item.id, |i| i.apply_status(status, now))?;

        if holds_lock && !was_terminal && status.is_terminal() {
            self.route_terminal(&item.plan_id, &run_id, status)?;
        }
        Ok(())
    }

    fn refresh_run_id(
        &self,
        item: &QueueItem,
        run_list: Option<&[RunSummary]>,
        holds_lock: bool,
    ) -> Result<Option<RunId>, EngineError> {
        let listed = run_list.map(|list| {
            (
                item.run_id
                    .as_ref()
                    .is_some_and(|rid| list.iter().any(|s| s.run_id == *rid)),
                list.iter()
                    .find(|s| s.plan_id.as_ref() == Some(&item.plan_id))
                    .map(|s| s.run_id.clone()),
            )
        });

        match (&item.run_id, listed) {
            // Known id still listed (or no list this cycle): keep it.
            (Some(run_id), Some((true, _)) | None) => Ok(Some(run_id.clone())),
            // Stale id: the list holds a different run for this plan.
            (Some(stale), Some((false, Some(fresh)))) if *stale != fresh => {
                warn!(plan_id = %item.plan_id, stale = %stale, fresh = %fresh, "stale run id refreshed");
                self.update_item(&item.id, |i| i.retry_with(fresh.clone()))?;
                if holds_lock {
                    self.lock.set_active_run(&fresh)?;
                }
                Ok(Some(fresh))
            }
            // Absent from the list with no replacement: poll it anyway;
            // the fetch decides between not-found and transient.
            (Some(run_id), Some((false, _))) => Ok(Some(run_id.clone())),
            // No id yet: adopt the plan's listed run when one exists.
            (None, Some((_, Some(fresh)))) => {
                self.update_item(&item.id, |i| i.retry_with(fresh.clone()))?;
                if holds_lock {
                    self.lock.set_active_run(&fresh)?;
                }
                Ok(Some(fresh))
            }
            (None, _) => Ok(None),
        }
    }

    /// Route a terminal status of the locked plan into the lock.
    fn route_terminal(
        &self,
        plan_id: &PlanId,
        run_id: &RunId,
        status: UnifiedStatus,
    ) -> Result<(), EngineError> {
        if !status.is_terminal() {
            return Ok(());
        }
        let active = self.lock.snapshot().active_plan_id;
        if active.as_ref() != Some(plan_id) {
            return Ok(());
        }
        if status.needs_review() {
            self.lock.add_pending_review(run_id)
        } else if status.execution == ExecutionState::Completed {
            self.lock.complete_without_review()
        } else {
            self.lock.force_unlock()
        }
    }

    /// Start the next queued item when nothing is in flight. Errors here
    /// already failed the offending item; the poll cycle itself goes on.
    async fn advance(&self) {
        let ready = {
            let inner = self.inner.lock();
            !inner.paused
                && !inner.items.iter().any(QueueItem::is_in_flight)
                && inner.items.iter().any(|i| i.status == ExecutionState::Queued)
        };
        if !ready {
            return;
        }
        if let Err(error) = self.start_next_queued().await {
            warn!(error = %error, "failed to start next queued plan");
        }
    }

    /// Cancel everything: best-effort remote cancel of the active plan,
    /// release the lock, mark every non-terminal item canceled, and pause
    /// the queue. A bulk cancel never auto-resumes.
    pub async fn cancel_all(&self) -> Result<(), EngineError> {
        info!("canceling all queued work and pausing the queue");
        if let Some(plan_id) = self.lock.snapshot().active_plan_id {
            if let Err(error) = self.backend.cancel_plan_runs(&plan_id).await {
                warn!(plan_id = %plan_id, error = %error, "remote cancel failed, canceling locally");
            }
            self.lock.force_unlock()?;
        }
        let now = self.clock.epoch_ms();
        self.persist_with(|inner| {
            for item in inner.items.iter_mut().filter(|i| !i.is_terminal()) {
                item.mark_canceled(now);
            }
            inner.paused = true;
        })?;
        self.store.save_queue_paused(true)?;
        Ok(())
    }

    /// Drop terminal items, keeping the locked plan's item while reviews
    /// are pending.
    pub fn clear_finished(&self) -> Result<(), EngineError> {
        let lock_state = self.lock.snapshot();
        self.persist_with(|inner| {
            inner.items.retain(|item| {
                !item.is_terminal()
                    || (!lock_state.pending_review_runs.is_empty()
                        && lock_state.active_plan_id.as_ref() == Some(&item.plan_id))
            });
        })
    }

    fn fail_item(&self, id: &QueueItemId) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();
        self.update_item(id, |i| i.mark_failed(now))
    }

    fn update_item(
        &self,
        id: &QueueItemId,
        apply: impl FnOnce(&mut QueueItem),
    ) -> Result<(), EngineError> {
        self.persist_with(|inner| {
            if let Some(item) = inner.items.iter_mut().find(|i| i.id == *id) {
                apply(item);
            }
        })
    }

    fn persist_with(&self, apply: impl FnOnce(&mut QueueInner)) -> Result<(), EngineError> {
        let snapshot = {
            let mut inner = self.inner.lock();
            apply(&mut inner);
            inner.items.clone()
        };
        self.store.save_queue(&snapshot)?;
        self.bus.publish(StateChange::Queue);
        Ok(())
    }

    fn persist(&self) -> Result<(), EngineError> {
        self.persist_with(|_| {})
    }
}

/// Staged/run-scratch artifact paths must never be mistaken for the
/// user's real workspace root: `artifacts/` followed somewhere by a
/// `stages`/`runs` segment or a `stage*` segment.
fn is_artifact_path(path: &str) -> bool {
    let segments: Vec<&str> = path.split(['/', '\\']).filter(|s| !s.is_empty()).collect();
    let Some(artifacts_at) = segments.iter().position(|s| *s == "artifacts") else {
        return false;
    };
    segments[artifacts_at + 1..]
        .iter()
        .any(|s| *s == "stages" || *s == "runs" || s.starts_with("stage"))
}

#[async_trait]
impl<B, S, C, G> PollTarget for ExecutionQueue<B, S, C, G>
where
    B: BackendApi,
    S: KvStore,
    C: Clock + Clone + 'static,
    G: IdGen + 'static,
{
    async fn poll(&self) {
        if let Err(error) = self.poll_queue().await {
            warn!(error = %error, "queue poll failed");
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
