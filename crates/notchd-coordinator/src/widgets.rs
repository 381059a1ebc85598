//! Widget session manager.
//!
//! Owns the live widget sessions and drives them against the coordinator:
//! opening a pinning session requests a hold, countdown sessions arm their
//! timer, closing releases both. Sessions superseded by an overriding
//! trigger are closed when the coordinator reports them.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use notchd_core::config::NotchConfig;
use notchd_core::error::NotchError;
use notchd_core::session::{SessionAction, SessionView, WidgetSession};
use notchd_core::types::{SignalEvent, WidgetId, WidgetKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coordinator::{Coordinator, ModeChange, SubscriptionId};
use crate::timer::now;

/// Terminal sessions kept for inspection before pruning.
const RETAINED_TERMINAL: usize = 32;

#[derive(Debug, Default)]
struct SessionTable {
    sessions: BTreeMap<WidgetId, WidgetSession>,
    next_id: u64,
}

impl SessionTable {
    fn allocate(&mut self) -> WidgetId {
        self.next_id += 1;
        WidgetId(self.next_id)
    }

    /// Ids are never reused, so anything below the counter existed once.
    fn was_issued(&self, id: WidgetId) -> bool {
        id.0 >= 1 && id.0 <= self.next_id
    }

    fn live_of(&self, kind: WidgetKind) -> Option<WidgetId> {
        self.sessions
            .values()
            .find(|s| s.kind == kind && s.state.is_live())
            .map(|s| s.id)
    }

    fn prune(&mut self) {
        let terminal: Vec<WidgetId> = self
            .sessions
            .values()
            .filter(|s| s.state.is_terminal())
            .map(|s| s.id)
            .collect();
        let excess = terminal.len().saturating_sub(RETAINED_TERMINAL);
        for id in terminal.into_iter().take(excess) {
            self.sessions.remove(&id);
        }
    }
}

struct Inner {
    coordinator: Coordinator,
    config: NotchConfig,
    table: Mutex<SessionTable>,
}

impl Inner {
    fn table(&self) -> MutexGuard<'_, SessionTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the coordinator-side resources of a session.
    fn release(&self, id: WidgetId) {
        self.coordinator.release_hold(id);
        self.coordinator.disarm_timer(id);
    }

    fn on_mode_change(&self, change: &ModeChange) {
        if change.superseded_holds.is_empty() {
            return;
        }
        let at = now();
        let mut closed = Vec::new();
        {
            let mut table = self.table();
            for id in &change.superseded_holds {
                let Some(session) = table.sessions.get_mut(id) else {
                    continue;
                };
                if let Some(action) = session.close_action() {
                    if session.apply(action, at).is_ok() {
                        self.release(*id);
                        closed.push((*id, session.state));
                    }
                }
            }
            table.prune();
        }
        for (id, state) in closed {
            info!(session = %id, state = %state, trigger = %change.trigger, "widgets: session superseded");
        }
    }
}

pub struct WidgetManager {
    inner: Arc<Inner>,
    subscription: SubscriptionId,
}

impl WidgetManager {
    pub fn new(coordinator: Coordinator, config: NotchConfig) -> Self {
        let inner = Arc::new(Inner {
            coordinator,
            config,
            table: Mutex::new(SessionTable::default()),
        });
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let subscription = inner.coordinator.subscribe(move |change| {
            if let Some(inner) = weak.upgrade() {
                inner.on_mode_change(change);
            }
        });
        Self {
            inner,
            subscription,
        }
    }

    pub fn open(&self, kind: WidgetKind) -> Result<WidgetSession, NotchError> {
        self.open_at(kind, now())
    }

    /// Open a session of `kind`. Fails with `AlreadyOpen` when `kind` is
    /// exclusive and a live session of it exists.
    pub fn open_at(&self, kind: WidgetKind, at: Instant) -> Result<WidgetSession, NotchError> {
        let session = {
            let mut table = self.inner.table();
            if self.inner.config.is_exclusive(kind) {
                if let Some(existing) = table.live_of(kind) {
                    return Err(NotchError::AlreadyOpen { kind, existing });
                }
            }
            let id = table.allocate();
            let session = WidgetSession::new(id, kind, at, &self.inner.config);
            table.sessions.insert(id, session.clone());
            session
        };

        if session.countdown.is_some() {
            self.inner.coordinator.arm_timer(session.id);
        }
        if session.pins_expanded {
            self.inner.coordinator.request_hold(session.id, kind.pane());
        }
        info!(session = %session.id, kind = %kind, pins = session.pins_expanded, "widgets: session opened");
        Ok(session)
    }

    /// Advance countdowns and auto-close timeouts to `at`.
    ///
    /// Returns the sessions whose countdown finished on this tick.
    pub fn tick(&self, at: Instant) -> Vec<WidgetId> {
        let mut finished = Vec::new();
        let mut expired = Vec::new();
        {
            let mut table = self.inner.table();
            for session in table.sessions.values_mut() {
                if session.countdown_due(at) {
                    if session.apply(SessionAction::Finish, at).is_ok() {
                        // Enqueued under the table lock so a concurrent close
                        // cannot release the hold before it is re-requested.
                        self.inner
                            .coordinator
                            .submit(SignalEvent::TimerFired { session_id: session.id });
                        if session.pins_expanded {
                            // Bring the finished session's pane to the front.
                            self.inner
                                .coordinator
                                .request_hold(session.id, session.kind.pane());
                        }
                        finished.push(session.id);
                    }
                } else if session.auto_close_due(at) {
                    expired.push(session.id);
                }
            }
        }

        for id in &finished {
            info!(session = %id, "widgets: countdown finished");
        }
        for id in expired {
            debug!(session = %id, "widgets: auto-closing idle editor");
            let _ = self.close_at(id, at);
        }
        finished
    }

    /// Close a session: Running is cancelled, Finished is dismissed.
    /// Closing an already-closed session only re-sends the release.
    pub fn close(&self, id: WidgetId) -> Result<(), NotchError> {
        self.close_at(id, now())
    }

    pub fn close_at(&self, id: WidgetId, at: Instant) -> Result<(), NotchError> {
        let mut table = self.inner.table();
        let Some(session) = table.sessions.get_mut(&id) else {
            if !table.was_issued(id) {
                return Err(NotchError::UnknownSession(id));
            }
            self.inner.release(id);
            return Ok(());
        };
        let Some(action) = session.close_action() else {
            // Already terminal; release again in case a hold outlived it.
            self.inner.release(id);
            return Ok(());
        };
        let state = session.apply(action, at)?;
        self.inner.release(id);
        table.prune();
        drop(table);

        info!(session = %id, state = %state, "widgets: session closed");
        Ok(())
    }

    /// Cancel a running session. Fails if it is not running.
    pub fn cancel(&self, id: WidgetId) -> Result<(), NotchError> {
        self.transition(id, SessionAction::Cancel)
    }

    /// Acknowledge a finished session. Fails if it has not finished.
    pub fn dismiss(&self, id: WidgetId) -> Result<(), NotchError> {
        self.transition(id, SessionAction::Dismiss)
    }

    fn transition(&self, id: WidgetId, action: SessionAction) -> Result<(), NotchError> {
        let at = now();
        let state = {
            let mut table = self.inner.table();
            let session = table
                .sessions
                .get_mut(&id)
                .ok_or(NotchError::UnknownSession(id))?;
            let state = session.apply(action, at)?;
            self.inner.release(id);
            table.prune();
            state
        };
        info!(session = %id, state = %state, "widgets: session {action}");
        Ok(())
    }

    pub fn get(&self, id: WidgetId) -> Option<WidgetSession> {
        self.inner.table().sessions.get(&id).cloned()
    }

    pub fn sessions(&self) -> Vec<WidgetSession> {
        self.inner.table().sessions.values().cloned().collect()
    }

    pub fn views(&self, at: Instant) -> Vec<SessionView> {
        self.inner
            .table()
            .sessions
            .values()
            .map(|s| s.view(at))
            .collect()
    }

    /// Run `tick` every configured interval until `cancel` fires.
    pub fn spawn_ticker(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = manager.inner.config.tick_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        manager.tick(now());
                    }
                    _ = cancel.cancelled() => {
                        debug!("widgets: ticker stopped");
                        break;
                    }
                }
            }
        })
    }
}

impl Drop for WidgetManager {
    fn drop(&mut self) {
        self.inner.coordinator.unsubscribe(self.subscription);
    }
}
