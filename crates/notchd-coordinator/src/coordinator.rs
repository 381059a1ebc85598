//! State coordinator: the single writer of the display mode.
//!
//! Every input (signal, hold, timer arm, reversion tick) goes through one
//! unbounded queue drained by one event-loop task. The task owns the
//! snapshot, cooldowns, holds and the reversion timer; callers only hold a
//! cheap cloneable [`Coordinator`] handle.
//!
//! Per input the loop:
//!
//! 1. Folds it into a new snapshot version (out-of-order signals are dropped).
//! 2. Resolves the proposed mode and runs admission.
//! 3. On acceptance records the cooldown, publishes the mode and notifies
//!    subscribers.
//! 4. Reconciles the single reversion timer to the resolver's revisit point.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use notchd_core::admission::{Admission, admit};
use notchd_core::config::NotchConfig;
use notchd_core::cooldown::CooldownState;
use notchd_core::resolver::{ModeResolver, TransitionRequest};
use notchd_core::snapshot::{SignalSnapshot, Stamp};
use notchd_core::types::{ActiveHold, DisplayMode, ExpandedPane, SignalEvent, TriggerKind, WidgetId};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::timer::{ReversionTimer, now};

thread_local! {
    /// Set while subscriber callbacks run on this thread.
    static IN_DISPATCH: Cell<bool> = const { Cell::new(false) };
}

// ─── Public types ────────────────────────────────────────────────

/// Published on every actual mode change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeChange {
    pub from: DisplayMode,
    pub to: DisplayMode,
    pub trigger: TriggerKind,
    pub reason: &'static str,
    /// Holds dropped because an overriding trigger took the overlay.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub superseded_holds: Vec<WidgetId>,
    /// 1-based count of published changes.
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubscriptionId(u64);

pub type Observer = Arc<dyn Fn(&ModeChange) + Send + Sync>;

/// Point-in-time copy of the coordinator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    pub accepted: u64,
    pub rejected_by_hold: u64,
    pub rejected_by_cooldown: u64,
    pub dropped_signals: u64,
    pub deferred_submits: u64,
    pub timers_scheduled: u64,
    pub timers_cancelled: u64,
    pub timers_fired: u64,
}

impl CoordinatorStats {
    /// Reversion timers currently pending. Never more than one.
    pub fn live_timers(&self) -> u64 {
        self.timers_scheduled
            .saturating_sub(self.timers_cancelled)
            .saturating_sub(self.timers_fired)
    }
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    rejected_by_hold: AtomicU64,
    rejected_by_cooldown: AtomicU64,
    dropped_signals: AtomicU64,
    deferred_submits: AtomicU64,
    timers_scheduled: AtomicU64,
    timers_cancelled: AtomicU64,
    timers_fired: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CoordinatorStats {
        CoordinatorStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_by_hold: self.rejected_by_hold.load(Ordering::Relaxed),
            rejected_by_cooldown: self.rejected_by_cooldown.load(Ordering::Relaxed),
            dropped_signals: self.dropped_signals.load(Ordering::Relaxed),
            deferred_submits: self.deferred_submits.load(Ordering::Relaxed),
            timers_scheduled: self.timers_scheduled.load(Ordering::Relaxed),
            timers_cancelled: self.timers_cancelled.load(Ordering::Relaxed),
            timers_fired: self.timers_fired.load(Ordering::Relaxed),
        }
    }
}

// ─── Inputs ──────────────────────────────────────────────────────

#[derive(Debug)]
enum Input {
    Signal(SignalEvent),
    Hold { widget: WidgetId, pane: ExpandedPane },
    Release { widget: WidgetId },
    Arm { widget: WidgetId },
    Disarm { widget: WidgetId },
    Revisit { generation: u64 },
    Flush(oneshot::Sender<()>),
}

#[derive(Default)]
struct SubscriberList {
    next_id: u64,
    entries: Vec<(SubscriptionId, Observer)>,
}

type Subscribers = Arc<Mutex<SubscriberList>>;

// ─── Handle ──────────────────────────────────────────────────────

/// Cloneable handle to the coordinator event loop.
///
/// All inputs are non-blocking enqueues. Calls made from inside a
/// subscriber callback are queued behind the current pass.
#[derive(Clone)]
pub struct Coordinator {
    tx: mpsc::UnboundedSender<Input>,
    mode_rx: watch::Receiver<DisplayMode>,
    subscribers: Subscribers,
    counters: Arc<Counters>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Spawn the event loop on the current tokio runtime.
    pub fn spawn(config: NotchConfig) -> Self {
        Self::with_cancel(config, CancellationToken::new())
    }

    /// Spawn with an explicit cancellation token for graceful shutdown.
    pub fn with_cancel(config: NotchConfig, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (mode_tx, mode_rx) = watch::channel(DisplayMode::Idle);
        let subscribers: Subscribers = Arc::default();
        let counters: Arc<Counters> = Arc::default();

        let event_loop = EventLoop {
            rx,
            weak_tx: tx.downgrade(),
            low_battery_threshold: config.low_battery_threshold,
            resolver: ModeResolver::new(config),
            snapshot: SignalSnapshot::default(),
            cooldowns: CooldownState::new(),
            holds: Vec::new(),
            armed: BTreeSet::new(),
            arrival_seq: 0,
            change_seq: 0,
            current: DisplayMode::Idle,
            mode_tx,
            subscribers: Arc::clone(&subscribers),
            timer: None,
            timer_generation: 0,
            counters: Arc::clone(&counters),
            cancel: cancel.clone(),
        };
        tokio::spawn(event_loop.run());

        Self {
            tx,
            mode_rx,
            subscribers,
            counters,
            cancel,
        }
    }

    fn send(&self, input: Input) {
        if IN_DISPATCH.with(Cell::get) {
            Counters::bump(&self.counters.deferred_submits);
            debug!(?input, "coordinator: re-entrant input deferred");
        }
        if self.tx.send(input).is_err() {
            debug!("coordinator: event loop closed, input discarded");
        }
    }

    pub fn submit(&self, event: SignalEvent) {
        self.send(Input::Signal(event));
    }

    /// Last published mode.
    pub fn current(&self) -> DisplayMode {
        *self.mode_rx.borrow()
    }

    /// Async view of the published mode.
    pub fn watch(&self) -> watch::Receiver<DisplayMode> {
        self.mode_rx.clone()
    }

    /// Register `observer`, called once per actual mode change on the
    /// event-loop task.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ModeChange) + Send + Sync + 'static,
    {
        let mut list = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        list.next_id += 1;
        let id = SubscriptionId(list.next_id);
        list.entries.push((id, Arc::new(observer)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut list = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = list.entries.len();
        list.entries.retain(|(sid, _)| *sid != id);
        list.entries.len() != before
    }

    /// Pin the overlay expanded on `pane` until released. The most
    /// recent hold decides the pane.
    pub fn request_hold(&self, widget: WidgetId, pane: ExpandedPane) {
        self.send(Input::Hold { widget, pane });
    }

    pub fn release_hold(&self, widget: WidgetId) {
        self.send(Input::Release { widget });
    }

    /// Allow one `TimerFired` for `widget`.
    pub fn arm_timer(&self, widget: WidgetId) {
        self.send(Input::Arm { widget });
    }

    pub fn disarm_timer(&self, widget: WidgetId) {
        self.send(Input::Disarm { widget });
    }

    /// Resolves once every input enqueued before this call (and anything
    /// those inputs enqueued in turn) has been processed.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(Input::Flush(tx));
        let _ = rx.await;
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.counters.snapshot()
    }

    /// Stop the event loop and drop any pending reversion timer.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ─── Event loop ──────────────────────────────────────────────────

struct EventLoop {
    rx: mpsc::UnboundedReceiver<Input>,
    /// Timers hold a weak sender so they never keep the loop alive.
    weak_tx: mpsc::WeakUnboundedSender<Input>,
    low_battery_threshold: u8,
    resolver: ModeResolver,
    snapshot: SignalSnapshot,
    cooldowns: CooldownState,
    /// Active holds; the last entry is the most recent.
    holds: Vec<ActiveHold>,
    armed: BTreeSet<WidgetId>,
    arrival_seq: u64,
    change_seq: u64,
    current: DisplayMode,
    mode_tx: watch::Sender<DisplayMode>,
    subscribers: Subscribers,
    timer: Option<ReversionTimer>,
    timer_generation: u64,
    counters: Arc<Counters>,
    cancel: CancellationToken,
}

impl EventLoop {
    async fn run(mut self) {
        info!("coordinator: event loop started");
        loop {
            tokio::select! {
                input = self.rx.recv() => {
                    match input {
                        Some(input) => self.handle(input),
                        None => {
                            info!("coordinator: all handles dropped, shutting down");
                            break;
                        }
                    }
                }
                _ = self.cancel.cancelled() => {
                    info!("coordinator: cancellation requested, shutting down");
                    break;
                }
            }
        }
        if let Some(timer) = self.timer.take() {
            timer.cancel();
            Counters::bump(&self.counters.timers_cancelled);
        }
    }

    fn next_stamp(&mut self, at: Instant) -> Stamp {
        self.arrival_seq += 1;
        Stamp {
            at,
            seq: self.arrival_seq,
        }
    }

    fn handle(&mut self, input: Input) {
        let at = now();
        match input {
            Input::Signal(event) => self.handle_signal(event, at),
            Input::Hold { widget, pane } => {
                self.holds.retain(|h| h.widget != widget);
                let seq = self.next_stamp(at).seq;
                self.holds.push(ActiveHold { widget, pane, seq });
                debug!(widget = %widget, pane = pane.as_str(), holds = self.holds.len(), "coordinator: hold requested");
                self.sync_active_widget();
                self.resolve_pass(at);
            }
            Input::Release { widget } => {
                let before = self.holds.len();
                self.holds.retain(|h| h.widget != widget);
                if self.holds.len() == before {
                    debug!(widget = %widget, "coordinator: release of unknown hold ignored");
                    return;
                }
                debug!(widget = %widget, holds = self.holds.len(), "coordinator: hold released");
                self.sync_active_widget();
                self.resolve_pass(at);
            }
            Input::Arm { widget } => {
                self.armed.insert(widget);
            }
            Input::Disarm { widget } => {
                self.armed.remove(&widget);
            }
            Input::Revisit { generation } => {
                let current = self
                    .timer
                    .as_ref()
                    .is_some_and(|t| t.generation() == generation);
                if !current {
                    debug!(generation, "coordinator: stale reversion tick ignored");
                    return;
                }
                self.timer = None;
                Counters::bump(&self.counters.timers_fired);
                debug!(generation, "coordinator: reversion tick");
                self.resolve_pass(at);
            }
            Input::Flush(reply) => {
                while let Ok(pending) = self.rx.try_recv() {
                    self.handle(pending);
                }
                let _ = reply.send(());
            }
        }
    }

    fn handle_signal(&mut self, event: SignalEvent, at: Instant) {
        debug!(signal = event.name(), "coordinator: signal received");
        if let SignalEvent::TimerFired { session_id } = &event {
            if !self.armed.contains(session_id) {
                Counters::bump(&self.counters.dropped_signals);
                debug!(session = %session_id, "coordinator: timer fire for unarmed session dropped");
                return;
            }
        }
        let stamp = self.next_stamp(at);
        match self.snapshot.apply(&event, stamp, self.low_battery_threshold) {
            Ok(next) => self.snapshot = next,
            Err(e) => {
                Counters::bump(&self.counters.dropped_signals);
                debug!(signal = event.name(), error = %e, "coordinator: signal dropped");
                return;
            }
        }
        if let SignalEvent::TimerFired { session_id } = &event {
            self.armed.remove(session_id);
        }
        self.resolve_pass(at);
    }

    fn sync_active_widget(&mut self) {
        let owner = self.holds.last().map(|h| h.widget);
        if owner != self.snapshot.active_widget {
            self.snapshot = self.snapshot.with_active_widget(owner);
        }
    }

    fn resolve_pass(&mut self, at: Instant) {
        let hold = self.holds.last().copied();
        let request = self.resolver.resolve(
            &self.snapshot,
            &self.cooldowns,
            self.current,
            hold.as_ref(),
            at,
        );
        let verdict = admit(
            &request,
            self.current,
            hold.is_some(),
            &self.cooldowns,
            self.resolver.config(),
        );
        match verdict {
            Admission::Accepted => self.accept(&request),
            Admission::Unchanged => {}
            Admission::BlockedByHold | Admission::CoolingDown { .. } => {
                let counter = if verdict == Admission::BlockedByHold {
                    &self.counters.rejected_by_hold
                } else {
                    &self.counters.rejected_by_cooldown
                };
                Counters::bump(counter);
                debug!(
                    proposed = %request.proposed,
                    trigger = %request.trigger,
                    verdict = verdict.as_str(),
                    "coordinator: proposal rejected"
                );
            }
        }
        self.reconcile_timer(request.revisit_at);
    }

    fn accept(&mut self, request: &TransitionRequest) {
        let superseded_holds: Vec<WidgetId> = if request.overrides_hold {
            self.holds.drain(..).map(|h| h.widget).collect()
        } else {
            Vec::new()
        };
        if !superseded_holds.is_empty() {
            self.sync_active_widget();
        }

        self.cooldowns.record(request.trigger, request.timestamp);
        let from = self.current;
        self.current = request.proposed;
        self.change_seq += 1;
        self.mode_tx.send_replace(self.current);
        Counters::bump(&self.counters.accepted);

        info!(
            from = %from,
            to = %self.current,
            trigger = %request.trigger,
            reason = request.reason,
            superseded = superseded_holds.len(),
            "coordinator: mode changed"
        );

        let change = ModeChange {
            from,
            to: self.current,
            trigger: request.trigger,
            reason: request.reason,
            superseded_holds,
            sequence: self.change_seq,
        };
        self.dispatch(&change);
    }

    fn dispatch(&self, change: &ModeChange) {
        let observers: Vec<Observer> = {
            let list = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            list.entries.iter().map(|(_, o)| Arc::clone(o)).collect()
        };
        IN_DISPATCH.with(|flag| flag.set(true));
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(change))).is_err() {
                warn!(sequence = change.sequence, "coordinator: subscriber panicked");
            }
        }
        IN_DISPATCH.with(|flag| flag.set(false));
    }

    fn reconcile_timer(&mut self, deadline: Option<Instant>) {
        let unchanged = match (&self.timer, deadline) {
            (Some(timer), Some(deadline)) => timer.deadline() == deadline,
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        if let Some(timer) = self.timer.take() {
            timer.cancel();
            Counters::bump(&self.counters.timers_cancelled);
        }
        let Some(deadline) = deadline else {
            return;
        };
        self.timer_generation += 1;
        let tx = self.weak_tx.clone();
        self.timer = Some(ReversionTimer::schedule(
            deadline,
            self.timer_generation,
            move |generation| {
                if let Some(tx) = tx.upgrade() {
                    let _ = tx.send(Input::Revisit { generation });
                }
            },
        ));
        Counters::bump(&self.counters.timers_scheduled);
        debug!(generation = self.timer_generation, "coordinator: reversion timer scheduled");
    }
}
