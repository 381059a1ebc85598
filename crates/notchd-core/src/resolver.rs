//! Mode resolver: maps one snapshot version to a proposed display mode.
//!
//! Pure and deterministic. The priority order lives in a [`PriorityTable`]
//! (data, built from configuration) and each trigger kind has one probe in
//! [`PROBES`] that reads its candidate mode out of the snapshot. Adding a
//! signal kind means adding a probe and a default rank.
//!
//! Ordering of live candidates:
//!
//! 1. Triggers configured to override holds, while a hold is active.
//! 2. Rank (lower first).
//! 3. Arrival sequence (FIFO: the signal that arrived first wins a tie).
//!
//! A candidate whose trigger is cooling down is skipped unless the overlay
//! already shows it. If it stays live past the cooldown, the cooldown end
//! becomes a revisit point.

use std::time::{Duration, Instant};

use crate::config::NotchConfig;
use crate::cooldown::CooldownState;
use crate::snapshot::{SignalSnapshot, Stamp};
use crate::types::{ActiveHold, ContentKind, DisplayMode, ExpandedPane, TriggerKind};

// ─── Priority Table ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityEntry {
    pub trigger: TriggerKind,
    pub rank: u8,
}

/// Trigger kinds sorted by rank. Equal ranks keep the default order here;
/// FIFO arrival decides between their candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    entries: Vec<PriorityEntry>,
}

impl PriorityTable {
    pub fn from_config(config: &NotchConfig) -> Self {
        let mut entries: Vec<PriorityEntry> = TriggerKind::ALL
            .into_iter()
            .map(|trigger| PriorityEntry {
                trigger,
                rank: config.rank(trigger),
            })
            .collect();
        entries.sort_by_key(|e| e.rank);
        Self { entries }
    }

    pub fn entries(&self) -> &[PriorityEntry] {
        &self.entries
    }

    pub fn rank(&self, trigger: TriggerKind) -> u8 {
        self.entries
            .iter()
            .find(|e| e.trigger == trigger)
            .map_or_else(|| trigger.default_rank(), |e| e.rank)
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::from_config(&NotchConfig::default())
    }
}

// ─── Transition Request ──────────────────────────────────────────

/// What the resolver proposes for one snapshot version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRequest {
    pub proposed: DisplayMode,
    pub trigger: TriggerKind,
    pub reason: &'static str,
    /// Rank of the winning trigger.
    pub priority: u8,
    pub timestamp: Instant,
    /// The winning trigger pre-empts the active hold.
    pub overrides_hold: bool,
    /// Earliest instant the resolution may change without a new event.
    pub revisit_at: Option<Instant>,
}

// ─── Probes ──────────────────────────────────────────────────────

struct ProbeInput<'a> {
    snapshot: &'a SignalSnapshot,
    hold: Option<&'a ActiveHold>,
    now: Instant,
    transient: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    mode: DisplayMode,
    arrived: u64,
    expires_at: Option<Instant>,
    reason: &'static str,
}

type Probe = fn(&ProbeInput<'_>) -> Option<Candidate>;

/// One probe per trigger kind.
const PROBES: [(TriggerKind, Probe); 9] = [
    (TriggerKind::WidgetHold, probe_hold as Probe),
    (TriggerKind::Gesture, probe_gesture as Probe),
    (TriggerKind::TimerAlert, probe_timer_alert as Probe),
    (TriggerKind::BatteryPlugged, probe_battery_plugged as Probe),
    (TriggerKind::BatteryLow, probe_battery_low as Probe),
    (TriggerKind::Music, probe_music as Probe),
    (TriggerKind::Notification, probe_notification as Probe),
    (TriggerKind::Clipboard, probe_clipboard as Probe),
    (TriggerKind::Idle, probe_idle as Probe),
];

fn probe_for(trigger: TriggerKind) -> Probe {
    PROBES
        .iter()
        .find(|(kind, _)| *kind == trigger)
        .map_or(probe_idle as Probe, |(_, probe)| *probe)
}

/// A transient signal is live from its stamp until the window closes.
fn transient(stamp: Option<Stamp>, input: &ProbeInput<'_>) -> Option<(u64, Instant)> {
    let stamp = stamp?;
    let expires_at = stamp.at + input.transient;
    (stamp.at <= input.now && input.now < expires_at).then_some((stamp.seq, expires_at))
}

fn transient_candidate(
    stamp: Option<Stamp>,
    input: &ProbeInput<'_>,
    mode: DisplayMode,
    reason: &'static str,
) -> Option<Candidate> {
    transient(stamp, input).map(|(arrived, expires_at)| Candidate {
        mode,
        arrived,
        expires_at: Some(expires_at),
        reason,
    })
}

fn probe_hold(input: &ProbeInput<'_>) -> Option<Candidate> {
    input.hold.map(|hold| Candidate {
        mode: DisplayMode::Expanded(hold.pane),
        arrived: hold.seq,
        expires_at: None,
        reason: "widget hold",
    })
}

fn probe_gesture(input: &ProbeInput<'_>) -> Option<Candidate> {
    input.snapshot.gesture.map(|g| Candidate {
        mode: DisplayMode::Expanded(g.pane),
        arrived: g.since.seq,
        expires_at: None,
        reason: "user gesture",
    })
}

fn probe_timer_alert(input: &ProbeInput<'_>) -> Option<Candidate> {
    transient_candidate(
        input.snapshot.timer_alert.map(|a| a.fired),
        input,
        DisplayMode::Expanded(ExpandedPane::Timer),
        "timer finished",
    )
}

fn probe_battery_plugged(input: &ProbeInput<'_>) -> Option<Candidate> {
    if !input.snapshot.power.is_charging {
        return None;
    }
    transient_candidate(
        input.snapshot.power.plugged,
        input,
        DisplayMode::Compact(ContentKind::Battery),
        "charger connected",
    )
}

fn probe_battery_low(input: &ProbeInput<'_>) -> Option<Candidate> {
    transient_candidate(
        input.snapshot.power.low,
        input,
        DisplayMode::Compact(ContentKind::Battery),
        "battery low",
    )
}

fn probe_music(input: &ProbeInput<'_>) -> Option<Candidate> {
    let music = &input.snapshot.music;
    music.is_playing.then(|| Candidate {
        mode: DisplayMode::Compact(ContentKind::Music),
        arrived: music.playing_since.map_or(0, |s| s.seq),
        expires_at: None,
        reason: "music playing",
    })
}

fn probe_notification(input: &ProbeInput<'_>) -> Option<Candidate> {
    input.snapshot.notification.as_ref().map(|n| Candidate {
        mode: DisplayMode::Compact(ContentKind::Notification),
        arrived: n.since.seq,
        expires_at: None,
        reason: "notification pending",
    })
}

fn probe_clipboard(input: &ProbeInput<'_>) -> Option<Candidate> {
    transient_candidate(
        input.snapshot.clipboard,
        input,
        DisplayMode::Compact(ContentKind::None),
        "clipboard changed",
    )
}

fn probe_idle(_input: &ProbeInput<'_>) -> Option<Candidate> {
    Some(Candidate {
        mode: DisplayMode::Idle,
        arrived: u64::MAX,
        expires_at: None,
        reason: "nothing live",
    })
}

fn earliest(a: Option<Instant>, b: Instant) -> Option<Instant> {
    Some(a.map_or(b, |a| a.min(b)))
}

// ─── Resolver ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ModeResolver {
    table: PriorityTable,
    config: NotchConfig,
}

impl ModeResolver {
    pub fn new(config: NotchConfig) -> Self {
        Self {
            table: PriorityTable::from_config(&config),
            config,
        }
    }

    pub fn table(&self) -> &PriorityTable {
        &self.table
    }

    pub fn config(&self) -> &NotchConfig {
        &self.config
    }

    /// Resolve the mode the overlay should be in for `snapshot` at `now`.
    ///
    /// Total: there is always a winner, `Idle` at worst.
    pub fn resolve(
        &self,
        snapshot: &SignalSnapshot,
        cooldowns: &CooldownState,
        current: DisplayMode,
        hold: Option<&ActiveHold>,
        now: Instant,
    ) -> TransitionRequest {
        let input = ProbeInput {
            snapshot,
            hold,
            now,
            transient: self.config.transient_hold(),
        };

        let mut ranked: Vec<(bool, PriorityEntry, Candidate)> = self
            .table
            .entries()
            .iter()
            .filter_map(|entry| {
                let candidate = probe_for(entry.trigger)(&input)?;
                let overrides = hold.is_some() && self.config.overrides_hold(entry.trigger);
                Some((overrides, *entry, candidate))
            })
            .collect();
        ranked.sort_by_key(|(overrides, entry, candidate)| (!*overrides, entry.rank, candidate.arrived));

        let mut revisit_at = None;
        for (overrides, entry, candidate) in ranked {
            let window = self.config.cooldown(entry.trigger);
            if candidate.mode != current && cooldowns.is_cooling(entry.trigger, window, now) {
                if let Some(until) = cooldowns.cooling_until(entry.trigger, window) {
                    if candidate.expires_at.is_none_or(|exp| exp > until) {
                        revisit_at = earliest(revisit_at, until);
                    }
                }
                continue;
            }
            if let Some(exp) = candidate.expires_at {
                revisit_at = earliest(revisit_at, exp);
            }
            return TransitionRequest {
                proposed: candidate.mode,
                trigger: entry.trigger,
                reason: candidate.reason,
                priority: entry.rank,
                timestamp: now,
                overrides_hold: overrides,
                revisit_at,
            };
        }

        // Idle never cools down, so this is only reached with a corrupt table.
        TransitionRequest {
            proposed: DisplayMode::Idle,
            trigger: TriggerKind::Idle,
            reason: "nothing live",
            priority: self.table.rank(TriggerKind::Idle),
            timestamp: now,
            overrides_hold: false,
            revisit_at,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{GestureState, PendingNotification, TimerAlert};
    use crate::types::WidgetId;
    use std::collections::{BTreeMap, BTreeSet};

    const MS: Duration = Duration::from_millis(1);

    fn stamp(t0: Instant, ms: u64, seq: u64) -> Stamp {
        Stamp {
            at: t0 + MS * ms as u32,
            seq,
        }
    }

    fn playing(t0: Instant, seq: u64) -> SignalSnapshot {
        let mut snap = SignalSnapshot::default();
        snap.music.is_playing = true;
        snap.music.playing_since = Some(stamp(t0, 0, seq));
        snap
    }

    fn plugged(mut snap: SignalSnapshot, t0: Instant, ms: u64, seq: u64) -> SignalSnapshot {
        snap.power.is_charging = true;
        snap.power.level = Some(50);
        snap.power.plugged = Some(stamp(t0, ms, seq));
        snap
    }

    fn hold(pane: ExpandedPane) -> ActiveHold {
        ActiveHold {
            widget: WidgetId(1),
            pane,
            seq: 99,
        }
    }

    struct Case {
        name: &'static str,
        snapshot: SignalSnapshot,
        hold: Option<ActiveHold>,
        expected: DisplayMode,
        trigger: TriggerKind,
    }

    #[test]
    fn priority_table_cases() {
        let t0 = Instant::now();
        let now = t0 + MS * 100;
        let mut notified = SignalSnapshot::default();
        notified.notification = Some(PendingNotification {
            app: "mail".into(),
            badge: 1,
            since: stamp(t0, 0, 1),
        });
        let mut gesture = playing(t0, 1);
        gesture.gesture = Some(GestureState {
            pane: ExpandedPane::Dashboard,
            since: stamp(t0, 10, 2),
        });
        let mut clipboard = SignalSnapshot::default();
        clipboard.clipboard = Some(stamp(t0, 50, 1));
        let mut alert = playing(t0, 1);
        alert.timer_alert = Some(TimerAlert {
            session: WidgetId(4),
            fired: stamp(t0, 20, 2),
        });

        let cases = vec![
            Case {
                name: "nothing live",
                snapshot: SignalSnapshot::default(),
                hold: None,
                expected: DisplayMode::Idle,
                trigger: TriggerKind::Idle,
            },
            Case {
                name: "music beats notification",
                snapshot: {
                    let mut s = notified.clone();
                    s.music = playing(t0, 2).music;
                    s
                },
                hold: None,
                expected: DisplayMode::Compact(ContentKind::Music),
                trigger: TriggerKind::Music,
            },
            Case {
                name: "notification alone",
                snapshot: notified.clone(),
                hold: None,
                expected: DisplayMode::Compact(ContentKind::Notification),
                trigger: TriggerKind::Notification,
            },
            Case {
                name: "plug beats music",
                snapshot: plugged(playing(t0, 1), t0, 50, 2),
                hold: None,
                expected: DisplayMode::Compact(ContentKind::Battery),
                trigger: TriggerKind::BatteryPlugged,
            },
            Case {
                name: "gesture beats plug",
                snapshot: plugged(gesture.clone(), t0, 50, 3),
                hold: None,
                expected: DisplayMode::Expanded(ExpandedPane::Dashboard),
                trigger: TriggerKind::Gesture,
            },
            Case {
                name: "hold beats gesture",
                snapshot: gesture.clone(),
                hold: Some(hold(ExpandedPane::Timer)),
                expected: DisplayMode::Expanded(ExpandedPane::Timer),
                trigger: TriggerKind::WidgetHold,
            },
            Case {
                name: "clipboard pulse",
                snapshot: clipboard,
                hold: None,
                expected: DisplayMode::Compact(ContentKind::None),
                trigger: TriggerKind::Clipboard,
            },
            Case {
                name: "timer alert beats music",
                snapshot: alert,
                hold: None,
                expected: DisplayMode::Expanded(ExpandedPane::Timer),
                trigger: TriggerKind::TimerAlert,
            },
        ];

        let resolver = ModeResolver::new(NotchConfig::default());
        for case in cases {
            let request = resolver.resolve(
                &case.snapshot,
                &CooldownState::new(),
                DisplayMode::Idle,
                case.hold.as_ref(),
                now,
            );
            assert_eq!(request.proposed, case.expected, "case: {}", case.name);
            assert_eq!(request.trigger, case.trigger, "case: {}", case.name);
        }
    }

    #[test]
    fn transient_expires_after_window() {
        let t0 = Instant::now();
        let resolver = ModeResolver::new(NotchConfig::default());
        let snap = plugged(playing(t0, 1), t0, 0, 2);
        let window = NotchConfig::default().transient_hold();

        let during = resolver.resolve(&snap, &CooldownState::new(), DisplayMode::Idle, None, t0 + MS);
        assert_eq!(during.proposed, DisplayMode::Compact(ContentKind::Battery));
        assert_eq!(during.revisit_at, Some(t0 + window));

        let after = resolver.resolve(&snap, &CooldownState::new(), during.proposed, None, t0 + window);
        assert_eq!(after.proposed, DisplayMode::Compact(ContentKind::Music));
        assert_eq!(after.revisit_at, None);
    }

    #[test]
    fn cooling_candidate_is_skipped_with_revisit() {
        let t0 = Instant::now();
        let config = NotchConfig {
            cooldown_ms: BTreeMap::from([(TriggerKind::Music, 5_000)]),
            ..NotchConfig::default()
        };
        let resolver = ModeResolver::new(config);
        let mut cooldowns = CooldownState::new();
        cooldowns.record(TriggerKind::Music, t0);

        let request = resolver.resolve(&playing(t0, 1), &cooldowns, DisplayMode::Idle, None, t0 + MS);
        assert_eq!(request.proposed, DisplayMode::Idle);
        assert_eq!(request.revisit_at, Some(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn cooling_candidate_already_shown_is_sustained() {
        let t0 = Instant::now();
        let resolver = ModeResolver::new(NotchConfig::default());
        let mut cooldowns = CooldownState::new();
        cooldowns.record(TriggerKind::BatteryPlugged, t0);
        let snap = plugged(SignalSnapshot::default(), t0, 500, 2);

        let request = resolver.resolve(
            &snap,
            &cooldowns,
            DisplayMode::Compact(ContentKind::Battery),
            None,
            t0 + MS * 600,
        );
        assert_eq!(request.proposed, DisplayMode::Compact(ContentKind::Battery));
        assert_eq!(request.trigger, TriggerKind::BatteryPlugged);
    }

    #[test]
    fn transient_ending_before_cooldown_adds_no_revisit() {
        let t0 = Instant::now();
        let resolver = ModeResolver::new(NotchConfig::default());
        let mut cooldowns = CooldownState::new();
        cooldowns.record(TriggerKind::BatteryPlugged, t0);
        // Replug 5s later: window ends at 8s, cooldown at 10s.
        let snap = plugged(SignalSnapshot::default(), t0, 5_000, 2);

        let request = resolver.resolve(&snap, &cooldowns, DisplayMode::Idle, None, t0 + MS * 5_001);
        assert_eq!(request.proposed, DisplayMode::Idle);
        assert_eq!(request.revisit_at, None);
    }

    #[test]
    fn equal_ranks_resolve_fifo() {
        let t0 = Instant::now();
        let mut priority: BTreeMap<TriggerKind, u8> = TriggerKind::ALL
            .into_iter()
            .map(|k| (k, k.default_rank()))
            .collect();
        priority.insert(TriggerKind::Notification, TriggerKind::Music.default_rank());
        let resolver = ModeResolver::new(NotchConfig {
            priority,
            ..NotchConfig::default()
        });

        // Notification arrived first (seq 1), music second (seq 2).
        let mut snap = playing(t0, 2);
        snap.notification = Some(PendingNotification {
            app: "mail".into(),
            badge: 1,
            since: stamp(t0, 0, 1),
        });
        let request = resolver.resolve(&snap, &CooldownState::new(), DisplayMode::Idle, None, t0 + MS);
        assert_eq!(request.proposed, DisplayMode::Compact(ContentKind::Notification));

        // Reverse arrival order.
        let mut snap = playing(t0, 1);
        snap.notification = Some(PendingNotification {
            app: "mail".into(),
            badge: 1,
            since: stamp(t0, 0, 2),
        });
        let request = resolver.resolve(&snap, &CooldownState::new(), DisplayMode::Idle, None, t0 + MS);
        assert_eq!(request.proposed, DisplayMode::Compact(ContentKind::Music));
    }

    #[test]
    fn configured_override_outranks_hold() {
        let t0 = Instant::now();
        let resolver = ModeResolver::new(NotchConfig {
            hold_overridable_by: BTreeSet::from([TriggerKind::BatteryPlugged]),
            ..NotchConfig::default()
        });
        let snap = plugged(SignalSnapshot::default(), t0, 0, 1);
        let held = hold(ExpandedPane::Notes);

        let request = resolver.resolve(
            &snap,
            &CooldownState::new(),
            DisplayMode::Expanded(ExpandedPane::Notes),
            Some(&held),
            t0 + MS,
        );
        assert_eq!(request.proposed, DisplayMode::Compact(ContentKind::Battery));
        assert!(request.overrides_hold);

        // Without a hold the override flag stays off.
        let request = resolver.resolve(&snap, &CooldownState::new(), DisplayMode::Idle, None, t0 + MS);
        assert!(!request.overrides_hold);
    }

    #[test]
    fn future_stamps_are_not_live() {
        let t0 = Instant::now();
        let resolver = ModeResolver::new(NotchConfig::default());
        let snap = plugged(SignalSnapshot::default(), t0, 1_000, 1);
        let request = resolver.resolve(&snap, &CooldownState::new(), DisplayMode::Idle, None, t0);
        assert_eq!(request.proposed, DisplayMode::Idle);
    }

    #[test]
    fn only_transient_probes_expire() {
        let t0 = Instant::now();
        let mut snap = plugged(playing(t0, 1), t0, 0, 2);
        snap.power.low = Some(stamp(t0, 0, 3));
        snap.clipboard = Some(stamp(t0, 0, 4));
        snap.notification = Some(PendingNotification {
            app: "mail".into(),
            badge: 1,
            since: stamp(t0, 0, 5),
        });
        snap.gesture = Some(GestureState {
            pane: ExpandedPane::Settings,
            since: stamp(t0, 0, 6),
        });
        snap.timer_alert = Some(TimerAlert {
            session: WidgetId(2),
            fired: stamp(t0, 0, 7),
        });
        let held = hold(ExpandedPane::Notes);
        let input = ProbeInput {
            snapshot: &snap,
            hold: Some(&held),
            now: t0 + MS,
            transient: Duration::from_secs(3),
        };

        for (kind, probe) in PROBES {
            let candidate = probe(&input).unwrap_or_else(|| panic!("{kind} should be live"));
            assert_eq!(candidate.expires_at.is_some(), kind.is_transient(), "{kind}");
        }
    }

    #[test]
    fn table_is_sorted_by_rank() {
        let table = PriorityTable::default();
        let ranks: Vec<u8> = table.entries().iter().map(|e| e.rank).collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(ranks, sorted);
        assert_eq!(table.entries()[0].trigger, TriggerKind::WidgetHold);
        assert_eq!(table.rank(TriggerKind::Idle), 8);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::snapshot::{GestureState, PendingNotification, TimerAlert};
    use crate::types::WidgetId;
    use proptest::prelude::*;

    fn arb_mode() -> impl Strategy<Value = DisplayMode> {
        prop_oneof![
            Just(DisplayMode::Idle),
            Just(DisplayMode::Compact(ContentKind::Music)),
            Just(DisplayMode::Compact(ContentKind::Battery)),
            Just(DisplayMode::Compact(ContentKind::Notification)),
            Just(DisplayMode::Compact(ContentKind::None)),
            Just(DisplayMode::Expanded(ExpandedPane::Dashboard)),
            Just(DisplayMode::Expanded(ExpandedPane::Timer)),
        ]
    }

    fn arb_stamp() -> impl Strategy<Value = Option<(u64, u64)>> {
        proptest::option::of((0u64..10_000, 0u64..50))
    }

    #[derive(Debug, Clone)]
    struct Inputs {
        playing: Option<(u64, u64)>,
        charging: bool,
        plugged: Option<(u64, u64)>,
        low: Option<(u64, u64)>,
        notification: Option<(u64, u64)>,
        clipboard: Option<(u64, u64)>,
        gesture: Option<(u64, u64)>,
        alert: Option<(u64, u64)>,
        hold: bool,
        cooling: Vec<(usize, u64)>,
        current: DisplayMode,
        now_ms: u64,
    }

    fn arb_inputs() -> impl Strategy<Value = Inputs> {
        (
            (arb_stamp(), any::<bool>(), arb_stamp(), arb_stamp()),
            (arb_stamp(), arb_stamp(), arb_stamp(), arb_stamp()),
            any::<bool>(),
            proptest::collection::vec((0usize..9, 0u64..10_000), 0..4),
            arb_mode(),
            0u64..12_000,
        )
            .prop_map(
                |((playing, charging, plugged, low), (notification, clipboard, gesture, alert), hold, cooling, current, now_ms)| Inputs {
                    playing,
                    charging,
                    plugged,
                    low,
                    notification,
                    clipboard,
                    gesture,
                    alert,
                    hold,
                    cooling,
                    current,
                    now_ms,
                },
            )
    }

    fn build(t0: Instant, inputs: &Inputs) -> (SignalSnapshot, CooldownState, Option<ActiveHold>, Instant) {
        let at = |(ms, seq): (u64, u64)| Stamp {
            at: t0 + Duration::from_millis(ms),
            seq,
        };
        let mut snap = SignalSnapshot::default();
        snap.music.is_playing = inputs.playing.is_some();
        snap.music.playing_since = inputs.playing.map(at);
        snap.power.is_charging = inputs.charging;
        snap.power.plugged = inputs.plugged.map(at);
        snap.power.low = inputs.low.map(at);
        snap.notification = inputs.notification.map(|s| PendingNotification {
            app: "app".into(),
            badge: 1,
            since: at(s),
        });
        snap.clipboard = inputs.clipboard.map(at);
        snap.gesture = inputs.gesture.map(|s| GestureState {
            pane: ExpandedPane::Dashboard,
            since: at(s),
        });
        snap.timer_alert = inputs.alert.map(|s| TimerAlert {
            session: WidgetId(1),
            fired: at(s),
        });
        let mut cooldowns = CooldownState::new();
        for (idx, ms) in &inputs.cooling {
            cooldowns.record(TriggerKind::ALL[*idx], t0 + Duration::from_millis(*ms));
        }
        let hold = inputs.hold.then_some(ActiveHold {
            widget: WidgetId(9),
            pane: ExpandedPane::Notes,
            seq: 7,
        });
        (snap, cooldowns, hold, t0 + Duration::from_millis(inputs.now_ms))
    }

    proptest! {
        /// Same inputs always yield the same request.
        #[test]
        fn resolve_is_deterministic(inputs in arb_inputs()) {
            let t0 = Instant::now();
            let (snap, cooldowns, hold, now) = build(t0, &inputs);
            let resolver = ModeResolver::new(NotchConfig::default());
            let first = resolver.resolve(&snap, &cooldowns, inputs.current, hold.as_ref(), now);
            let second = resolver.resolve(&snap, &cooldowns, inputs.current, hold.as_ref(), now);
            prop_assert_eq!(first, second);
        }

        /// With a hold and no configured overrides, the hold pane always wins.
        #[test]
        fn hold_wins_without_overrides(inputs in arb_inputs()) {
            let t0 = Instant::now();
            let (snap, cooldowns, _, now) = build(t0, &inputs);
            let held = ActiveHold { widget: WidgetId(9), pane: ExpandedPane::Notes, seq: 7 };
            let resolver = ModeResolver::new(NotchConfig::default());
            let request = resolver.resolve(&snap, &cooldowns, inputs.current, Some(&held), now);
            prop_assert_eq!(request.proposed, DisplayMode::Expanded(ExpandedPane::Notes));
            prop_assert!(!request.overrides_hold);
        }

        /// A revisit point, when present, always lies in the future.
        #[test]
        fn revisit_is_in_the_future(inputs in arb_inputs()) {
            let t0 = Instant::now();
            let (snap, cooldowns, hold, now) = build(t0, &inputs);
            let resolver = ModeResolver::new(NotchConfig::default());
            let request = resolver.resolve(&snap, &cooldowns, inputs.current, hold.as_ref(), now);
            if let Some(at) = request.revisit_at {
                prop_assert!(at > now);
            }
        }
    }
}
