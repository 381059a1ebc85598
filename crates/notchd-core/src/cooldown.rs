//! Per-trigger cooldown tracking.
//!
//! Records when a transition of each trigger kind was last accepted, so the
//! same trigger cannot fire again within its configured window (battery
//! level jitter, plug/unplug flapping).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::TriggerKind;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooldownState {
    last_fired: HashMap<TriggerKind, Instant>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: TriggerKind, at: Instant) {
        self.last_fired.insert(kind, at);
    }

    pub fn last_fired(&self, kind: TriggerKind) -> Option<Instant> {
        self.last_fired.get(&kind).copied()
    }

    /// End of the cooldown window, if one was ever started.
    pub fn cooling_until(&self, kind: TriggerKind, window: Duration) -> Option<Instant> {
        if window.is_zero() {
            return None;
        }
        self.last_fired(kind).map(|at| at + window)
    }

    pub fn is_cooling(&self, kind: TriggerKind, window: Duration, now: Instant) -> bool {
        self.cooling_until(kind, window).is_some_and(|until| now < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_fired_is_not_cooling() {
        let state = CooldownState::new();
        assert!(!state.is_cooling(TriggerKind::BatteryPlugged, Duration::from_secs(10), Instant::now()));
    }

    #[test]
    fn cooling_within_window_only() {
        let t0 = Instant::now();
        let mut state = CooldownState::new();
        state.record(TriggerKind::BatteryPlugged, t0);
        let window = Duration::from_secs(10);

        assert!(state.is_cooling(TriggerKind::BatteryPlugged, window, t0 + Duration::from_secs(9)));
        assert!(!state.is_cooling(TriggerKind::BatteryPlugged, window, t0 + window));
        assert!(!state.is_cooling(TriggerKind::Music, window, t0));
    }

    #[test]
    fn zero_window_never_cools() {
        let t0 = Instant::now();
        let mut state = CooldownState::new();
        state.record(TriggerKind::Music, t0);
        assert_eq!(state.cooling_until(TriggerKind::Music, Duration::ZERO), None);
        assert!(!state.is_cooling(TriggerKind::Music, Duration::ZERO, t0));
    }

    #[test]
    fn record_replaces_previous_timestamp() {
        let t0 = Instant::now();
        let mut state = CooldownState::new();
        state.record(TriggerKind::Clipboard, t0);
        state.record(TriggerKind::Clipboard, t0 + Duration::from_secs(5));
        assert_eq!(
            state.last_fired(TriggerKind::Clipboard),
            Some(t0 + Duration::from_secs(5))
        );
    }
}
