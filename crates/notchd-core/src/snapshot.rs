//! Immutable signal snapshot and the reducer that folds events into it.
//!
//! Every accepted event yields a new [`SignalSnapshot`] value; the previous
//! version is never mutated. Malformed, redundant or out-of-order events are
//! rejected with [`NotchError::OutOfOrderSignal`], which callers treat as a
//! no-op.

use std::time::Instant;

use crate::error::NotchError;
use crate::types::{ExpandedPane, MediaSource, SignalEvent, WidgetId};

/// When (and in which arrival order) a signal became live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub at: Instant,
    /// Coordinator-wide arrival sequence, used for FIFO tie-breaks.
    pub seq: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MusicState {
    pub is_playing: bool,
    pub source: MediaSource,
    pub track_id: Option<String>,
    pub has_artwork: bool,
    /// Set while playing; kept across track changes.
    pub playing_since: Option<Stamp>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PowerState {
    pub is_charging: bool,
    /// `None` until the first power event.
    pub level: Option<u8>,
    /// Last plug-in; live for the transient window.
    pub plugged: Option<Stamp>,
    /// Last downward crossing of the low-battery threshold.
    pub low: Option<Stamp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    /// App of the most recent notification.
    pub app: String,
    pub badge: u32,
    pub since: Stamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureState {
    pub pane: ExpandedPane,
    pub since: Stamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerAlert {
    pub session: WidgetId,
    pub fired: Stamp,
}

/// Everything mode resolution reads, as of one version.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SignalSnapshot {
    pub version: u64,
    pub music: MusicState,
    pub power: PowerState,
    pub notification: Option<PendingNotification>,
    /// Last clipboard change; live for the transient window.
    pub clipboard: Option<Stamp>,
    /// User-requested expansion, live until collapsed.
    pub gesture: Option<GestureState>,
    pub timer_alert: Option<TimerAlert>,
    pub active_widget: Option<WidgetId>,
}

impl SignalSnapshot {
    /// Fold one event into a new snapshot version.
    ///
    /// `low_battery_threshold` decides when a power event counts as a
    /// low-battery crossing.
    pub fn apply(
        &self,
        event: &SignalEvent,
        stamp: Stamp,
        low_battery_threshold: u8,
    ) -> Result<Self, NotchError> {
        let mut next = self.clone();
        match event {
            SignalEvent::MusicChanged {
                is_playing,
                source,
                track_id,
                has_artwork,
            } => next.music = self.music_after(*is_playing, *source, track_id, *has_artwork, stamp)?,
            SignalEvent::PowerChanged {
                is_charging,
                just_plugged,
                level,
            } => {
                next.power =
                    self.power_after(*is_charging, *just_plugged, *level, stamp, low_battery_threshold)?
            }
            SignalEvent::NotificationArrived { app, badge_delta } => {
                next.notification = self.notification_after(app, *badge_delta, stamp)?
            }
            SignalEvent::ClipboardChanged => next.clipboard = Some(stamp),
            SignalEvent::GestureTapExpand => {
                if self.gesture.is_some() {
                    return Err(NotchError::out_of_order("tap-expand while already expanded"));
                }
                next.gesture = Some(GestureState {
                    pane: ExpandedPane::Dashboard,
                    since: stamp,
                });
            }
            SignalEvent::GestureSelectPane { pane } => {
                let since = match self.gesture {
                    Some(g) if g.pane == *pane => {
                        return Err(NotchError::out_of_order(format!(
                            "pane {} already selected",
                            pane.as_str()
                        )));
                    }
                    Some(g) => g.since,
                    None => stamp,
                };
                next.gesture = Some(GestureState { pane: *pane, since });
            }
            SignalEvent::GestureCollapse => {
                if self.gesture.is_none() && self.timer_alert.is_none() {
                    return Err(NotchError::out_of_order("collapse while not expanded"));
                }
                next.gesture = None;
                next.timer_alert = None;
            }
            SignalEvent::TimerFired { session_id } => {
                if self.timer_alert.is_some_and(|a| a.session == *session_id) {
                    return Err(NotchError::out_of_order(format!(
                        "duplicate timer fire for {session_id}"
                    )));
                }
                next.timer_alert = Some(TimerAlert {
                    session: *session_id,
                    fired: stamp,
                });
            }
        }
        next.version = self.version + 1;
        Ok(next)
    }

    /// New version with a different active widget (hold owner).
    pub fn with_active_widget(&self, widget: Option<WidgetId>) -> Self {
        let mut next = self.clone();
        next.active_widget = widget;
        next.version = self.version + 1;
        next
    }

    fn music_after(
        &self,
        is_playing: bool,
        source: MediaSource,
        track_id: &Option<String>,
        has_artwork: bool,
        stamp: Stamp,
    ) -> Result<MusicState, NotchError> {
        let prev = &self.music;
        if !is_playing && !prev.is_playing {
            return Err(NotchError::out_of_order("paused without prior playing"));
        }
        if is_playing
            && prev.is_playing
            && prev.source == source
            && prev.track_id == *track_id
            && prev.has_artwork == has_artwork
        {
            return Err(NotchError::out_of_order("duplicate playing event"));
        }
        let playing_since = if is_playing {
            prev.playing_since.or(Some(stamp))
        } else {
            None
        };
        Ok(MusicState {
            is_playing,
            source,
            track_id: track_id.clone().or_else(|| prev.track_id.clone()),
            has_artwork,
            playing_since,
        })
    }

    fn power_after(
        &self,
        is_charging: bool,
        just_plugged: bool,
        level: u8,
        stamp: Stamp,
        low_battery_threshold: u8,
    ) -> Result<PowerState, NotchError> {
        if level > 100 {
            return Err(NotchError::out_of_order(format!("battery level {level} out of range")));
        }
        if just_plugged && !is_charging {
            return Err(NotchError::out_of_order("just_plugged while not charging"));
        }
        let prev = &self.power;
        if !just_plugged && prev.is_charging == is_charging && prev.level == Some(level) {
            return Err(NotchError::out_of_order("duplicate power state"));
        }

        let plugged = if just_plugged {
            Some(stamp)
        } else if is_charging {
            prev.plugged
        } else {
            None
        };

        let is_low = !is_charging && level <= low_battery_threshold;
        let was_low = !prev.is_charging && prev.level.is_some_and(|l| l <= low_battery_threshold);
        let low = match (is_low, was_low) {
            (true, false) => Some(stamp),
            (true, true) => prev.low,
            (false, _) => None,
        };

        Ok(PowerState {
            is_charging,
            level: Some(level),
            plugged,
            low,
        })
    }

    fn notification_after(
        &self,
        app: &str,
        badge_delta: i32,
        stamp: Stamp,
    ) -> Result<Option<PendingNotification>, NotchError> {
        if badge_delta == 0 {
            return Err(NotchError::out_of_order("zero badge delta"));
        }
        let current = self.notification.as_ref();
        if badge_delta < 0 && current.is_none() {
            return Err(NotchError::out_of_order(
                "badge decrement with nothing pending",
            ));
        }
        let badge = i64::from(current.map_or(0, |n| n.badge)) + i64::from(badge_delta);
        if badge <= 0 {
            return Ok(None);
        }
        Ok(Some(PendingNotification {
            app: app.to_string(),
            badge: u32::try_from(badge).unwrap_or(u32::MAX),
            since: current.map_or(stamp, |n| n.since),
        }))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
