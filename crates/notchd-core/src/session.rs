//! Widget session lifecycle.
//!
//! Pure state machine for ephemeral, user-initiated overlays (pomodoro
//! countdown, note editor, alarm editor):
//!
//! - `Running -> Finished` when a countdown reaches zero.
//! - `Running -> Cancelled` on close, timeout or supersession.
//! - `Finished -> Dismissed` when the user acknowledges the alarm.
//!
//! `Cancelled` and `Dismissed` are terminal. Illegal transitions return
//! [`NotchError::InvalidSessionState`] and leave the session untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::NotchConfig;
use crate::error::NotchError;
use crate::types::{WidgetId, WidgetKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Running,
    Finished,
    Cancelled,
    Dismissed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Dismissed)
    }

    /// Running or finished-but-not-dismissed.
    pub fn is_live(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    Finish,
    Cancel,
    Dismiss,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Finish => "finish",
            Self::Cancel => "cancel",
            Self::Dismiss => "dismiss",
        })
    }
}

/// One ephemeral widget session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSession {
    pub id: WidgetId,
    pub kind: WidgetKind,
    pub started_at: Instant,
    /// Whether the session pins the overlay expanded while live.
    pub pins_expanded: bool,
    /// Editors close themselves after this long.
    pub auto_close_after: Option<Duration>,
    /// Countdown length, for countdown kinds.
    pub countdown: Option<Duration>,
    pub state: SessionState,
    /// When the session reached a terminal state.
    pub ended_at: Option<Instant>,
}

impl WidgetSession {
    pub fn new(id: WidgetId, kind: WidgetKind, started_at: Instant, config: &NotchConfig) -> Self {
        Self {
            id,
            kind,
            started_at,
            pins_expanded: config.pins(kind),
            auto_close_after: if kind.is_countdown() {
                None
            } else {
                config.editor_auto_close()
            },
            countdown: kind.is_countdown().then(|| config.timer_duration()),
            state: SessionState::Running,
            ended_at: None,
        }
    }

    /// Instant at which a running countdown reaches zero.
    pub fn deadline(&self) -> Option<Instant> {
        self.countdown.map(|d| self.started_at + d)
    }

    /// Time left on the countdown. `None` unless running with a countdown.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if self.state != SessionState::Running {
            return None;
        }
        self.deadline().map(|d| d.saturating_duration_since(now))
    }

    pub fn countdown_due(&self, now: Instant) -> bool {
        self.state == SessionState::Running && self.deadline().is_some_and(|d| now >= d)
    }

    pub fn auto_close_due(&self, now: Instant) -> bool {
        self.state.is_live()
            && self
                .auto_close_after
                .is_some_and(|after| now >= self.started_at + after)
    }

    /// The action `close` maps to in the current state; `None` once terminal.
    pub fn close_action(&self) -> Option<SessionAction> {
        match self.state {
            SessionState::Running => Some(SessionAction::Cancel),
            SessionState::Finished => Some(SessionAction::Dismiss),
            SessionState::Cancelled | SessionState::Dismissed => None,
        }
    }

    /// Apply a lifecycle action.
    pub fn apply(&mut self, action: SessionAction, now: Instant) -> Result<SessionState, NotchError> {
        let next = match (self.state, action) {
            (SessionState::Running, SessionAction::Finish) => SessionState::Finished,
            (SessionState::Running, SessionAction::Cancel) => SessionState::Cancelled,
            (SessionState::Finished, SessionAction::Dismiss) => SessionState::Dismissed,
            (state, attempted) => {
                return Err(NotchError::InvalidSessionState {
                    id: self.id,
                    state,
                    attempted,
                });
            }
        };
        self.state = next;
        if next.is_terminal() {
            self.ended_at = Some(now);
        }
        Ok(next)
    }

    pub fn view(&self, now: Instant) -> SessionView {
        SessionView {
            id: self.id,
            kind: self.kind,
            state: self.state,
            pins_expanded: self.pins_expanded,
            age_ms: now.saturating_duration_since(self.started_at).as_millis() as u64,
            remaining_ms: self.remaining(now).map(|d| d.as_millis() as u64),
        }
    }
}

/// Serializable summary of a session for adapters and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: WidgetId,
    pub kind: WidgetKind,
    pub state: SessionState,
    pub pins_expanded: bool,
    pub age_ms: u64,
    pub remaining_ms: Option<u64>,
}

// ─── Tests ───────────────────────────────────────────────────────────
