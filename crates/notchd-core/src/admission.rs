//! Admission: decides whether a resolver proposal becomes the visible mode.
//!
//! Checked in order: no-op, hold precedence, cooldown.

use std::time::Instant;

use crate::config::NotchConfig;
use crate::cooldown::CooldownState;
use crate::resolver::TransitionRequest;
use crate::types::DisplayMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Proposal equals the current mode.
    Unchanged,
    /// A widget hold pins the overlay expanded.
    BlockedByHold,
    CoolingDown { until: Instant },
}

impl Admission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Unchanged => "unchanged",
            Self::BlockedByHold => "blocked_by_hold",
            Self::CoolingDown { .. } => "cooling_down",
        }
    }
}

pub fn admit(
    request: &TransitionRequest,
    current: DisplayMode,
    hold_active: bool,
    cooldowns: &CooldownState,
    config: &NotchConfig,
) -> Admission {
    if request.proposed == current {
        return Admission::Unchanged;
    }
    if hold_active && !request.proposed.is_expanded() && !request.overrides_hold {
        return Admission::BlockedByHold;
    }
    let window = config.cooldown(request.trigger);
    if cooldowns.is_cooling(request.trigger, window, request.timestamp) {
        if let Some(until) = cooldowns.cooling_until(request.trigger, window) {
            return Admission::CoolingDown { until };
        }
    }
    Admission::Accepted
}
