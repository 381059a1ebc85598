use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Display Mode ─────────────────────────────────────────────────

/// What the collapsed overlay is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Music,
    Battery,
    Notification,
    None,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Music => "music",
            Self::Battery => "battery",
            Self::Notification => "notification",
            Self::None => "none",
        }
    }
}

/// Pane shown while the overlay is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandedPane {
    Dashboard,
    MusicDetail,
    Notes,
    Timer,
    Settings,
}

impl ExpandedPane {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::MusicDetail => "music_detail",
            Self::Notes => "notes",
            Self::Timer => "timer",
            Self::Settings => "settings",
        }
    }
}

/// The single mode the overlay is in at any instant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", content = "content", rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Idle,
    Compact(ContentKind),
    Expanded(ExpandedPane),
}

impl DisplayMode {
    pub fn is_expanded(self) -> bool {
        matches!(self, Self::Expanded(_))
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Compact(kind) => write!(f, "compact:{}", kind.as_str()),
            Self::Expanded(pane) => write!(f, "expanded:{}", pane.as_str()),
        }
    }
}

// ─── Trigger Kinds ────────────────────────────────────────────────

/// Key of the priority table and of cooldown tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    WidgetHold,
    Gesture,
    TimerAlert,
    BatteryPlugged,
    BatteryLow,
    Music,
    Notification,
    Clipboard,
    Idle,
}

impl TriggerKind {
    /// Every trigger kind, in default priority order (highest first).
    pub const ALL: [Self; 9] = [
        Self::WidgetHold,
        Self::Gesture,
        Self::TimerAlert,
        Self::BatteryPlugged,
        Self::BatteryLow,
        Self::Music,
        Self::Notification,
        Self::Clipboard,
        Self::Idle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WidgetHold => "widget_hold",
            Self::Gesture => "gesture",
            Self::TimerAlert => "timer_alert",
            Self::BatteryPlugged => "battery_plugged",
            Self::BatteryLow => "battery_low",
            Self::Music => "music",
            Self::Notification => "notification",
            Self::Clipboard => "clipboard",
            Self::Idle => "idle",
        }
    }

    /// Default rank; lower rank = higher priority.
    pub fn default_rank(self) -> u8 {
        // ALL is ordered by priority, so the index is the rank.
        Self::ALL.iter().position(|k| *k == self).unwrap_or(Self::ALL.len() - 1) as u8
    }

    /// Triggers that only stay live for the transient window.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::TimerAlert | Self::BatteryPlugged | Self::BatteryLow | Self::Clipboard
        )
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Widgets ──────────────────────────────────────────────────────

/// Identifier of a widget session. Allocated by the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(pub u64);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// Pomodoro countdown.
    Timer,
    Notes,
    /// Alarm editor.
    Alarm,
}

impl WidgetKind {
    pub const ALL: [Self; 3] = [Self::Timer, Self::Notes, Self::Alarm];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timer => "timer",
            Self::Notes => "notes",
            Self::Alarm => "alarm",
        }
    }

    /// Pane the overlay pins while a session of this kind holds it.
    pub fn pane(self) -> ExpandedPane {
        match self {
            Self::Timer | Self::Alarm => ExpandedPane::Timer,
            Self::Notes => ExpandedPane::Notes,
        }
    }

    pub fn is_countdown(self) -> bool {
        matches!(self, Self::Timer)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hold pinning the overlay to an expanded pane on behalf of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveHold {
    pub widget: WidgetId,
    pub pane: ExpandedPane,
    /// Arrival sequence of the hold request.
    pub seq: u64,
}

// ─── Signals ──────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    Spotify,
    AppleMusic,
    Browser,
    #[default]
    Other,
}

/// A discrete event from one of the signal sources.
///
/// Payloads carry only what mode resolution needs; artwork bytes and
/// playback control channels stay with the presentation adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalEvent {
    MusicChanged {
        is_playing: bool,
        #[serde(default)]
        source: MediaSource,
        #[serde(default)]
        track_id: Option<String>,
        #[serde(default)]
        has_artwork: bool,
    },
    PowerChanged {
        is_charging: bool,
        #[serde(default)]
        just_plugged: bool,
        level: u8,
    },
    NotificationArrived {
        app: String,
        badge_delta: i32,
    },
    ClipboardChanged,
    GestureTapExpand,
    GestureSelectPane {
        pane: ExpandedPane,
    },
    GestureCollapse,
    TimerFired {
        session_id: WidgetId,
    },
}

impl SignalEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MusicChanged { .. } => "music_changed",
            Self::PowerChanged { .. } => "power_changed",
            Self::NotificationArrived { .. } => "notification_arrived",
            Self::ClipboardChanged => "clipboard_changed",
            Self::GestureTapExpand => "gesture_tap_expand",
            Self::GestureSelectPane { .. } => "gesture_select_pane",
            Self::GestureCollapse => "gesture_collapse",
            Self::TimerFired { .. } => "timer_fired",
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────
