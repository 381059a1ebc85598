//! Coordinator configuration.
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file (or no file) yields [`NotchConfig::default`].

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use crate::error::NotchError;
use crate::types::{TriggerKind, WidgetKind};

/// Default transient window (battery plug, clipboard pulse, timer alert).
pub const DEFAULT_TRANSIENT_HOLD_MS: u64 = 3_000;

/// Default pomodoro length (25 minutes).
pub const DEFAULT_TIMER_DURATION_MS: u64 = 25 * 60 * 1_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML encode error: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error(transparent)]
    Invalid(#[from] NotchError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotchConfig {
    /// How long a transient trigger stays live.
    pub transient_hold_ms: u64,
    /// Minimum interval between accepted transitions of one trigger kind.
    /// Entries in a file are merged over the defaults; `0` disables one.
    #[serde(deserialize_with = "merge_over_default_cooldowns")]
    pub cooldown_ms: BTreeMap<TriggerKind, u64>,
    /// Widget kinds of which only one session may be live at a time.
    pub exclusive_widget_kinds: BTreeSet<WidgetKind>,
    /// Rank per trigger kind; lower wins. Missing kinds use the default rank.
    pub priority: BTreeMap<TriggerKind, u8>,
    /// Triggers allowed to pre-empt an active widget hold.
    pub hold_overridable_by: BTreeSet<TriggerKind>,
    /// Widget kinds whose sessions pin the overlay expanded.
    pub pinned_widget_kinds: BTreeSet<WidgetKind>,
    pub timer_duration_ms: u64,
    /// Note/alarm editors close themselves after this long.
    pub editor_auto_close_ms: Option<u64>,
    /// Battery level (percent) at or below which a low-battery pulse fires.
    pub low_battery_threshold: u8,
    /// Widget countdown tick period.
    pub tick_interval_ms: u64,
}

impl Default for NotchConfig {
    fn default() -> Self {
        Self {
            transient_hold_ms: DEFAULT_TRANSIENT_HOLD_MS,
            cooldown_ms: default_cooldowns(),
            exclusive_widget_kinds: BTreeSet::from([WidgetKind::Timer]),
            priority: TriggerKind::ALL
                .into_iter()
                .map(|k| (k, k.default_rank()))
                .collect(),
            hold_overridable_by: BTreeSet::new(),
            pinned_widget_kinds: WidgetKind::ALL.into_iter().collect(),
            timer_duration_ms: DEFAULT_TIMER_DURATION_MS,
            editor_auto_close_ms: None,
            low_battery_threshold: 20,
            tick_interval_ms: 1_000,
        }
    }
}

fn default_cooldowns() -> BTreeMap<TriggerKind, u64> {
    BTreeMap::from([
        (TriggerKind::BatteryPlugged, 10_000),
        (TriggerKind::BatteryLow, 60_000),
        (TriggerKind::Clipboard, 1_000),
    ])
}

fn merge_over_default_cooldowns<'de, D>(deserializer: D) -> Result<BTreeMap<TriggerKind, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<TriggerKind, u64>::deserialize(deserializer)?;
    let mut cooldowns = default_cooldowns();
    cooldowns.extend(overrides);
    Ok(cooldowns)
}

impl NotchConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), NotchError> {
        if self.transient_hold_ms == 0 {
            return Err(NotchError::InvalidInput(
                "transient_hold_ms must be positive".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(NotchError::InvalidInput(
                "tick_interval_ms must be positive".into(),
            ));
        }
        if self.timer_duration_ms == 0 {
            return Err(NotchError::InvalidInput(
                "timer_duration_ms must be positive".into(),
            ));
        }
        if self.low_battery_threshold > 100 {
            return Err(NotchError::InvalidInput(format!(
                "low_battery_threshold {} exceeds 100",
                self.low_battery_threshold
            )));
        }
        for kind in [TriggerKind::WidgetHold, TriggerKind::Idle] {
            if self.hold_overridable_by.contains(&kind) {
                return Err(NotchError::InvalidInput(format!(
                    "{kind} cannot override a widget hold"
                )));
            }
        }
        Ok(())
    }

    pub fn transient_hold(&self) -> Duration {
        Duration::from_millis(self.transient_hold_ms)
    }

    /// Cooldown window for a trigger kind. Holds and idle never cool down.
    pub fn cooldown(&self, kind: TriggerKind) -> Duration {
        match kind {
            TriggerKind::WidgetHold | TriggerKind::Idle => Duration::ZERO,
            _ => Duration::from_millis(self.cooldown_ms.get(&kind).copied().unwrap_or(0)),
        }
    }

    pub fn rank(&self, kind: TriggerKind) -> u8 {
        self.priority
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_rank())
    }

    pub fn is_exclusive(&self, kind: WidgetKind) -> bool {
        self.exclusive_widget_kinds.contains(&kind)
    }

    pub fn pins(&self, kind: WidgetKind) -> bool {
        self.pinned_widget_kinds.contains(&kind)
    }

    pub fn overrides_hold(&self, kind: TriggerKind) -> bool {
        self.hold_overridable_by.contains(&kind)
    }

    pub fn timer_duration(&self) -> Duration {
        Duration::from_millis(self.timer_duration_ms)
    }

    pub fn editor_auto_close(&self) -> Option<Duration> {
        self.editor_auto_close_ms.map(Duration::from_millis)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
