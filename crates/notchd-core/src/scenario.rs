//! Scripted signal scenarios.
//!
//! A scenario is a timeline of inputs with the display mode expected after
//! each one. The same JSON files drive the fixture tests and the
//! `notchd replay` command.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::config::NotchConfig;
use crate::types::{DisplayMode, ExpandedPane, SignalEvent, WidgetId};

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("I/O error reading scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("step {index} at {at_ms}ms is earlier than the step before it")]
    Unordered { index: usize, at_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Overrides for this scenario; defaults otherwise.
    #[serde(default)]
    pub config: Option<NotchConfig>,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Offset from scenario start.
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: StepAction,
    /// Mode expected once the step has been processed.
    #[serde(default)]
    pub expect: Option<DisplayMode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StepAction {
    Signal { event: SignalEvent },
    Hold { widget: WidgetId, pane: ExpandedPane },
    Release { widget: WidgetId },
    /// No input; only checks the mode at this instant.
    Check,
}

impl ScenarioStep {
    pub fn offset(&self) -> Duration {
        Duration::from_millis(self.at_ms)
    }
}

impl Scenario {
    pub fn from_json(input: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(input)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Steps must be in time order.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        for (index, pair) in self.steps.windows(2).enumerate() {
            if pair[1].at_ms < pair[0].at_ms {
                return Err(ScenarioError::Unordered {
                    index: index + 1,
                    at_ms: pair[1].at_ms,
                });
            }
        }
        Ok(())
    }

    pub fn effective_config(&self) -> NotchConfig {
        self.config.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentKind;

    #[test]
    fn parses_steps_with_flattened_ops() {
        let scenario = Scenario::from_json(
            r#"{
                "name": "demo",
                "steps": [
                    {"at_ms": 0, "op": "signal", "event": {"type": "clipboard_changed"},
                     "expect": {"mode": "compact", "content": "none"}},
                    {"at_ms": 5, "op": "hold", "widget": 3, "pane": "notes"},
                    {"at_ms": 9, "op": "release", "widget": 3},
                    {"at_ms": 4000, "op": "check", "expect": {"mode": "idle"}}
                ]
            }"#,
        )
        .expect("parse");

        assert_eq!(scenario.steps.len(), 4);
        assert_eq!(
            scenario.steps[0].expect,
            Some(DisplayMode::Compact(ContentKind::None))
        );
        assert_eq!(
            scenario.steps[1].action,
            StepAction::Hold {
                widget: WidgetId(3),
                pane: ExpandedPane::Notes,
            }
        );
        assert_eq!(scenario.steps[2].expect, None);
        assert_eq!(scenario.effective_config(), NotchConfig::default());
    }

    #[test]
    fn rejects_steps_out_of_order() {
        let err = Scenario::from_json(
            r#"{"name": "bad", "steps": [
                {"at_ms": 10, "op": "check"},
                {"at_ms": 5, "op": "check"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScenarioError::Unordered { index: 1, at_ms: 5 }));
    }

    #[test]
    fn scenario_config_overrides_defaults() {
        let scenario = Scenario::from_json(
            r#"{"name": "cfg", "config": {"transient_hold_ms": 500}, "steps": []}"#,
        )
        .expect("parse");
        assert_eq!(scenario.effective_config().transient_hold_ms, 500);
        assert_eq!(scenario.effective_config().low_battery_threshold, 20);
    }
}
