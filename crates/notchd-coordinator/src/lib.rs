//! notchd-coordinator: single-writer display-mode coordinator and the
//! widget session manager driving it.
//!
//! Signal sources and widgets talk to the coordinator through a cloneable
//! handle; one tokio task owns all mutable state.

pub mod coordinator;
pub mod timer;
pub mod widgets;

pub use coordinator::{Coordinator, CoordinatorStats, ModeChange, SubscriptionId};
pub use notchd_core::types;
pub use widgets::WidgetManager;
