use crate::session::{SessionAction, SessionState};
use crate::types::{WidgetId, WidgetKind};

/// Errors produced by the coordinator core.
///
/// None of these are fatal. Session errors are returned to the caller;
/// `OutOfOrderSignal` never leaves the coordinator and only shows up in logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotchError {
    #[error("session {id} is {state}, cannot {attempted}")]
    InvalidSessionState {
        id: WidgetId,
        state: SessionState,
        attempted: SessionAction,
    },
    #[error("a {kind} session is already open ({existing})")]
    AlreadyOpen { kind: WidgetKind, existing: WidgetId },
    #[error("out-of-order signal: {0}")]
    OutOfOrderSignal(String),
    #[error("unknown session: {0}")]
    UnknownSession(WidgetId),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl NotchError {
    pub(crate) fn out_of_order(msg: impl Into<String>) -> Self {
        Self::OutOfOrderSignal(msg.into())
    }
}
