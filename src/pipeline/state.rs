//! Connection session state

use std::time::Instant;

/// Lifecycle of the viewer session
///
/// Transitions are validated so the reconnection logic cannot wander into
/// states it has no business in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing attempted yet
    Idle,

    /// A connect attempt is in flight
    Connecting,

    /// Transport established, messages flowing
    Open {
        /// When the transport opened
        since: Instant,
    },

    /// Waiting out the delay before the next connect attempt
    Reconnecting {
        /// 1-based attempt number
        attempt: u32,
    },

    /// Reconnect attempts exhausted
    Failed,

    /// Torn down locally, never re-armed
    Closed,
}

impl SessionState {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        use SessionState::*;

        match (self, target) {
            (Idle, Connecting) => true,
            (Idle, Closed) => true,

            (Connecting, Open { .. }) => true,
            (Connecting, Reconnecting { .. }) => true,
            (Connecting, Failed) => true,
            (Connecting, Closed) => true,

            (Open { .. }, Reconnecting { .. }) => true,
            (Open { .. }, Failed) => true,
            (Open { .. }, Closed) => true,

            (Reconnecting { .. }, Connecting) => true,
            (Reconnecting { .. }, Closed) => true,

            (Failed, Closed) => true,

            // Closed is terminal
            (Closed, _) => false,

            (a, b) if a == b => true,

            _ => false,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Connecting => "Connecting",
            SessionState::Open { .. } => "Open",
            SessionState::Reconnecting { .. } => "Reconnecting",
            SessionState::Failed => "Failed",
            SessionState::Closed => "Closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open { .. })
    }

    /// No further connect attempt will ever be made
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Failed | SessionState::Closed)
    }

    /// Time since the transport opened (if open)
    pub fn open_duration(&self) -> Option<std::time::Duration> {
        if let SessionState::Open { since } = self {
            Some(since.elapsed())
        } else {
            None
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Reconnecting { attempt } => write!(f, "Reconnecting (#{attempt})"),
            other => f.write_str(other.description()),
        }
    }
}
