//! Reconnection policy
//!
//! Pure state machine: the coordinator reports transport events and acts on
//! what comes back. Only transport closure moves the session forward.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::pipeline::state::SessionState;

/// What the caller must do after a transport closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Connect again once `delay` has passed
    Reconnect { attempt: u32, delay: Duration },
    /// Give up; no further connect attempt
    Fail { attempts: u32 },
    /// Session already torn down
    Ignore,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    attempts: u32,
    max_attempts: u32,
    delay: Duration,
}

impl Session {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            attempts: 0,
            max_attempts,
            delay,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Closures since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Mark a connect attempt as started. Returns false when the session
    /// may no longer connect.
    pub fn begin_connect(&mut self) -> bool {
        self.transition(SessionState::Connecting)
    }

    pub fn on_open(&mut self) {
        if self.transition(SessionState::Open {
            since: Instant::now(),
        }) {
            self.attempts = 0;
        }
    }

    /// Transport closed, either after opening or while connecting.
    pub fn on_close(&mut self) -> CloseAction {
        if self.state.is_terminal() {
            return CloseAction::Ignore;
        }

        self.attempts += 1;
        if self.attempts < self.max_attempts {
            let attempt = self.attempts;
            self.transition(SessionState::Reconnecting { attempt });
            debug!(
                "Reconnect {}/{} in {:?}",
                attempt,
                self.max_attempts.saturating_sub(1),
                self.delay
            );
            CloseAction::Reconnect {
                attempt,
                delay: self.delay,
            }
        } else {
            self.transition(SessionState::Failed);
            CloseAction::Fail {
                attempts: self.attempts,
            }
        }
    }

    /// Local teardown; the session is never re-armed afterwards.
    ///
    /// Returns false when the session was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.transition(SessionState::Closed)
    }

    /// Outbound messages are only written while open
    pub fn can_send(&self) -> bool {
        self.state.is_open()
    }

    fn transition(&mut self, target: SessionState) -> bool {
        if !self.state.can_transition_to(&target) {
            warn!("Invalid session transition {} -> {}", self.state, target);
            return false;
        }
        self.state = target;
        true
    }
}
