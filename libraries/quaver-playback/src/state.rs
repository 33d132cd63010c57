//! Player state machine
//!
//! The engine never sets its own state from a command. Commands go to the
//! backend; the state only moves when the backend reports a transition.

use crate::types::PlayerState;
use serde::{Deserialize, Serialize};

/// State signal as reported by the audio backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendState {
    Playing,
    Paused,
    Stopped,
}

impl From<BackendState> for PlayerState {
    fn from(state: BackendState) -> Self {
        match state {
            BackendState::Playing => PlayerState::Playing,
            BackendState::Paused => PlayerState::Paused,
            BackendState::Stopped => PlayerState::Stopped,
        }
    }
}

/// A state change that actually happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PlayerState,
    pub to: PlayerState,
}

/// Why the backend entered Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// Backend position reached backend duration
    EndOfTrack,

    /// The engine asked for the stop
    Requested,

    /// The backend reported a failure for this track
    Failed,

    /// Stopped mid-track without being asked to
    Interrupted,
}

impl StopCause {
    /// Only a natural end advances to the next track
    pub fn advances(self) -> bool {
        self == StopCause::EndOfTrack
    }
}

/// Playing/Paused/Stopped, driven by backend events
#[derive(Debug, Clone)]
pub struct PlaybackStateMachine {
    state: PlayerState,

    /// Set by an explicit stop command, cleared when a track starts
    stop_requested: bool,

    /// Set by a backend failure, cleared when a track starts
    failed: bool,
}

impl PlaybackStateMachine {
    pub fn new() -> Self {
        Self {
            state: PlayerState::Stopped,
            stop_requested: false,
            failed: false,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Apply a backend state signal
    ///
    /// Returns `None` for duplicate signals that do not change state.
    pub fn on_backend_state(&mut self, signal: BackendState) -> Option<Transition> {
        let to = PlayerState::from(signal);
        if to == self.state {
            return None;
        }

        let from = std::mem::replace(&mut self.state, to);
        Some(Transition { from, to })
    }

    /// Note that the engine itself requested a stop
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Note that the backend failed on the current track
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// A track was (re)started; forget why the last one stopped
    pub fn clear_stop_flags(&mut self) {
        self.stop_requested = false;
        self.failed = false;
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Classify a stop from the last backend position and duration
    pub fn stop_cause(
        &self,
        backend_position: Option<u64>,
        backend_duration: Option<u64>,
        tolerance_ms: u64,
    ) -> StopCause {
        if self.failed {
            return StopCause::Failed;
        }
        if self.stop_requested {
            return StopCause::Requested;
        }

        match (backend_position, backend_duration) {
            (Some(position), Some(duration))
                if duration > 0 && position.saturating_add(tolerance_ms) >= duration =>
            {
                StopCause::EndOfTrack
            }
            _ => StopCause::Interrupted,
        }
    }
}

impl Default for PlaybackStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
