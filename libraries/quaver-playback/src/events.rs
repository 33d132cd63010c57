//! Playback events
//!
//! Notifications the controller queues for its collaborators (UI, status
//! bar, MPRIS bridge...). All times are in the real time domain.
//! Collaborators collect them with `PlaybackController::drain_events`.

use crate::types::{PlaybackMode, PlayerState};
use serde::{Deserialize, Serialize};

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Player state changed
    StateChanged {
        /// The new state
        state: PlayerState,
    },

    /// Current track index changed
    TrackIndexChanged {
        /// Index before the change (`None` = no track)
        old: Option<usize>,
        /// Index after the change
        new: Option<usize>,
    },

    /// Real duration of the current track is known or changed
    DurationChanged {
        /// Duration in milliseconds
        duration_ms: u64,
    },

    /// Playback position moved, at the backend's reporting cadence
    PositionChanged {
        /// Position in milliseconds
        position_ms: u64,
    },

    /// Volume or mute changed
    VolumeChanged {
        /// New volume level (0-100)
        level: u8,
        /// Whether audio is muted
        muted: bool,
    },

    /// Current (playing) playlist changed
    PlaylistIndexChanged {
        old: Option<usize>,
        new: Option<usize>,
    },

    /// Front (displayed) playlist changed
    FrontPlaylistChanged {
        old: Option<usize>,
        new: Option<usize>,
    },

    /// Playback mode changed
    PlaybackModeChanged {
        /// The new mode
        mode: PlaybackMode,
    },

    /// Track played through to its end
    TrackFinished {
        /// Index of the finished track
        index: usize,
    },

    /// Backend could not play a track
    PlaybackFailed {
        /// Index of the failed track, if one was current
        index: Option<usize>,
        /// Backend's description of the failure
        message: String,
    },
}

impl PlaybackEvent {
    /// Events that merely echo a backend state transition
    pub fn is_state_echo(&self) -> bool {
        matches!(self, PlaybackEvent::StateChanged { .. })
    }
}
