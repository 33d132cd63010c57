//! Error types for the playback engine

use thiserror::Error;

/// Playback errors
///
/// Every variant is a hard failure for the caller: bad indices are never
/// clamped. Expected empty states (empty playlist, nothing playing) are not
/// errors and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Track index outside the playlist
    #[error("Track index {index} out of bounds (playlist has {len} tracks)")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Playlist index outside the registry
    #[error("Playlist index {index} out of bounds ({count} playlists)")]
    PlaylistOutOfBounds { index: usize, count: usize },

    /// Operation needs a current playlist
    #[error("No current playlist")]
    NoPlaylist,

    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Seek target beyond the real duration of the track
    #[error("Invalid seek position: {position_ms}ms (track is {duration_ms}ms)")]
    InvalidSeek { position_ms: u64, duration_ms: u64 },

    /// Non-zero seek issued before the backend reported its duration
    #[error("Cannot seek to {position_ms}ms before the backend reported a duration")]
    Uncalibrated { position_ms: u64 },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
