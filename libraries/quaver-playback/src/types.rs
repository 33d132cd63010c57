//! Core types for the playback engine

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Track metadata
///
/// Filled in once by the scanner (tag reader) and never mutated afterwards.
/// `duration_ms` is the metadata duration, which is authoritative for the UI
/// even when the backend disagrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// File path handed to the backend
    pub path: PathBuf,

    /// File size in bytes
    pub file_size: u64,

    /// Album name
    pub album: String,

    /// Artist name
    pub artist: String,

    /// Track title
    pub title: String,

    /// Duration from metadata, in milliseconds
    pub duration_ms: u64,

    /// Bitrate in kbit/s
    pub bitrate: u32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u16,

    /// Container/codec tag (e.g. "mp3", "flac")
    pub format: String,
}

impl Track {
    /// Create a track with only path and duration known
    pub fn new(path: impl Into<PathBuf>, duration_ms: u64) -> Self {
        let path = path.into();
        let format = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self {
            path,
            file_size: 0,
            album: String::new(),
            artist: String::new(),
            title: String::new(),
            duration_ms,
            bitrate: 0,
            sample_rate: 44100,
            channels: 2,
            format,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Title for display, falling back to the file stem
    pub fn display_title(&self) -> String {
        if !self.title.is_empty() {
            return self.title.clone();
        }

        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Playback mode
///
/// Cycles Loop -> Random -> Repeat -> Loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Walk the playlist in order, wrapping at both ends
    Loop,

    /// Random pick, retraced through history
    Random,

    /// Same navigation as Random
    Repeat,
}

impl PlaybackMode {
    /// Cyclic successor
    pub fn next(self) -> Self {
        match self {
            PlaybackMode::Loop => PlaybackMode::Random,
            PlaybackMode::Random => PlaybackMode::Repeat,
            PlaybackMode::Repeat => PlaybackMode::Loop,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackMode::Loop => "loop",
            PlaybackMode::Random => "random",
            PlaybackMode::Repeat => "repeat",
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaybackMode {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loop" => Ok(PlaybackMode::Loop),
            "random" => Ok(PlaybackMode::Random),
            "repeat" => Ok(PlaybackMode::Repeat),
            other => Err(PlaybackError::Config(format!(
                "unknown playback mode '{}'",
                other
            ))),
        }
    }
}

/// Engine-side player state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// Nothing playing (initial state)
    Stopped,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Initial volume (0-100, default: 80)
    pub volume: u8,

    /// Initial playback mode (default: Loop)
    pub mode: PlaybackMode,

    /// Seed for random navigation; `None` seeds from entropy
    pub seed: Option<u64>,

    /// Skip to the next track when the backend fails to play one (default: false)
    pub advance_on_failure: bool,

    /// Slack when deciding whether a stop was the natural end of a track (default: 0)
    pub end_of_track_tolerance_ms: u64,
}

impl PlaybackConfig {
    /// Reject values the engine cannot represent
    pub fn validate(&self) -> Result<()> {
        if self.volume > 100 {
            return Err(PlaybackError::Config(format!(
                "volume must be within 0-100, got {}",
                self.volume
            )));
        }
        Ok(())
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: 80,
            mode: PlaybackMode::Loop,
            seed: None,
            advance_on_failure: false,
            end_of_track_tolerance_ms: 0,
        }
    }
}
