//! Quaver - Playback Engine
//!
//! Backend-agnostic playback engine for Quaver.
//!
//! This crate provides:
//! - Playlists with a playing ("current") and a displayed ("front") selection
//! - Navigation in Loop, Random and Repeat modes
//! - Navigation history, so previous/next retrace random picks
//! - Time-domain correction between metadata durations and backend durations
//! - A Playing/Paused/Stopped state machine driven by backend events
//! - Auto-advance at natural end of track
//! - Volume control (0-100, mute/unmute)
//!
//! # Architecture
//!
//! `quaver-playback` never decodes or outputs audio:
//! - Audio backends implement [`AudioBackend`] (fire-and-forget commands)
//! - Backends report back through a [`backend_channel`]
//! - The UI collects [`PlaybackEvent`]s with `drain_events`
//!
//! Everything on the controller side runs on one thread.
//!
//! # Example: Basic Playback
//!
//! ```rust
//! use quaver_playback::{AudioBackend, PlaybackConfig, PlaybackController, Playlist, Track};
//! use std::path::{Path, PathBuf};
//!
//! struct NullBackend;
//!
//! impl AudioBackend for NullBackend {
//!     fn load_track(&mut self, _path: &Path) {}
//!     fn play(&mut self) {}
//!     fn pause(&mut self) {}
//!     fn stop(&mut self) {}
//!     fn seek(&mut self, _raw_position_ms: u64) {}
//!     fn set_volume(&mut self, _level: u8) {}
//! }
//!
//! let mut controller = PlaybackController::new(NullBackend, PlaybackConfig::default());
//!
//! controller.add_playlist(Playlist::with_tracks(
//!     "Favourites",
//!     vec![
//!         Track::new(PathBuf::from("/music/a.flac"), 200_000).with_title("A"),
//!         Track::new(PathBuf::from("/music/b.flac"), 180_000).with_title("B"),
//!     ],
//! ));
//!
//! controller.play();
//! assert_eq!(controller.current_track_index(), Some(0));
//!
//! controller.play_next();
//! assert_eq!(controller.current_track_index(), Some(1));
//!
//! // Loop mode wraps around
//! controller.play_next();
//! assert_eq!(controller.current_track_index(), Some(0));
//! ```
//!
//! # Example: Backend Events
//!
//! ```rust
//! use quaver_playback::{
//!     backend_channel, AudioBackend, BackendEvent, BackendState, PlaybackConfig,
//!     PlaybackController, Playlist, Track,
//! };
//! use std::path::{Path, PathBuf};
//!
//! # struct NullBackend;
//! # impl AudioBackend for NullBackend {
//! #     fn load_track(&mut self, _path: &Path) {}
//! #     fn play(&mut self) {}
//! #     fn pause(&mut self) {}
//! #     fn stop(&mut self) {}
//! #     fn seek(&mut self, _raw_position_ms: u64) {}
//! #     fn set_volume(&mut self, _level: u8) {}
//! # }
//! let (tx, rx) = backend_channel();
//! let mut controller = PlaybackController::new(NullBackend, PlaybackConfig::default());
//! controller.attach_backend_events(rx);
//! controller.add_playlist(Playlist::with_tracks(
//!     "VBR",
//!     vec![Track::new(PathBuf::from("/music/vbr.mp3"), 200_000)],
//! ));
//! controller.play();
//!
//! // The backend thinks the file is shorter than its tags say
//! tx.send(BackendEvent::StateChanged(BackendState::Playing));
//! tx.send(BackendEvent::DurationChanged(196_000));
//! controller.process_backend_events();
//! assert_eq!(controller.duration_ms(), 200_000);
//!
//! // Seeks are issued in backend time, positions come back in real time
//! controller.seek(100_000).unwrap();
//! tx.send(BackendEvent::PositionChanged(98_000));
//! controller.process_backend_events();
//! assert_eq!(controller.position_ms(), 100_000);
//! ```

mod backend;
mod controller;
mod corrector;
mod error;
mod events;
mod history;
mod playlist;
mod state;
pub mod types;
mod volume;

// Public exports
pub use backend::{
    backend_channel, AudioBackend, BackendEvent, BackendEventReceiver, BackendEventSender,
};
pub use controller::PlaybackController;
pub use corrector::TimeDomainCorrector;
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use history::NavigationHistory;
pub use playlist::{Playlist, PlaylistRegistry, SortKey};
pub use state::{BackendState, PlaybackStateMachine, StopCause, Transition};
pub use types::{PlaybackConfig, PlaybackMode, PlayerState, Track};
pub use volume::Volume;
