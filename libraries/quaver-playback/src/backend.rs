//! Audio backend abstraction
//!
//! The engine never decodes audio. It drives a backend through
//! fire-and-forget commands and learns what happened from typed events the
//! backend pushes onto a channel. The controller drains that channel on its
//! own thread, so event handling never re-enters a command.
//!
//! All times crossing this boundary are in the backend's own time domain.

use crate::state::BackendState;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Commands the engine issues to an audio backend
///
/// None of these block or return errors. Completion (or failure) shows up
/// later as a [`BackendEvent`].
pub trait AudioBackend {
    /// Open a file and get ready to play it
    fn load_track(&mut self, path: &Path);

    /// Start or resume playback
    fn play(&mut self);

    /// Pause playback
    fn pause(&mut self);

    /// Stop playback
    fn stop(&mut self);

    /// Seek to a position in backend milliseconds
    fn seek(&mut self, raw_position_ms: u64);

    /// Set output volume (0-100)
    fn set_volume(&mut self, level: u8);
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn load_track(&mut self, path: &Path) {
        (**self).load_track(path);
    }

    fn play(&mut self) {
        (**self).play();
    }

    fn pause(&mut self) {
        (**self).pause();
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn seek(&mut self, raw_position_ms: u64) {
        (**self).seek(raw_position_ms);
    }

    fn set_volume(&mut self, level: u8) {
        (**self).set_volume(level);
    }
}

/// Events a backend reports, in its own time domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendEvent {
    /// Playback state changed
    StateChanged(BackendState),

    /// Backend's idea of the track duration (ms)
    DurationChanged(u64),

    /// Backend's idea of the current position (ms)
    PositionChanged(u64),

    /// Track could not be loaded or decoded
    Failed(String),
}

/// Backend-side handle for reporting events
#[derive(Debug, Clone)]
pub struct BackendEventSender {
    tx: Sender<BackendEvent>,
}

impl BackendEventSender {
    /// Queue an event for the controller
    ///
    /// Returns false if the controller is gone.
    pub fn send(&self, event: BackendEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Controller-side end of the backend event queue
#[derive(Debug)]
pub struct BackendEventReceiver {
    rx: Receiver<BackendEvent>,
}

impl BackendEventReceiver {
    /// Next queued event, without blocking
    pub fn try_recv(&self) -> Option<BackendEvent> {
        self.rx.try_recv().ok()
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create a connected sender/receiver pair
///
/// Events are delivered in the order they were sent.
pub fn backend_channel() -> (BackendEventSender, BackendEventReceiver) {
    let (tx, rx) = unbounded();
    (BackendEventSender { tx }, BackendEventReceiver { rx })
}
