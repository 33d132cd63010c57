//! Playback controller - the engine facade
//!
//! Composes playlists, navigation history, the time-domain corrector and
//! the state machine. Collaborators call commands on it, the backend feeds
//! it events, and it queues notifications in real time for the UI.
//!
//! Everything runs on one thread. The controller is created once and
//! handed to whoever needs it by reference; there is no global accessor.

use crate::{
    backend::{AudioBackend, BackendEvent, BackendEventReceiver},
    corrector::TimeDomainCorrector,
    error::{PlaybackError, Result},
    events::PlaybackEvent,
    history::NavigationHistory,
    playlist::{index_after_removal, Playlist, PlaylistRegistry, SortKey},
    state::{BackendState, PlaybackStateMachine},
    types::{PlaybackConfig, PlaybackMode, PlayerState, Track},
    volume::Volume,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use tracing::{debug, info, trace, warn};

/// Central playback engine
///
/// Generic over the audio backend it drives. Backend events arrive either
/// through an attached [`BackendEventReceiver`] (drained by
/// [`process_backend_events`](Self::process_backend_events)) or directly
/// through [`handle_backend_event`](Self::handle_backend_event).
pub struct PlaybackController<B: AudioBackend> {
    backend: B,
    backend_events: Option<BackendEventReceiver>,
    config: PlaybackConfig,

    // Playlists and navigation
    registry: PlaylistRegistry,
    history: NavigationHistory,
    mode: PlaybackMode,
    current_track: Option<usize>,
    next_candidate: Option<usize>,
    previous_candidate: Option<usize>,
    rng: StdRng,

    // Player state
    machine: PlaybackStateMachine,
    corrector: TimeDomainCorrector,
    volume: Volume,

    // Raw backend reports for the loaded track
    backend_position: Option<u64>,
    backend_duration: Option<u64>,

    // Last values sent out, for de-duplication
    position_ms: u64,
    emitted_duration: Option<u64>,

    // Held only while handling a backend event triggers a nested command
    notifications_suppressed: bool,

    // Failures since the backend last acknowledged Playing
    consecutive_failures: usize,

    // Event queue for UI synchronization
    pending_events: Vec<PlaybackEvent>,
}

impl<B: AudioBackend> PlaybackController<B> {
    /// Create a controller driving `backend`
    ///
    /// The initial volume is pushed to the backend right away.
    pub fn new(mut backend: B, config: PlaybackConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let volume = Volume::new(config.volume);
        backend.set_volume(volume.effective_level());

        Self {
            backend,
            backend_events: None,
            mode: config.mode,
            config,
            registry: PlaylistRegistry::new(),
            history: NavigationHistory::new(),
            current_track: None,
            next_candidate: None,
            previous_candidate: None,
            rng,
            machine: PlaybackStateMachine::new(),
            corrector: TimeDomainCorrector::new(),
            volume,
            backend_position: None,
            backend_duration: None,
            position_ms: 0,
            emitted_duration: None,
            notifications_suppressed: false,
            consecutive_failures: 0,
            pending_events: Vec::new(),
        }
    }

    /// Attach the receiving end of a [`backend_channel`](crate::backend_channel)
    pub fn attach_backend_events(&mut self, events: BackendEventReceiver) {
        self.backend_events = Some(events);
    }

    // ===== Playback Control =====

    /// Start or resume playback
    ///
    /// With no current track this picks one the same way `play_next` does.
    pub fn play(&mut self) {
        if self.current_track.is_none() {
            self.play_next();
            return;
        }

        if self.machine.state() == PlayerState::Playing {
            return;
        }

        self.machine.clear_stop_flags();
        self.backend.play();
    }

    /// Pause playback (no-op unless playing)
    pub fn pause(&mut self) {
        if self.machine.state() == PlayerState::Playing {
            self.backend.pause();
        }
    }

    /// Stop playback
    ///
    /// Never touches navigation history.
    pub fn stop(&mut self) {
        self.machine.request_stop();
        self.backend.stop();
    }

    /// Load and play the track at `index` of the current playlist
    ///
    /// Records the choice in history moving forward.
    pub fn play_track_at_index(&mut self, index: usize) -> Result<()> {
        let len = self
            .registry
            .current_playlist()
            .map(Playlist::len)
            .ok_or(PlaybackError::NoPlaylist)?;

        if index >= len {
            return Err(PlaybackError::IndexOutOfBounds { index, len });
        }

        self.load_and_play(index, 1);
        Ok(())
    }

    /// Move to the next track (no-op on an empty playlist)
    pub fn play_next(&mut self) {
        match self.next_candidate {
            Some(index) => self.load_and_play(index, 1),
            None => debug!("No next track to play"),
        }
    }

    /// Move to the previous track (no-op on an empty playlist)
    ///
    /// Steps the history cursor backwards, so repeated calls retrace what
    /// `play_next` produced in Random and Repeat modes.
    pub fn play_previous(&mut self) {
        match self.previous_candidate {
            Some(index) => self.load_and_play(index, -1),
            None => debug!("No previous track to play"),
        }
    }

    /// Seek within the current track, in real milliseconds
    ///
    /// Targets beyond the track's real duration are rejected, not clamped.
    pub fn seek(&mut self, position_ms: u64) -> Result<()> {
        if self.current_track.is_none() {
            return Err(PlaybackError::NoTrackLoaded);
        }

        let duration_ms = self.corrector.real_duration();
        if duration_ms > 0 && position_ms > duration_ms {
            return Err(PlaybackError::InvalidSeek {
                position_ms,
                duration_ms,
            });
        }

        let mapped = self.corrector.seek_to(position_ms)?;
        debug!(real = position_ms, backend = mapped, "Seeking");
        self.backend.seek(mapped);
        self.set_position(position_ms);
        Ok(())
    }

    /// Change how next/previous pick tracks
    ///
    /// Does not interrupt playback. History is re-anchored on the current
    /// track so "previous" starts from where we are.
    pub fn set_playback_mode(&mut self, mode: PlaybackMode) {
        if self.mode == mode {
            return;
        }

        info!(from = %self.mode, to = %mode, "Playback mode changed");
        self.mode = mode;
        self.history.reset(true);
        self.refresh_candidates();
        self.emit(PlaybackEvent::PlaybackModeChanged { mode });
    }

    /// Advance to the next playback mode (Loop -> Random -> Repeat -> Loop)
    pub fn cycle_playback_mode(&mut self) -> PlaybackMode {
        let mode = self.mode.next();
        self.set_playback_mode(mode);
        mode
    }

    // ===== Volume =====

    /// Set volume, clamped to 0-100
    pub fn set_volume(&mut self, level: i32) {
        self.volume.set_level(level);
        self.apply_volume();
    }

    pub fn mute(&mut self) {
        self.volume.mute();
        self.apply_volume();
    }

    pub fn unmute(&mut self) {
        self.volume.unmute();
        self.apply_volume();
    }

    pub fn toggle_mute(&mut self) {
        self.volume.toggle_mute();
        self.apply_volume();
    }

    fn apply_volume(&mut self) {
        self.backend.set_volume(self.volume.effective_level());
        self.emit(PlaybackEvent::VolumeChanged {
            level: self.volume.level(),
            muted: self.volume.is_muted(),
        });
    }

    // ===== Playlists =====

    /// Add a playlist, returning its index
    ///
    /// The first playlist becomes current.
    pub fn add_playlist(&mut self, playlist: Playlist) -> usize {
        let old_current = self.registry.current_index();
        let old_front = self.registry.front_index();
        let index = self.registry.add(playlist);

        self.emit_playlist_moves(old_current, old_front);
        self.refresh_candidates();
        index
    }

    /// Create an empty playlist, returning its index
    pub fn create_playlist(&mut self, name: impl Into<String>) -> usize {
        self.add_playlist(Playlist::new(name))
    }

    /// Remove a playlist
    ///
    /// Removing the playing playlist stops playback and clears the current
    /// track.
    pub fn remove_playlist(&mut self, index: usize) -> Result<Playlist> {
        let old_current = self.registry.current_index();
        let old_front = self.registry.front_index();
        let playlist = self.registry.remove(index)?;

        if old_current == Some(index) {
            self.stop();
            self.history.reset(false);
            self.set_current_track(None);
        }

        self.emit_playlist_moves(old_current, old_front);
        self.refresh_candidates();
        Ok(playlist)
    }

    /// Switch the playing playlist
    ///
    /// Navigation history is cleared and there is no current track until
    /// the next move. The backend keeps playing whatever it has.
    pub fn set_current_playlist(&mut self, index: usize) -> Result<()> {
        let old = self.registry.set_current(index)?;
        if old == Some(index) {
            return Ok(());
        }

        info!(?old, new = index, "Current playlist changed");
        self.history.reset(false);
        self.set_current_track(None);
        self.emit(PlaybackEvent::PlaylistIndexChanged {
            old,
            new: Some(index),
        });
        self.refresh_candidates();
        Ok(())
    }

    /// Switch the displayed playlist (never affects playback)
    pub fn set_front_playlist(&mut self, index: usize) -> Result<()> {
        let old = self.registry.set_front(index)?;
        if old != Some(index) {
            self.emit(PlaybackEvent::FrontPlaylistChanged {
                old,
                new: Some(index),
            });
        }
        Ok(())
    }

    pub fn append_tracks(&mut self, playlist: usize, tracks: Vec<Track>) -> Result<()> {
        self.registry.append_tracks(playlist, tracks)?;
        if self.is_current_playlist(playlist) {
            self.refresh_candidates();
        }
        Ok(())
    }

    /// Remove tracks by index set
    ///
    /// If the playing track is removed there is no current track until the
    /// next move; the backend finishes it undisturbed.
    pub fn remove_tracks(
        &mut self,
        playlist: usize,
        indices: &BTreeSet<usize>,
    ) -> Result<Vec<Track>> {
        let removed = self.registry.remove_tracks(playlist, indices)?;

        if self.is_current_playlist(playlist) {
            let moved = self
                .current_track
                .and_then(|current| index_after_removal(current, indices));
            self.set_current_track(moved);
            self.reanchor_history();
            self.refresh_candidates();
        }

        Ok(removed)
    }

    /// Remove the selected tracks of a playlist
    pub fn remove_selected(&mut self, playlist: usize) -> Result<Vec<Track>> {
        let selected: BTreeSet<usize> = self
            .registry
            .get(playlist)
            .ok_or(PlaybackError::PlaylistOutOfBounds {
                index: playlist,
                count: self.registry.len(),
            })?
            .selected()
            .collect();

        self.remove_tracks(playlist, &selected)
    }

    /// Sort a playlist in place; the current track keeps playing at its new index
    pub fn sort_tracks(&mut self, playlist: usize, key: SortKey) -> Result<()> {
        let new_position = self.registry.sort_tracks(playlist, key)?;

        if self.is_current_playlist(playlist) {
            let moved = self.current_track.map(|current| new_position[current]);
            self.set_current_track(moved);
            self.reanchor_history();
            self.refresh_candidates();
        }

        Ok(())
    }

    pub fn select(&mut self, playlist: usize, track: usize) -> Result<()> {
        self.registry.select(playlist, track)
    }

    pub fn deselect(&mut self, playlist: usize, track: usize) -> Result<()> {
        self.registry.deselect(playlist, track)
    }

    pub fn clear_selection(&mut self, playlist: usize) -> Result<()> {
        self.registry.clear_selection(playlist)
    }

    // ===== Backend Events =====

    /// Drain the attached backend event queue
    ///
    /// Returns the number of events handled.
    pub fn process_backend_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(event) = self
                .backend_events
                .as_ref()
                .and_then(BackendEventReceiver::try_recv)
            else {
                break;
            };
            self.handle_backend_event(event);
            handled += 1;
        }
        handled
    }

    /// Apply a single backend event
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::StateChanged(signal) => self.on_backend_state(signal),
            BackendEvent::DurationChanged(duration) => self.on_backend_duration(duration),
            BackendEvent::PositionChanged(position) => self.on_backend_position(position),
            BackendEvent::Failed(message) => self.on_backend_failure(message),
        }
    }

    fn on_backend_state(&mut self, signal: BackendState) {
        let Some(transition) = self.machine.on_backend_state(signal) else {
            return;
        };
        debug!(from = ?transition.from, to = ?transition.to, "Player state changed");

        if transition.to == PlayerState::Playing {
            self.consecutive_failures = 0;
        }

        if transition.to != PlayerState::Stopped {
            self.emit(PlaybackEvent::StateChanged {
                state: transition.to,
            });
            return;
        }

        let cause = self.machine.stop_cause(
            self.backend_position,
            self.backend_duration,
            self.config.end_of_track_tolerance_ms,
        );
        debug!(?cause, "Playback stopped");

        if !cause.advances() {
            self.emit(PlaybackEvent::StateChanged {
                state: PlayerState::Stopped,
            });
            return;
        }

        if let Some(index) = self.current_track {
            info!(index, "Track finished, advancing");
            self.emit(PlaybackEvent::TrackFinished { index });
        }

        // Nothing to advance to: the stop is final and the UI must hear it
        if self.next_candidate.is_none() {
            self.emit(PlaybackEvent::StateChanged {
                state: PlayerState::Stopped,
            });
            return;
        }

        self.with_notifications_suppressed(|controller| {
            controller.emit(PlaybackEvent::StateChanged {
                state: PlayerState::Stopped,
            });
            controller.play_next();
        });
    }

    fn on_backend_duration(&mut self, backend_duration: u64) {
        self.backend_duration = Some(backend_duration);
        self.corrector.on_backend_duration_reported(backend_duration);

        let real = match self.corrector.real_duration() {
            0 => backend_duration,
            real => real,
        };
        if self.emitted_duration != Some(real) {
            self.emitted_duration = Some(real);
            self.emit(PlaybackEvent::DurationChanged { duration_ms: real });
        }
    }

    fn on_backend_position(&mut self, backend_position: u64) {
        self.backend_position = Some(backend_position);
        let real = self.corrector.on_backend_position_reported(backend_position);
        trace!(backend = backend_position, real, "Position report");
        self.set_position(real);
    }

    fn on_backend_failure(&mut self, message: String) {
        warn!(index = ?self.current_track, %message, "Backend failed to play track");
        self.machine.mark_failed();
        self.emit(PlaybackEvent::PlaybackFailed {
            index: self.current_track,
            message,
        });

        if !self.config.advance_on_failure {
            return;
        }

        self.consecutive_failures += 1;
        let len = self.registry.current_playlist().map_or(0, Playlist::len);
        if self.consecutive_failures >= len {
            warn!(
                failures = self.consecutive_failures,
                "Every track failed in a row, not advancing"
            );
            self.emit(PlaybackEvent::StateChanged {
                state: self.machine.state(),
            });
            return;
        }

        self.with_notifications_suppressed(|controller| controller.play_next());
    }

    // ===== State Queries =====

    pub fn state(&self) -> PlayerState {
        self.machine.state()
    }

    /// Index of the current track in the current playlist
    pub fn current_track_index(&self) -> Option<usize> {
        self.current_track
    }

    pub fn current_track(&self) -> Option<&Track> {
        let index = self.current_track?;
        self.registry.current_playlist()?.get(index)
    }

    pub fn playback_mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Volume level (0-100), regardless of mute
    pub fn volume(&self) -> u8 {
        self.volume.level()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    /// Last known position, in real milliseconds
    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Real (metadata) duration of the current track
    pub fn duration_ms(&self) -> u64 {
        self.corrector.real_duration()
    }

    /// Backend/real time ratio for the current track, once calibrated
    pub fn scale_factor(&self) -> Option<f64> {
        self.corrector.scale_factor()
    }

    /// Track `play_next` would move to
    pub fn next_candidate(&self) -> Option<usize> {
        self.next_candidate
    }

    /// Track `play_previous` would move to
    pub fn previous_candidate(&self) -> Option<usize> {
        self.previous_candidate
    }

    pub fn playlists(&self) -> &PlaylistRegistry {
        &self.registry
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    // ===== Events =====

    /// Drain all pending events
    ///
    /// Returns everything emitted since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    // ===== Internals =====

    /// The single place a track gets loaded
    fn load_and_play(&mut self, index: usize, delta: i64) {
        let Some(track) = self
            .registry
            .current_playlist()
            .and_then(|playlist| playlist.get(index))
        else {
            warn!(index, "Refusing to load a track outside the current playlist");
            return;
        };
        let path = track.path.clone();
        let duration_ms = track.duration_ms;

        info!(index, path = %path.display(), duration_ms, "Loading track");

        // A load the user asked for starts a fresh run of failures
        if !self.notifications_suppressed {
            self.consecutive_failures = 0;
        }

        self.machine.clear_stop_flags();
        self.corrector.on_track_loaded(duration_ms);
        self.backend_position = None;
        self.backend_duration = None;
        self.backend.load_track(&path);

        self.history.record_choice(index, delta);
        let old = self.current_track.replace(index);
        self.emit(PlaybackEvent::TrackIndexChanged {
            old,
            new: Some(index),
        });

        self.emitted_duration = Some(duration_ms);
        self.emit(PlaybackEvent::DurationChanged { duration_ms });
        self.position_ms = 0;
        self.emit(PlaybackEvent::PositionChanged { position_ms: 0 });

        self.backend.play();
        self.refresh_candidates();
    }

    fn set_current_track(&mut self, index: Option<usize>) {
        let old = std::mem::replace(&mut self.current_track, index);
        if old != index {
            self.emit(PlaybackEvent::TrackIndexChanged { old, new: index });
        }
    }

    fn set_position(&mut self, position_ms: u64) {
        if self.position_ms != position_ms {
            self.position_ms = position_ms;
            self.emit(PlaybackEvent::PositionChanged { position_ms });
        }
    }

    /// Re-resolve what next/previous would pick
    fn refresh_candidates(&mut self) {
        let len = self.registry.current_playlist().map_or(0, Playlist::len);

        self.next_candidate =
            self.history
                .resolve_next(self.mode, self.current_track, len, &mut self.rng);
        self.previous_candidate =
            self.history
                .resolve_previous(self.mode, self.current_track, len, &mut self.rng);

        trace!(
            next = ?self.next_candidate,
            previous = ?self.previous_candidate,
            "Navigation candidates"
        );
    }

    /// Start history over from the current track after indices moved
    fn reanchor_history(&mut self) {
        match self.current_track {
            Some(index) => self.history.reanchor(index),
            None => self.history.reset(false),
        }
    }

    fn is_current_playlist(&self, playlist: usize) -> bool {
        self.registry.current_index() == Some(playlist)
    }

    fn emit_playlist_moves(&mut self, old_current: Option<usize>, old_front: Option<usize>) {
        let new_current = self.registry.current_index();
        if new_current != old_current {
            self.emit(PlaybackEvent::PlaylistIndexChanged {
                old: old_current,
                new: new_current,
            });
        }

        let new_front = self.registry.front_index();
        if new_front != old_front {
            self.emit(PlaybackEvent::FrontPlaylistChanged {
                old: old_front,
                new: new_front,
            });
        }
    }

    /// Run a command issued while handling a backend event
    ///
    /// State-change echoes produced inside are dropped so the UI does not
    /// re-enter its own state handler.
    fn with_notifications_suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.notifications_suppressed, true);
        let result = f(self);
        self.notifications_suppressed = previous;
        result
    }

    fn emit(&mut self, event: PlaybackEvent) {
        if self.notifications_suppressed && event.is_state_echo() {
            trace!(?event, "Suppressed echo notification");
            return;
        }
        self.pending_events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    /// Backend that only records the commands it receives
    #[derive(Debug, Default)]
    struct RecordingBackend {
        commands: Vec<String>,
    }

    impl AudioBackend for RecordingBackend {
        fn load_track(&mut self, path: &Path) {
            self.commands.push(format!("load {}", path.display()));
        }

        fn play(&mut self) {
            self.commands.push("play".to_string());
        }

        fn pause(&mut self) {
            self.commands.push("pause".to_string());
        }

        fn stop(&mut self) {
            self.commands.push("stop".to_string());
        }

        fn seek(&mut self, raw_position_ms: u64) {
            self.commands.push(format!("seek {}", raw_position_ms));
        }

        fn set_volume(&mut self, level: u8) {
            self.commands.push(format!("volume {}", level));
        }
    }

    fn create_test_track(name: &str, duration_ms: u64) -> Track {
        Track::new(PathBuf::from(format!("/music/{}.mp3", name)), duration_ms).with_title(name)
    }

    fn controller_with(names: &[&str], mode: PlaybackMode) -> PlaybackController<RecordingBackend> {
        let config = PlaybackConfig {
            mode,
            seed: Some(1234),
            ..Default::default()
        };
        let mut controller = PlaybackController::new(RecordingBackend::default(), config);
        let tracks = names
            .iter()
            .map(|name| create_test_track(name, 200_000))
            .collect();
        controller.add_playlist(Playlist::with_tracks("test", tracks));
        controller.drain_events();
        controller
    }

    #[test]
    fn create_controller() {
        let controller = PlaybackController::new(RecordingBackend::default(), PlaybackConfig::default());
        assert_eq!(controller.state(), PlayerState::Stopped);
        assert_eq!(controller.volume(), 80);
        assert_eq!(controller.current_track_index(), None);
        assert_eq!(controller.backend().commands, vec!["volume 80"]);
    }

    #[test]
    fn play_without_track_starts_first() {
        let mut controller = controller_with(&["a", "b", "c"], PlaybackMode::Loop);

        controller.play();

        assert_eq!(controller.current_track_index(), Some(0));
        assert_eq!(controller.current_track().unwrap().title, "a");
        assert!(controller
            .backend()
            .commands
            .ends_with(&["load /music/a.mp3".to_string(), "play".to_string()]));
    }

    #[test]
    fn play_is_idempotent_while_playing() {
        let mut controller = controller_with(&["a"], PlaybackMode::Loop);
        controller.play();
        controller.handle_backend_event(BackendEvent::StateChanged(BackendState::Playing));
        let issued = controller.backend().commands.len();

        controller.play();
        assert_eq!(controller.backend().commands.len(), issued);
    }

    #[test]
    fn pause_only_when_playing() {
        let mut controller = controller_with(&["a"], PlaybackMode::Loop);
        controller.pause();
        assert!(!controller.backend().commands.contains(&"pause".to_string()));

        controller.play();
        controller.handle_backend_event(BackendEvent::StateChanged(BackendState::Playing));
        controller.pause();
        assert_eq!(controller.backend().commands.last().unwrap(), "pause");
    }

    #[test]
    fn play_track_at_index_rejects_bad_index() {
        let mut controller = controller_with(&["a", "b"], PlaybackMode::Loop);
        let err = controller.play_track_at_index(2).unwrap_err();
        assert_eq!(err, PlaybackError::IndexOutOfBounds { index: 2, len: 2 });
        assert_eq!(controller.current_track_index(), None);
    }

    #[test]
    fn play_track_at_index_without_playlist() {
        let mut controller =
            PlaybackController::new(RecordingBackend::default(), PlaybackConfig::default());
        assert_eq!(controller.play_track_at_index(0), Err(PlaybackError::NoPlaylist));
    }

    #[test]
    fn track_change_notifications() {
        let mut controller = controller_with(&["a", "b"], PlaybackMode::Loop);
        controller.play_track_at_index(1).unwrap();

        let events = controller.drain_events();
        assert_eq!(
            events,
            vec![
                PlaybackEvent::TrackIndexChanged {
                    old: None,
                    new: Some(1)
                },
                PlaybackEvent::DurationChanged {
                    duration_ms: 200_000
                },
                PlaybackEvent::PositionChanged { position_ms: 0 },
            ]
        );
    }

    #[test]
    fn previous_walks_history_backwards() {
        let mut controller = controller_with(&["a", "b", "c", "d"], PlaybackMode::Loop);
        controller.play_track_at_index(0).unwrap();
        controller.play_next();
        assert_eq!(controller.history().position(), 1);

        controller.play_previous();
        assert_eq!(controller.current_track_index(), Some(0));
        assert_eq!(controller.history().position(), 0);
    }

    #[test]
    fn stop_requests_backend_stop_and_keeps_history() {
        let mut controller = controller_with(&["a", "b"], PlaybackMode::Random);
        controller.play();
        controller.play_next();
        let before: Vec<_> = controller.history().entries().collect();
        let position = controller.history().position();

        controller.stop();

        assert_eq!(controller.backend().commands.last().unwrap(), "stop");
        assert_eq!(controller.history().entries().collect::<Vec<_>>(), before);
        assert_eq!(controller.history().position(), position);
    }

    #[test]
    fn seek_requires_track() {
        let mut controller = controller_with(&["a"], PlaybackMode::Loop);
        assert_eq!(controller.seek(0), Err(PlaybackError::NoTrackLoaded));
    }

    #[test]
    fn seek_beyond_duration_fails() {
        let mut controller = controller_with(&["a"], PlaybackMode::Loop);
        controller.play();

        let err = controller.seek(200_001).unwrap_err();
        assert_eq!(
            err,
            PlaybackError::InvalidSeek {
                position_ms: 200_001,
                duration_ms: 200_000
            }
        );
    }

    #[test]
    fn seek_is_mapped_to_backend_time() {
        let mut controller = controller_with(&["a"], PlaybackMode::Loop);
        controller.play();
        controller.handle_backend_event(BackendEvent::DurationChanged(196_000));

        controller.seek(100_000).unwrap();
        assert_eq!(controller.backend().commands.last().unwrap(), "seek 98000");
        assert_eq!(controller.position_ms(), 100_000);
    }

    #[test]
    fn volume_is_clamped_and_forwarded() {
        let mut controller = controller_with(&["a"], PlaybackMode::Loop);

        controller.set_volume(140);
        assert_eq!(controller.volume(), 100);
        controller.set_volume(-5);
        assert_eq!(controller.volume(), 0);
        assert_eq!(controller.backend().commands.last().unwrap(), "volume 0");

        controller.set_volume(60);
        controller.mute();
        assert_eq!(controller.backend().commands.last().unwrap(), "volume 0");
        assert_eq!(controller.volume(), 60);

        controller.toggle_mute();
        assert_eq!(controller.backend().commands.last().unwrap(), "volume 60");

        let events = controller.drain_events();
        assert_eq!(
            events.last(),
            Some(&PlaybackEvent::VolumeChanged {
                level: 60,
                muted: false
            })
        );
    }

    #[test]
    fn mode_change_does_not_interrupt() {
        let mut controller = controller_with(&["a", "b"], PlaybackMode::Loop);
        controller.play();
        let issued = controller.backend().commands.len();

        assert_eq!(controller.cycle_playback_mode(), PlaybackMode::Random);
        assert_eq!(controller.backend().commands.len(), issued);
        assert_eq!(controller.current_track_index(), Some(0));
        assert!(controller
            .drain_events()
            .contains(&PlaybackEvent::PlaybackModeChanged {
                mode: PlaybackMode::Random
            }));
    }

    #[test]
    fn natural_end_advances_without_state_echo() {
        let mut controller = controller_with(&["a", "b"], PlaybackMode::Loop);
        controller.play();
        controller.handle_backend_event(BackendEvent::StateChanged(BackendState::Playing));
        controller.handle_backend_event(BackendEvent::DurationChanged(180_000));
        controller.handle_backend_event(BackendEvent::PositionChanged(180_000));
        controller.drain_events();

        controller.handle_backend_event(BackendEvent::StateChanged(BackendState::Stopped));

        assert_eq!(controller.current_track_index(), Some(1));
        let events = controller.drain_events();
        assert_eq!(events[0], PlaybackEvent::TrackFinished { index: 0 });
        assert!(!events.iter().any(|e| e.is_state_echo()));
        assert!(events.contains(&PlaybackEvent::TrackIndexChanged {
            old: Some(0),
            new: Some(1)
        }));
    }

    #[test]
    fn user_stop_does_not_advance() {
        let mut controller = controller_with(&["a", "b"], PlaybackMode::Loop);
        controller.play();
        controller.handle_backend_event(BackendEvent::StateChanged(BackendState::Playing));
        controller.handle_backend_event(BackendEvent::DurationChanged(1_000));
        controller.handle_backend_event(BackendEvent::PositionChanged(1_000));

        controller.stop();
        controller.handle_backend_event(BackendEvent::StateChanged(BackendState::Stopped));

        assert_eq!(controller.current_track_index(), Some(0));
        assert!(controller.drain_events().contains(&PlaybackEvent::StateChanged {
            state: PlayerState::Stopped
        }));
    }

    #[test]
    fn failure_is_reported_and_not_retried() {
        let mut controller = controller_with(&["a", "b"], PlaybackMode::Loop);
        controller.play();
        let issued = controller.backend().commands.len();

        controller.handle_backend_event(BackendEvent::Failed("bad header".to_string()));
        controller.handle_backend_event(BackendEvent::StateChanged(BackendState::Stopped));

        assert_eq!(controller.backend().commands.len(), issued);
        assert_eq!(controller.current_track_index(), Some(0));
        assert!(controller.drain_events().contains(&PlaybackEvent::PlaybackFailed {
            index: Some(0),
            message: "bad header".to_string()
        }));
    }

    #[test]
    fn failure_can_advance_by_policy() {
        let config = PlaybackConfig {
            advance_on_failure: true,
            seed: Some(1),
            ..Default::default()
        };
        let mut controller = PlaybackController::new(RecordingBackend::default(), config);
        controller.add_playlist(Playlist::with_tracks(
            "p",
            vec![create_test_track("a", 1_000), create_test_track("b", 1_000)],
        ));
        controller.play();

        controller.handle_backend_event(BackendEvent::Failed("gone".to_string()));
        assert_eq!(controller.current_track_index(), Some(1));
    }

    #[test]
    fn natural_end_with_nothing_next_reports_stop() {
        let mut controller = controller_with(&["a"], PlaybackMode::Loop);
        controller.play();
        controller.handle_backend_event(BackendEvent::StateChanged(BackendState::Playing));
        controller.handle_backend_event(BackendEvent::DurationChanged(1_000));
        controller.remove_tracks(0, &BTreeSet::from([0])).unwrap();
        controller.handle_backend_event(BackendEvent::PositionChanged(1_000));
        controller.drain_events();

        controller.handle_backend_event(BackendEvent::StateChanged(BackendState::Stopped));

        assert_eq!(controller.state(), PlayerState::Stopped);
        assert_eq!(controller.current_track_index(), None);
        assert_eq!(
            controller.drain_events(),
            vec![PlaybackEvent::StateChanged {
                state: PlayerState::Stopped
            }]
        );
    }

    #[test]
    fn failures_stop_advancing_after_a_full_lap() {
        let config = PlaybackConfig {
            advance_on_failure: true,
            seed: Some(1),
            ..Default::default()
        };
        let mut controller = PlaybackController::new(RecordingBackend::default(), config);
        controller.add_playlist(Playlist::with_tracks(
            "p",
            vec![create_test_track("a", 1_000), create_test_track("b", 1_000)],
        ));
        controller.play();

        controller.handle_backend_event(BackendEvent::Failed("gone".to_string()));
        controller.handle_backend_event(BackendEvent::Failed("gone".to_string()));

        let loads = controller
            .backend()
            .commands
            .iter()
            .filter(|c| c.starts_with("load"))
            .count();
        assert_eq!(loads, 2);
        assert_eq!(controller.current_track_index(), Some(1));
    }

    #[test]
    fn playing_acknowledgement_resets_failure_run() {
        let config = PlaybackConfig {
            advance_on_failure: true,
            seed: Some(1),
            ..Default::default()
        };
        let mut controller = PlaybackController::new(RecordingBackend::default(), config);
        controller.add_playlist(Playlist::with_tracks(
            "p",
            vec![create_test_track("a", 1_000), create_test_track("b", 1_000)],
        ));
        controller.play();

        controller.handle_backend_event(BackendEvent::Failed("gone".to_string()));
        controller.handle_backend_event(BackendEvent::StateChanged(BackendState::Playing));
        controller.handle_backend_event(BackendEvent::Failed("gone".to_string()));

        assert_eq!(controller.current_track_index(), Some(0));
    }

    #[test]
    fn reselecting_current_playlist_keeps_history() {
        let mut controller = controller_with(&["a", "b"], PlaybackMode::Loop);
        controller.play_track_at_index(1).unwrap();
        controller.drain_events();

        controller.set_current_playlist(0).unwrap();

        assert_eq!(controller.current_track_index(), Some(1));
        assert_eq!(controller.history().len(), 1);
        assert!(!controller.has_pending_events());
    }

    #[test]
    fn switching_playlist_clears_track_and_history() {
        let mut controller = controller_with(&["a", "b"], PlaybackMode::Loop);
        controller.add_playlist(Playlist::with_tracks(
            "other",
            vec![create_test_track("x", 1_000)],
        ));
        controller.play_track_at_index(1).unwrap();
        controller.drain_events();

        controller.set_current_playlist(1).unwrap();

        assert_eq!(controller.current_track_index(), None);
        assert!(controller.history().is_empty());
        assert_eq!(controller.next_candidate(), Some(0));
        assert_eq!(
            controller.drain_events(),
            vec![
                PlaybackEvent::TrackIndexChanged {
                    old: Some(1),
                    new: None
                },
                PlaybackEvent::PlaylistIndexChanged {
                    old: Some(0),
                    new: Some(1)
                },
            ]
        );
        assert!(controller.set_current_playlist(9).is_err());
    }

    #[test]
    fn front_playlist_is_independent() {
        let mut controller = controller_with(&["a"], PlaybackMode::Loop);
        controller.create_playlist("browse");
        controller.play();
        controller.drain_events();

        controller.set_front_playlist(1).unwrap();

        assert_eq!(controller.playlists().current_index(), Some(0));
        assert_eq!(controller.current_track_index(), Some(0));
        assert_eq!(
            controller.drain_events(),
            vec![PlaybackEvent::FrontPlaylistChanged {
                old: Some(0),
                new: Some(1)
            }]
        );
    }

    #[test]
    fn removing_earlier_tracks_shifts_current() {
        let mut controller = controller_with(&["a", "b", "c", "d"], PlaybackMode::Loop);
        controller.play_track_at_index(2).unwrap();

        controller.remove_tracks(0, &BTreeSet::from([0, 1])).unwrap();

        assert_eq!(controller.current_track_index(), Some(0));
        assert_eq!(controller.current_track().unwrap().title, "c");
        assert_eq!(controller.next_candidate(), Some(1));
    }

    #[test]
    fn removing_current_track_clears_it() {
        let mut controller = controller_with(&["a", "b", "c"], PlaybackMode::Loop);
        controller.play_track_at_index(1).unwrap();
        controller.select(0, 1).unwrap();

        let removed = controller.remove_selected(0).unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(controller.current_track_index(), None);
        assert_eq!(controller.next_candidate(), Some(0));
    }

    #[test]
    fn sorting_keeps_current_track() {
        let mut controller = controller_with(&["c", "a", "b"], PlaybackMode::Loop);
        controller.play_track_at_index(0).unwrap();

        controller.sort_tracks(0, SortKey::Title).unwrap();

        assert_eq!(controller.current_track_index(), Some(2));
        assert_eq!(controller.current_track().unwrap().title, "c");
        assert_eq!(controller.next_candidate(), Some(0));
    }

    #[test]
    fn removing_playing_playlist_stops() {
        let mut controller = controller_with(&["a"], PlaybackMode::Loop);
        controller.play();

        controller.remove_playlist(0).unwrap();

        assert_eq!(controller.backend().commands.last().unwrap(), "stop");
        assert_eq!(controller.current_track_index(), None);
        assert_eq!(controller.next_candidate(), None);
    }
}
