//! Simulated audio backend
//!
//! Stands in for a real decoder. It keeps virtual time, reports durations
//! skewed by a configurable drift (as a decoder misjudging VBR files does)
//! and reports a stop once the virtual position reaches the skewed end.

use crate::config::QuaverConfig;
use anyhow::{bail, Result};
use quaver_playback::{
    backend_channel, AudioBackend, BackendEvent, BackendEventSender, BackendState,
    PlaybackController, PlaybackEvent, Playlist, Track,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Track currently open in the simulated decoder
#[derive(Debug, Clone)]
struct LoadedTrack {
    path: PathBuf,
    duration_ms: u64,
}

/// Backend driven by explicit ticks instead of an audio clock
pub struct SimulatedBackend {
    events: BackendEventSender,

    /// Metadata durations of the files the backend can "open"
    library: HashMap<PathBuf, u64>,

    drift_percent: f64,
    tick_ms: u64,

    loaded: Option<LoadedTrack>,
    position_ms: u64,
    playing: bool,
}

impl SimulatedBackend {
    pub fn new(events: BackendEventSender, tick_ms: u64, drift_percent: f64) -> Self {
        Self {
            events,
            library: HashMap::new(),
            drift_percent,
            tick_ms,
            loaded: None,
            position_ms: 0,
            playing: false,
        }
    }

    /// Make a file available to `load_track`
    pub fn register(&mut self, track: &Track) {
        self.library.insert(track.path.clone(), track.duration_ms);
    }

    /// Duration this backend believes a file has
    pub fn skewed_duration(&self, real_duration_ms: u64) -> u64 {
        let factor = 1.0 + self.drift_percent / 100.0;
        (real_duration_ms as f64 * factor).round() as u64
    }

    /// Advance virtual time by one tick
    ///
    /// Returns false when nothing is playing.
    pub fn tick(&mut self) -> bool {
        let Some(track) = self.loaded.as_ref().filter(|_| self.playing) else {
            return false;
        };
        let duration_ms = track.duration_ms;

        self.position_ms = (self.position_ms + self.tick_ms).min(duration_ms);
        self.send(BackendEvent::PositionChanged(self.position_ms));

        if self.position_ms >= duration_ms {
            self.playing = false;
            self.send(BackendEvent::StateChanged(BackendState::Stopped));
        }
        true
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn loaded_path(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|track| track.path.as_path())
    }

    fn send(&self, event: BackendEvent) {
        if !self.events.send(event) {
            warn!("Controller went away, dropping backend event");
        }
    }
}

impl AudioBackend for SimulatedBackend {
    fn load_track(&mut self, path: &Path) {
        self.playing = false;
        self.position_ms = 0;

        let Some(&real) = self.library.get(path) else {
            self.loaded = None;
            self.send(BackendEvent::Failed(format!(
                "cannot open {}",
                path.display()
            )));
            return;
        };

        let duration_ms = self.skewed_duration(real);
        debug!(path = %path.display(), real, duration_ms, "Simulated load");
        self.loaded = Some(LoadedTrack {
            path: path.to_path_buf(),
            duration_ms,
        });
        self.send(BackendEvent::DurationChanged(duration_ms));
    }

    fn play(&mut self) {
        if self.loaded.is_some() && !self.playing {
            self.playing = true;
            self.send(BackendEvent::StateChanged(BackendState::Playing));
        }
    }

    fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            self.send(BackendEvent::StateChanged(BackendState::Paused));
        }
    }

    fn stop(&mut self) {
        self.playing = false;
        self.position_ms = 0;
        self.send(BackendEvent::StateChanged(BackendState::Stopped));
    }

    fn seek(&mut self, raw_position_ms: u64) {
        let end = self.loaded.as_ref().map_or(0, |track| track.duration_ms);
        self.position_ms = raw_position_ms.min(end);
        self.send(BackendEvent::PositionChanged(self.position_ms));
    }

    fn set_volume(&mut self, level: u8) {
        debug!(level, "Simulated volume");
    }
}

/// Outcome of a simulation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub ticks: u64,
    pub tracks_started: usize,
    pub tracks_finished: usize,
    pub failures: usize,
}

/// Synthetic playlist with slightly different track lengths
pub fn synthetic_tracks(count: usize, base_duration_ms: u64) -> Vec<Track> {
    (0..count)
        .map(|i| {
            let offset = (i as u64 % 5) * 7_000;
            Track::new(
                PathBuf::from(format!("/simulated/track-{:02}.mp3", i + 1)),
                base_duration_ms + offset,
            )
            .with_title(format!("Track {}", i + 1))
            .with_artist("Quaver Simulator")
            .with_album("Virtual Time")
            .with_bitrate(192)
        })
        .collect()
}

/// Play a synthetic playlist until `finish_after` tracks finish or ticks run out
pub fn run(config: &QuaverConfig, finish_after: Option<usize>) -> Result<SimulationReport> {
    let settings = &config.simulation;
    let tracks = synthetic_tracks(settings.tracks, settings.track_duration_ms);

    let (tx, rx) = backend_channel();
    let mut backend = SimulatedBackend::new(tx, settings.tick_ms, settings.drift_percent);
    for track in &tracks {
        backend.register(track);
    }

    let mut controller = PlaybackController::new(backend, config.playback.clone());
    controller.attach_backend_events(rx);
    controller.add_playlist(Playlist::with_tracks("Simulation", tracks));

    info!(
        tracks = settings.tracks,
        mode = %config.playback.mode,
        drift_percent = settings.drift_percent,
        "Starting simulation"
    );

    let mut report = SimulationReport::default();
    controller.play();

    while report.ticks < settings.max_ticks {
        controller.process_backend_events();
        tally(&mut report, controller.drain_events());

        if finish_after.is_some_and(|limit| report.tracks_finished >= limit) {
            break;
        }
        if !controller.backend_mut().tick() {
            break;
        }
        report.ticks += 1;
    }

    let backend = controller.backend();
    debug!(
        path = ?backend.loaded_path(),
        position_ms = backend.position_ms(),
        playing = backend.is_playing(),
        "Backend at end of simulation"
    );

    controller.stop();
    controller.process_backend_events();
    tally(&mut report, controller.drain_events());

    info!(
        ticks = report.ticks,
        started = report.tracks_started,
        finished = report.tracks_finished,
        failures = report.failures,
        "Simulation finished"
    );

    if report.tracks_started == 0 && settings.tracks > 0 {
        bail!("simulation never started a track");
    }
    Ok(report)
}

fn tally(report: &mut SimulationReport, events: Vec<PlaybackEvent>) {
    for event in events {
        match &event {
            PlaybackEvent::TrackIndexChanged { new: Some(_), .. } => report.tracks_started += 1,
            PlaybackEvent::TrackFinished { .. } => report.tracks_finished += 1,
            PlaybackEvent::PlaybackFailed { .. } => report.failures += 1,
            PlaybackEvent::PositionChanged { .. } => {
                debug!(?event, "Notification");
                continue;
            }
            _ => {}
        }
        info!(?event, "Notification");
    }
}
