//! Navigation history
//!
//! Records which track was chosen at each step of playback so that
//! previous/next retrace the same tracks in Random and Repeat modes instead
//! of drawing fresh random picks.

use crate::types::PlaybackMode;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::trace;

/// Positionally indexed record of chosen track indices
///
/// `position` is a cursor into `entries`. A cursor of -1 with no entries
/// means "no history". Positions may go negative when previous is pressed
/// past the first recorded choice.
#[derive(Debug, Clone)]
pub struct NavigationHistory {
    /// History position -> track index chosen there
    entries: BTreeMap<i64, usize>,

    /// Current history position
    position: i64,
}

impl NavigationHistory {
    /// Create empty history
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            position: -1,
        }
    }

    /// Move the cursor by `delta` and record `track_index` there
    pub fn record_choice(&mut self, track_index: usize, delta: i64) {
        self.position += delta;
        self.entries.insert(self.position, track_index);
        trace!(position = self.position, track_index, "Recorded history choice");
    }

    /// Track index recorded at `position + offset`, if any
    pub fn peek_at(&self, offset: i64) -> Option<usize> {
        self.entries.get(&(self.position + offset)).copied()
    }

    /// Forget history
    ///
    /// With `keep_current`, the entry under the cursor survives as entry 0
    /// and the cursor moves to 0. Without it (or when the cursor points at
    /// nothing) the history is cleared and the cursor goes back to -1.
    pub fn reset(&mut self, keep_current: bool) {
        let kept = if keep_current { self.peek_at(0) } else { None };
        self.entries.clear();

        match kept {
            Some(track_index) => {
                self.entries.insert(0, track_index);
                self.position = 0;
            }
            None => self.position = -1,
        }
    }

    /// Clear history and start over from `track_index` at position 0
    pub fn reanchor(&mut self, track_index: usize) {
        self.reset(false);
        self.record_choice(track_index, 1);
    }

    /// Current cursor
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no choice has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded entries in position order
    pub fn entries(&self) -> impl Iterator<Item = (i64, usize)> + '_ {
        self.entries.iter().map(|(pos, idx)| (*pos, *idx))
    }

    // ===== Index Resolution =====

    /// Resolve the track "next" would move to, without moving
    ///
    /// Returns `None` only for an empty playlist.
    pub fn resolve_next<R: Rng + ?Sized>(
        &self,
        mode: PlaybackMode,
        current: Option<usize>,
        len: usize,
        rng: &mut R,
    ) -> Option<usize> {
        if len == 0 {
            return None;
        }

        match mode {
            PlaybackMode::Loop => Some(current.map_or(0, |c| (c + 1) % len)),
            PlaybackMode::Random | PlaybackMode::Repeat => self
                .recorded_within(1, len)
                .or_else(|| Some(random_index(current, len, rng))),
        }
    }

    /// Resolve the track "previous" would move to, without moving
    ///
    /// Returns `None` only for an empty playlist.
    pub fn resolve_previous<R: Rng + ?Sized>(
        &self,
        mode: PlaybackMode,
        current: Option<usize>,
        len: usize,
        rng: &mut R,
    ) -> Option<usize> {
        if len == 0 {
            return None;
        }

        match mode {
            PlaybackMode::Loop => Some(current.map_or(len - 1, |c| (c % len + len - 1) % len)),
            PlaybackMode::Random | PlaybackMode::Repeat => self
                .recorded_within(-1, len)
                .or_else(|| Some(random_index(current, len, rng))),
        }
    }

    /// Recorded entry at `offset`, ignoring entries the playlist no longer has
    fn recorded_within(&self, offset: i64, len: usize) -> Option<usize> {
        self.peek_at(offset).filter(|idx| *idx < len)
    }
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Random index in `[0, len)` that differs from `current` whenever `len > 1`
///
/// Takes exactly one draw from `rng`, so a seeded generator gives a
/// reproducible sequence.
fn random_index<R: Rng + ?Sized>(current: Option<usize>, len: usize, rng: &mut R) -> usize {
    match current {
        _ if len <= 1 => 0,
        Some(c) if c < len => {
            let drawn = rng.gen_range(0..len - 1);
            if drawn >= c {
                drawn + 1
            } else {
                drawn
            }
        }
        _ => rng.gen_range(0..len),
    }
}
