//! Playlists and the playlist registry
//!
//! The registry owns every playlist and tracks two independent indices:
//! - current: the playlist playback navigates in
//! - front: the playlist the UI is showing
//!
//! Playlists hand out read-only views; all mutation goes through the
//! registry so the selection set can never point past the end.

use crate::error::{PlaybackError, Result};
use crate::types::Track;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Key for in-place playlist sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Artist,
    Album,
    Duration,
    Path,
    FileSize,
}

impl SortKey {
    fn compare(self, a: &Track, b: &Track) -> Ordering {
        match self {
            SortKey::Title => cmp_text(&a.display_title(), &b.display_title()),
            SortKey::Artist => cmp_text(&a.artist, &b.artist),
            SortKey::Album => cmp_text(&a.album, &b.album),
            SortKey::Duration => a.duration_ms.cmp(&b.duration_ms),
            SortKey::Path => a.path.cmp(&b.path),
            SortKey::FileSize => a.file_size.cmp(&b.file_size),
        }
    }
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Position of `index` after the indices in `removed` are taken out
///
/// `None` if `index` itself was removed.
pub(crate) fn index_after_removal(index: usize, removed: &BTreeSet<usize>) -> Option<usize> {
    if removed.contains(&index) {
        None
    } else {
        Some(index - removed.range(..index).count())
    }
}

/// Named, ordered list of tracks plus a selection
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    name: String,
    tracks: Vec<Track>,
    selected: BTreeSet<usize>,
}

impl Playlist {
    /// Create empty playlist
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
            selected: BTreeSet::new(),
        }
    }

    /// Create playlist from tracks
    pub fn with_tracks(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            name: name.into(),
            tracks,
            selected: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All tracks in order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Selected track indices, ascending
    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(PlaybackError::IndexOutOfBounds {
                index,
                len: self.tracks.len(),
            })
        }
    }

    fn extend(&mut self, tracks: Vec<Track>) {
        self.tracks.extend(tracks);
    }

    /// Remove every index in `indices`, returning the removed tracks in order
    ///
    /// Validates all indices before touching anything.
    fn remove_indices(&mut self, indices: &BTreeSet<usize>) -> Result<Vec<Track>> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.tracks.len()) {
            return Err(PlaybackError::IndexOutOfBounds {
                index: bad,
                len: self.tracks.len(),
            });
        }

        let mut removed = Vec::with_capacity(indices.len());
        let mut kept = Vec::with_capacity(self.tracks.len() - indices.len());
        for (i, track) in std::mem::take(&mut self.tracks).into_iter().enumerate() {
            if indices.contains(&i) {
                removed.push(track);
            } else {
                kept.push(track);
            }
        }
        self.tracks = kept;

        self.selected = self
            .selected
            .iter()
            .filter_map(|&i| index_after_removal(i, indices))
            .collect();

        Ok(removed)
    }

    /// Stable in-place sort; returns `new_position[old_index]`
    fn sort_by_key(&mut self, key: SortKey) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.tracks.len()).collect();
        order.sort_by(|&a, &b| key.compare(&self.tracks[a], &self.tracks[b]));

        let mut new_position = vec![0; order.len()];
        for (new, &old) in order.iter().enumerate() {
            new_position[old] = new;
        }

        let mut slots: Vec<Option<Track>> =
            std::mem::take(&mut self.tracks).into_iter().map(Some).collect();
        self.tracks = order
            .iter()
            .filter_map(|&old| slots[old].take())
            .collect();

        self.selected = self.selected.iter().map(|&i| new_position[i]).collect();

        new_position
    }
}

/// Ordered collection of playlists
#[derive(Debug, Clone, Default)]
pub struct PlaylistRegistry {
    playlists: Vec<Playlist>,
    current: Option<usize>,
    front: Option<usize>,
}

impl PlaylistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a playlist, returning its index
    ///
    /// The first playlist added becomes both current and front.
    pub fn add(&mut self, playlist: Playlist) -> usize {
        self.playlists.push(playlist);
        let index = self.playlists.len() - 1;

        if self.current.is_none() {
            self.current = Some(index);
        }
        if self.front.is_none() {
            self.front = Some(index);
        }

        index
    }

    /// Create an empty playlist named `name`, returning its index
    pub fn create(&mut self, name: impl Into<String>) -> usize {
        self.add(Playlist::new(name))
    }

    /// Remove a playlist, shifting later indices down
    pub fn remove(&mut self, index: usize) -> Result<Playlist> {
        self.check_playlist(index)?;
        let playlist = self.playlists.remove(index);

        let shift = |slot: Option<usize>| match slot {
            Some(i) if i == index => None,
            Some(i) if i > index => Some(i - 1),
            other => other,
        };
        self.current = shift(self.current);
        self.front = shift(self.front).or(self.current);

        Ok(playlist)
    }

    /// Make `index` the playing playlist, returning the previous one
    pub fn set_current(&mut self, index: usize) -> Result<Option<usize>> {
        self.check_playlist(index)?;
        Ok(self.current.replace(index))
    }

    /// Make `index` the displayed playlist, returning the previous one
    pub fn set_front(&mut self, index: usize) -> Result<Option<usize>> {
        self.check_playlist(index)?;
        Ok(self.front.replace(index))
    }

    pub fn get(&self, index: usize) -> Option<&Playlist> {
        self.playlists.get(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn front_index(&self) -> Option<usize> {
        self.front
    }

    pub fn current_playlist(&self) -> Option<&Playlist> {
        self.current.and_then(|i| self.playlists.get(i))
    }

    pub fn front_playlist(&self) -> Option<&Playlist> {
        self.front.and_then(|i| self.playlists.get(i))
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Playlist> {
        self.playlists.iter()
    }

    // ===== Playlist Mutation =====

    pub fn append_tracks(&mut self, index: usize, tracks: Vec<Track>) -> Result<()> {
        self.playlist_mut(index)?.extend(tracks);
        Ok(())
    }

    /// Bulk remove by index set
    pub fn remove_tracks(&mut self, index: usize, indices: &BTreeSet<usize>) -> Result<Vec<Track>> {
        self.playlist_mut(index)?.remove_indices(indices)
    }

    /// Sort in place; returns `new_position[old_index]`
    pub fn sort_tracks(&mut self, index: usize, key: SortKey) -> Result<Vec<usize>> {
        Ok(self.playlist_mut(index)?.sort_by_key(key))
    }

    pub fn select(&mut self, index: usize, track: usize) -> Result<()> {
        let playlist = self.playlist_mut(index)?;
        playlist.check_index(track)?;
        playlist.selected.insert(track);
        Ok(())
    }

    pub fn deselect(&mut self, index: usize, track: usize) -> Result<()> {
        self.playlist_mut(index)?.selected.remove(&track);
        Ok(())
    }

    pub fn clear_selection(&mut self, index: usize) -> Result<()> {
        self.playlist_mut(index)?.selected.clear();
        Ok(())
    }

    fn playlist_mut(&mut self, index: usize) -> Result<&mut Playlist> {
        let count = self.playlists.len();
        self.playlists
            .get_mut(index)
            .ok_or(PlaybackError::PlaylistOutOfBounds { index, count })
    }

    fn check_playlist(&self, index: usize) -> Result<()> {
        if index < self.playlists.len() {
            Ok(())
        } else {
            Err(PlaybackError::PlaylistOutOfBounds {
                index,
                count: self.playlists.len(),
            })
        }
    }
}
