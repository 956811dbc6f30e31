//! Authoritative "what is loaded, playing, and where in the list" state.
//!
//! Only the transport controller writes to [`PlayerState`]; everything else
//! reads it through [`PlayerSnapshot`].

use crate::error::PlayerError;
use crate::model::{Direction, PlaybackStatus, Track};

#[derive(Debug, Default)]
pub struct PlayerState {
    playlist: Vec<Track>,
    current_index: Option<usize>,
    loaded_track: Option<Track>,
    status: PlaybackStatus,
}

/// Read-only view handed to the presenter after every mutation.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSnapshot<'a> {
    pub playlist: &'a [Track],
    pub current_index: Option<usize>,
    pub loaded_track: Option<&'a Track>,
    pub status: PlaybackStatus,
}

impl PlayerSnapshot<'_> {
    /// True when the loaded track is not the one at `current_index`, which
    /// only happens after switching to a playlist that does not contain it.
    pub fn is_detached(&self) -> bool {
        match self.loaded_track {
            Some(loaded) => self
                .current_index
                .and_then(|idx| self.playlist.get(idx))
                .is_none_or(|track| track != loaded),
            None => false,
        }
    }
}

impl PlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playlist(&self) -> &[Track] {
        &self.playlist
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn loaded_track(&self) -> Option<&Track> {
        self.loaded_track.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn snapshot(&self) -> PlayerSnapshot<'_> {
        PlayerSnapshot {
            playlist: &self.playlist,
            current_index: self.current_index,
            loaded_track: self.loaded_track.as_ref(),
            status: self.status,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.snapshot().is_detached()
    }

    /// Swaps in a new playlist. Either the whole list is accepted or the
    /// current one is left untouched.
    ///
    /// The index follows the loaded track: its first position in the new list
    /// if present, otherwise row 0 (display only) while the loaded track keeps
    /// playing detached. With nothing loaded the index stays undefined.
    pub fn replace_playlist(&mut self, tracks: Vec<Track>) -> Result<(), PlayerError> {
        if let Some(pos) = tracks.iter().position(|track| track.id().trim().is_empty()) {
            return Err(PlayerError::InvalidPlaylist(format!(
                "entry {pos} is an empty track name"
            )));
        }

        self.current_index = match &self.loaded_track {
            Some(loaded) => tracks
                .iter()
                .position(|track| track == loaded)
                .or_else(|| (!tracks.is_empty()).then_some(0)),
            None => None,
        };
        self.playlist = tracks;
        Ok(())
    }

    pub fn select_index(&mut self, index: usize) -> Result<(), PlayerError> {
        if index >= self.playlist.len() {
            return Err(PlayerError::IndexOutOfRange {
                index,
                len: self.playlist.len(),
            });
        }
        self.current_index = Some(index);
        Ok(())
    }

    /// Index one step away from the current one, wrapping at both ends.
    /// Does not move the current index; the caller loads the returned one.
    pub fn advance(&self, direction: Direction) -> Result<usize, PlayerError> {
        let len = self.playlist.len();
        if len == 0 {
            return Err(PlayerError::EmptyPlaylist);
        }

        let current = self.current_index.unwrap_or(0).min(len - 1);
        Ok(match direction {
            Direction::Next => (current + 1) % len,
            Direction::Previous => (current + len - 1) % len,
        })
    }

    pub fn set_status(&mut self, status: PlaybackStatus) {
        self.status = status;
    }

    pub(crate) fn bind_loaded(&mut self, track: Track, index: usize) {
        self.loaded_track = Some(track);
        self.current_index = Some(index);
    }
}
