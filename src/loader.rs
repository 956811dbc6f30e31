//! Playlist loading: JSON validation and a background fetch worker.
//!
//! A playlist resource is a JSON array of track identifier strings. Anything
//! else is reported as [`PlayerError::InvalidPlaylist`] so a bad file can
//! never replace a good playlist.

use crate::core::{PlaylistRequest, PlaylistResponse};
use crate::error::PlayerError;
use crate::model::Track;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

pub fn parse_playlist(raw: &str) -> Result<Vec<Track>, PlayerError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| PlayerError::InvalidPlaylist(format!("not valid JSON: {err}")))?;

    let Value::Array(entries) = value else {
        return Err(PlayerError::InvalidPlaylist(String::from(
            "expected an array of track names",
        )));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(pos, entry)| match entry {
            Value::String(id) if !id.trim().is_empty() => Ok(Track::new(id)),
            Value::String(_) => Err(PlayerError::InvalidPlaylist(format!(
                "entry {pos} is an empty track name"
            ))),
            other => Err(PlayerError::InvalidPlaylist(format!(
                "entry {pos} is not a string: {other}"
            ))),
        })
        .collect()
}

pub fn load_playlist_file(path: &Path) -> Result<Vec<Track>, PlayerError> {
    let raw = fs::read_to_string(path).map_err(|err| {
        PlayerError::InvalidPlaylist(format!("failed to read {}: {err}", path.display()))
    })?;
    parse_playlist(&raw)
}

pub fn fetch(request: PlaylistRequest) -> PlaylistResponse {
    let result = load_playlist_file(&request.resource);
    PlaylistResponse {
        generation: request.generation,
        resource: request.resource,
        result,
    }
}

/// Runs playlist fetches off the UI thread. Responses come back in
/// completion order, which is why they carry their request's generation.
pub struct PlaylistLoader {
    tx: Sender<PlaylistResponse>,
    rx: Receiver<PlaylistResponse>,
}

impl PlaylistLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn spawn(&self, request: PlaylistRequest) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let response = fetch(request);
            if tx.send(response).is_err() {
                log::debug!("playlist loader closed before response was delivered");
            }
        });
    }

    /// Next finished fetch, if any, without blocking.
    pub fn try_recv(&self) -> Option<PlaylistResponse> {
        match self.rx.try_recv() {
            Ok(response) => Some(response),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<PlaylistResponse> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl Default for PlaylistLoader {
    fn default() -> Self {
        Self::new()
    }
}
