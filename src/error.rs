use std::path::PathBuf;
use thiserror::Error;

/// Failures of the player core. None of them is fatal to the widget: each one
/// is recovered into a visible, safe state by the transport controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// Malformed playlist data; the previous playlist is kept.
    #[error("invalid playlist: {0}")]
    InvalidPlaylist(String),
    #[error("index {index} out of range for playlist of {len} tracks")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("playlist is empty")]
    EmptyPlaylist,
    /// The host refused to start (or could not start) playback.
    #[error("playback blocked for {track}: {source}")]
    PlaybackBlocked {
        track: String,
        #[source]
        source: PlaybackError,
    },
}

/// Failures reported by the playback primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("playback not allowed by host: {0}")]
    Blocked(String),
    #[error("failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("failed to seek: {0}")]
    Seek(String),
    #[error("no source loaded")]
    NoSource,
}
