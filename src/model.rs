use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A playable item, identified by its (usually percent-encoded) file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Track(String);

impl Track {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    /// Human readable name: the identifier with percent-encoding removed.
    pub fn title(&self) -> String {
        urlencoding::decode(&self.0)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| self.0.clone())
    }

    /// Identifier in canonical percent-encoded form. Already-encoded ids are
    /// not encoded a second time.
    pub fn encoded_id(&self) -> String {
        match urlencoding::decode(&self.0) {
            Ok(decoded) => urlencoding::encode(&decoded).into_owned(),
            Err(_) => urlencoding::encode(&self.0).into_owned(),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Track {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Where the playback primitive finds a track: `<songs_dir>/<encoded id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackLocation {
    base: PathBuf,
    encoded: String,
}

impl TrackLocation {
    pub fn new(songs_dir: &Path, track: &Track) -> Self {
        Self {
            base: songs_dir.to_path_buf(),
            encoded: track.encoded_id(),
        }
    }

    /// Resource path string, encoded the way it is addressed.
    pub fn uri(&self) -> String {
        let base = self.base.to_string_lossy();
        let base = base.trim_end_matches(['/', '\\']);
        if base.is_empty() {
            return self.encoded.clone();
        }
        format!("{base}/{}", self.encoded)
    }

    /// Filesystem path for file-backed engines.
    pub fn to_path(&self) -> PathBuf {
        let name = urlencoding::decode(&self.encoded)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| self.encoded.clone());
        self.base.join(name)
    }
}

impl fmt::Display for TrackLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// Nothing has been loaded yet.
    #[default]
    Idle,
    /// A load was requested and the primitive has not confirmed playback.
    Loading,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// A selectable playlist resource ("card").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistCard {
    pub name: String,
    pub resource: PathBuf,
}
