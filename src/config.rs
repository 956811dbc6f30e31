use crate::model::PlaylistCard;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "playbar";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "playbar.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory track identifiers are resolved against.
    pub songs_dir: PathBuf,
    /// Playlist loaded at startup.
    pub playlist: PathBuf,
    /// Directory scanned for additional playlist cards.
    pub playlists_dir: Option<PathBuf>,
    pub cards: Vec<PlaylistCard>,
    /// Try to start the first track as soon as the startup playlist arrives.
    pub autoplay: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            songs_dir: PathBuf::from("songs"),
            playlist: PathBuf::from("songs.json"),
            playlists_dir: None,
            cards: Vec::new(),
            autoplay: true,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn log_path(&self, root: &Path) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| root.join(LOG_FILE))
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("PLAYBAR_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

/// Missing file means defaults; a present but broken file is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}
