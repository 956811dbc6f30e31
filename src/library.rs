use crate::model::PlaylistCard;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Finds playlist resources (`*.json`) under `root`, one card per file,
/// sorted by name.
pub fn discover_cards(root: &Path) -> Vec<PlaylistCard> {
    let mut cards = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_playlist_file(path) {
            continue;
        }

        let name = path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("playlist")
            .to_string();
        cards.push(PlaylistCard {
            name,
            resource: PathBuf::from(path),
        });
    }

    cards.sort_by_cached_key(|card| card.name.to_ascii_lowercase());
    cards
}

/// Configured cards first, then discovered ones not already configured.
pub fn merge_cards(
    configured: &[PlaylistCard],
    discovered: Vec<PlaylistCard>,
) -> Vec<PlaylistCard> {
    let mut cards = configured.to_vec();
    for card in discovered {
        if !cards.iter().any(|known| known.resource == card.resource) {
            cards.push(card);
        }
    }
    cards
}

fn is_playlist_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
