//! Presentation model of the player, independent of any rendering backend.

use crate::core::Timeline;
use crate::model::PlaybackStatus;
use crate::state::PlayerSnapshot;
use crate::time::format_timeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowIcon {
    Playing,
    Idle,
}

impl RowIcon {
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Playing => "⏸",
            Self::Idle => "▶",
        }
    }
}

/// What the global play/pause button offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportIcon {
    Play,
    Pause,
}

impl TransportIcon {
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Play => "▶",
            Self::Pause => "⏸",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub title: String,
    pub icon: RowIcon,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingView {
    pub rows: Vec<RowView>,
    pub transport: TransportIcon,
    pub title: String,
    pub time: String,
    /// Seekbar fill in `[0, 1]`.
    pub progress: f64,
    pub status: PlaybackStatus,
}

impl NowPlayingView {
    /// Builds the view. `progress` overrides the timeline ratio (used right
    /// after a seek, before the primitive reports the new position).
    pub fn build(snapshot: &PlayerSnapshot<'_>, timeline: Timeline, progress: Option<f64>) -> Self {
        let detached = snapshot.is_detached();
        let rows = snapshot
            .playlist
            .iter()
            .enumerate()
            .map(|(idx, track)| {
                let current = snapshot.current_index == Some(idx);
                let playing = current && !detached && snapshot.status == PlaybackStatus::Playing;
                RowView {
                    title: track.title(),
                    icon: if playing { RowIcon::Playing } else { RowIcon::Idle },
                    current,
                }
            })
            .collect();

        let transport = match snapshot.status {
            PlaybackStatus::Playing | PlaybackStatus::Loading => TransportIcon::Pause,
            PlaybackStatus::Idle | PlaybackStatus::Paused => TransportIcon::Play,
        };

        let title = snapshot
            .loaded_track
            .map(|track| track.title())
            .unwrap_or_default();

        let (time, ratio) = if snapshot.status == PlaybackStatus::Loading {
            (String::from("00:00 / 00:00"), 0.0)
        } else {
            let current = timeline.position.map_or(0.0, |pos| pos.as_secs_f64());
            let total = timeline.duration.map_or(0.0, |dur| dur.as_secs_f64());
            (format_timeline(current, total), timeline.progress())
        };

        Self {
            rows,
            transport,
            title,
            time,
            progress: progress.map_or(ratio, |value| value.clamp(0.0, 1.0)),
            status: snapshot.status,
        }
    }

    pub fn playing_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.icon == RowIcon::Playing)
            .count()
    }
}
