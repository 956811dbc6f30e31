use crate::audio::{AudioEngine, PlaybackEvent};
use crate::error::PlayerError;
use crate::model::{Direction, PlaybackStatus, Track, TrackLocation};
use crate::state::{PlayerSnapshot, PlayerState};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A playlist fetch tagged with the generation it was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRequest {
    pub generation: u64,
    pub resource: PathBuf,
}

/// Completion of a [`PlaylistRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistResponse {
    pub generation: u64,
    pub resource: PathBuf,
    pub result: Result<Vec<Track>, PlayerError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The new playlist is in place. `kept_position` tells whether the loaded
    /// track was found in it.
    Applied { kept_position: bool },
    /// A newer request was issued meanwhile; the response was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// The primitive refused to start. State shows the attempted track, paused.
    Blocked(PlayerError),
}

/// Position and length of the loaded source, as reported by the primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timeline {
    pub position: Option<Duration>,
    pub duration: Option<Duration>,
}

impl Timeline {
    /// Fraction of the track already played; `0.0` while the duration is unknown.
    pub fn progress(&self) -> f64 {
        let total = self.duration.map_or(0.0, |duration| duration.as_secs_f64());
        if !(total.is_finite() && total > 0.0) {
            return 0.0;
        }
        let current = self.position.map_or(0.0, |position| position.as_secs_f64());
        (current / total).clamp(0.0, 1.0)
    }
}

/// Turns user intents and primitive notifications into state transitions and
/// playback commands. Sole writer of both the [`PlayerState`] and the engine.
pub struct TransportController<E: AudioEngine> {
    state: PlayerState,
    engine: E,
    songs_dir: PathBuf,
    generation: u64,
    /// Seek fraction to show until the primitive reports a new position.
    pending_seek: Option<f64>,
    pub dirty: bool,
    pub status: String,
}

impl<E: AudioEngine> TransportController<E> {
    pub fn new(engine: E, songs_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: PlayerState::new(),
            engine,
            songs_dir: songs_dir.into(),
            generation: 0,
            pending_seek: None,
            dirty: true,
            status: String::from("Ready"),
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn snapshot(&self) -> PlayerSnapshot<'_> {
        self.state.snapshot()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn songs_dir(&self) -> &Path {
        &self.songs_dir
    }

    pub fn timeline(&self) -> Timeline {
        Timeline {
            position: self.engine.position(),
            duration: self.engine.duration(),
        }
    }

    /// Progress to draw: a just-issued seek wins over the primitive's last report.
    pub fn progress(&self) -> f64 {
        self.pending_seek
            .unwrap_or_else(|| self.timeline().progress())
    }

    pub fn location_for(&self, track: &Track) -> TrackLocation {
        TrackLocation::new(&self.songs_dir, track)
    }

    /// Binds `track` to the primitive and starts it. Status stays `Loading`
    /// until the primitive reports progress. A refusal to start is an expected
    /// outcome: it is logged and the state is left on the attempted track,
    /// paused.
    pub fn load_and_play(&mut self, track: Track, index: usize) -> PlayOutcome {
        let location = self.location_for(&track);
        log::info!("loading {} (row {index})", location);

        self.state.bind_loaded(track.clone(), index);
        self.state.set_status(PlaybackStatus::Loading);
        self.pending_seek = None;
        self.dirty = true;

        let result = self
            .engine
            .load(&location)
            .and_then(|()| self.engine.play());

        match result {
            Ok(()) => {
                self.set_status(&format!("Loading {}", track.title()));
                PlayOutcome::Started
            }
            Err(source) => {
                log::warn!("play() blocked or failed for {location}: {source}");
                self.state.set_status(PlaybackStatus::Paused);
                self.set_status(&format!("Press play to start {}", track.title()));
                PlayOutcome::Blocked(PlayerError::PlaybackBlocked {
                    track: track.id().to_string(),
                    source,
                })
            }
        }
    }

    pub fn toggle_play_pause(&mut self) {
        if !self.engine.has_source() || self.state.loaded_track().is_none() {
            // A track whose load failed is retried in place; otherwise start at the top.
            let index = match self.state.loaded_track() {
                Some(_) => self.state.current_index().unwrap_or(0),
                None => 0,
            };
            if let Some(track) = self.state.playlist().get(index).cloned() {
                let _ = self.load_and_play(track, index);
            }
            return;
        }

        if self.engine.is_paused() {
            match self.engine.play() {
                Ok(()) => {
                    self.state.set_status(PlaybackStatus::Playing);
                    self.set_status("Resumed");
                }
                Err(err) => {
                    log::warn!("play() blocked: {err}");
                    self.state.set_status(PlaybackStatus::Paused);
                    self.set_status("Playback blocked");
                }
            }
        } else {
            self.engine.pause();
            self.state.set_status(PlaybackStatus::Paused);
            self.set_status("Paused");
        }
        self.dirty = true;
    }

    /// Plays the row at `index`; out-of-range rows are ignored.
    pub fn select_track(&mut self, index: usize) {
        let Some(track) = self.state.playlist().get(index).cloned() else {
            log::debug!(
                "ignoring selection of row {index} in a playlist of {}",
                self.state.playlist().len()
            );
            return;
        };
        let _ = self.load_and_play(track, index);
    }

    pub fn skip(&mut self, direction: Direction) {
        let Some(index) = self.skip_target(direction) else {
            return;
        };
        let Some(track) = self.state.playlist().get(index).cloned() else {
            return;
        };
        let _ = self.load_and_play(track, index);
    }

    /// A detached track (left over from a playlist switch) is followed by the
    /// row currently shown instead of the row after it.
    fn skip_target(&self, direction: Direction) -> Option<usize> {
        if direction == Direction::Next && self.state.is_detached() {
            return self.state.current_index();
        }
        self.state.advance(direction).ok()
    }

    /// Jumps to `fraction` of the track. Does nothing until the duration is known.
    pub fn seek(&mut self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let Some(duration) = self
            .engine
            .duration()
            .filter(|duration| !duration.is_zero())
        else {
            return;
        };

        match self.engine.seek_to(duration.mul_f64(fraction)) {
            Ok(()) => {
                self.pending_seek = Some(fraction);
                self.dirty = true;
            }
            Err(err) => log::warn!("seek to {:.0}% failed: {err}", fraction * 100.0),
        }
    }

    /// Seeks relative to the current position, as a fraction of the duration.
    pub fn seek_by(&mut self, delta: f64) {
        let progress = self.timeline().progress();
        self.seek(progress + delta);
    }

    /// Replaces the playlist without interrupting playback. See
    /// [`PlayerState::replace_playlist`] for where the index lands.
    ///
    /// Counts as a newer request: fetches still in flight become stale.
    pub fn switch_playlist(&mut self, tracks: Vec<Track>) -> Result<SwitchOutcome, PlayerError> {
        self.generation += 1;
        self.install_playlist(tracks)
    }

    fn install_playlist(&mut self, tracks: Vec<Track>) -> Result<SwitchOutcome, PlayerError> {
        let count = tracks.len();
        if let Err(err) = self.state.replace_playlist(tracks) {
            log::error!("keeping previous playlist: {err}");
            self.set_status(&format!("Playlist rejected: {err}"));
            return Err(err);
        }

        let kept_position = self.state.loaded_track().is_some() && !self.state.is_detached();
        log::info!("playlist switched ({count} tracks, kept position: {kept_position})");
        self.set_status(&format!("Loaded playlist with {count} tracks"));
        Ok(SwitchOutcome::Applied { kept_position })
    }

    /// Starts a new playlist fetch; responses to any earlier request become stale.
    pub fn request_playlist(&mut self, resource: impl Into<PathBuf>) -> PlaylistRequest {
        self.generation += 1;
        let request = PlaylistRequest {
            generation: self.generation,
            resource: resource.into(),
        };
        log::debug!(
            "requesting playlist {} (generation {})",
            request.resource.display(),
            request.generation
        );
        request
    }

    pub fn latest_generation(&self) -> u64 {
        self.generation
    }

    pub fn apply_playlist_response(
        &mut self,
        response: PlaylistResponse,
    ) -> Result<SwitchOutcome, PlayerError> {
        if response.generation != self.generation {
            log::debug!(
                "dropping stale playlist {} (generation {}, latest {})",
                response.resource.display(),
                response.generation,
                self.generation
            );
            return Ok(SwitchOutcome::Stale);
        }

        match response.result {
            Ok(tracks) => self.install_playlist(tracks),
            Err(err) => {
                log::error!(
                    "failed to load playlist {}: {err}",
                    response.resource.display()
                );
                self.set_status(&format!("Could not load {}", response.resource.display()));
                Err(err)
            }
        }
    }

    pub fn handle_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::TimeUpdate => {
                self.pending_seek = None;
                self.confirm_playing();
                self.dirty = true;
            }
            PlaybackEvent::LoadedMetadata => {
                self.confirm_playing();
                self.dirty = true;
            }
            PlaybackEvent::Ended => self.on_ended(),
        }
    }

    /// `Loading` ends once the primitive shows signs of life.
    fn confirm_playing(&mut self) {
        if self.state.status() != PlaybackStatus::Loading || self.engine.is_paused() {
            return;
        }
        self.state.set_status(PlaybackStatus::Playing);
        if let Some(track) = self.state.loaded_track() {
            let message = format!("Playing {}", track.title());
            self.set_status(&message);
        }
    }

    /// Pulls pending notifications from the primitive and reacts to them.
    pub fn pump_events(&mut self) {
        for event in self.engine.poll_events() {
            self.handle_event(event);
        }
    }

    fn on_ended(&mut self) {
        if self.state.playlist().is_empty() {
            self.state.set_status(PlaybackStatus::Paused);
            self.set_status("Reached end of track");
            return;
        }
        self.skip(Direction::Next);
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullAudioEngine;
    use crate::view::{NowPlayingView, RowIcon};

    fn tracks(ids: &[&str]) -> Vec<Track> {
        ids.iter().copied().map(Track::from).collect()
    }

    fn controller(ids: &[&str]) -> TransportController<NullAudioEngine> {
        let mut controller = TransportController::new(NullAudioEngine::new(), "songs");
        controller.switch_playlist(tracks(ids)).expect("valid playlist");
        controller
    }

    #[test]
    fn toggle_on_fresh_playlist_plays_first_track() {
        let mut controller = controller(&["a.mp3", "b.mp3"]);
        controller.toggle_play_pause();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.current_index, Some(0));
        assert_eq!(snapshot.loaded_track, Some(&Track::from("a.mp3")));
        assert_eq!(snapshot.status, PlaybackStatus::Loading);

        controller.pump_events();
        assert_eq!(controller.state().status(), PlaybackStatus::Playing);
    }

    #[test]
    fn loading_shows_reset_time_until_primitive_reports() {
        let mut controller = controller(&["a.mp3", "b.mp3"]);
        controller.select_track(0);
        controller.pump_events();

        controller.select_track(1);
        let loading = NowPlayingView::build(&controller.snapshot(), controller.timeline(), None);
        assert_eq!(controller.state().status(), PlaybackStatus::Loading);
        assert_eq!(loading.time, "00:00 / 00:00");
        assert_eq!(loading.title, "b.mp3");
        assert_eq!(loading.playing_rows(), 0);

        controller.pump_events();
        let playing = NowPlayingView::build(&controller.snapshot(), controller.timeline(), None);
        assert_eq!(controller.state().status(), PlaybackStatus::Playing);
        assert_eq!(playing.rows[1].icon, RowIcon::Playing);
    }

    #[test]
    fn toggle_pauses_and_resumes() {
        let mut controller = controller(&["a.mp3"]);
        controller.toggle_play_pause();
        controller.toggle_play_pause();
        assert_eq!(controller.state().status(), PlaybackStatus::Paused);
        assert!(controller.engine().is_paused());

        controller.toggle_play_pause();
        assert_eq!(controller.state().status(), PlaybackStatus::Playing);
        assert!(!controller.engine().is_paused());
    }

    #[test]
    fn toggle_on_empty_playlist_does_nothing() {
        let mut controller = TransportController::new(NullAudioEngine::new(), "songs");
        controller.toggle_play_pause();
        assert_eq!(controller.state().status(), PlaybackStatus::Idle);
        assert!(!controller.engine().has_source());
    }

    #[test]
    fn blocked_play_leaves_attempted_track_paused() {
        let mut controller = controller(&["a.mp3", "b.mp3"]);
        controller.engine_mut().set_play_blocked(true);

        let outcome = controller.load_and_play(Track::from("b.mp3"), 1);
        assert!(matches!(
            outcome,
            PlayOutcome::Blocked(PlayerError::PlaybackBlocked { .. })
        ));
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.status, PlaybackStatus::Paused);
        assert_eq!(snapshot.current_index, Some(1));
        assert_eq!(snapshot.loaded_track, Some(&Track::from("b.mp3")));
    }

    #[test]
    fn resume_after_block_starts_playback() {
        let mut controller = controller(&["a.mp3"]);
        controller.engine_mut().set_play_blocked(true);
        controller.toggle_play_pause();
        assert_eq!(controller.state().status(), PlaybackStatus::Paused);

        controller.engine_mut().set_play_blocked(false);
        controller.toggle_play_pause();
        assert_eq!(controller.state().status(), PlaybackStatus::Playing);
    }

    #[test]
    fn skip_wraps_in_both_directions() {
        let mut controller = controller(&["a.mp3", "b.mp3", "c.mp3"]);
        controller.select_track(2);
        controller.skip(Direction::Next);
        assert_eq!(controller.state().current_index(), Some(0));

        controller.skip(Direction::Previous);
        controller.skip(Direction::Previous);
        assert_eq!(controller.state().current_index(), Some(1));
    }

    #[test]
    fn skip_on_empty_playlist_is_silent() {
        let mut controller = TransportController::new(NullAudioEngine::new(), "songs");
        controller.skip(Direction::Next);
        controller.skip(Direction::Previous);
        assert_eq!(controller.state().current_index(), None);
        assert!(!controller.engine().has_source());
    }

    #[test]
    fn out_of_range_selection_changes_nothing() {
        let mut controller = controller(&["a.mp3", "b.mp3"]);
        controller.select_track(0);
        controller.select_track(7);
        assert_eq!(controller.state().current_index(), Some(0));
        assert_eq!(controller.state().loaded_track(), Some(&Track::from("a.mp3")));
    }

    #[test]
    fn seek_is_clamped_and_needs_a_duration() {
        let mut controller = controller(&["a.mp3"]);
        controller.engine_mut().set_play_blocked(true);
        controller.select_track(0);
        assert!(controller.engine().is_paused());

        controller.seek(0.5);
        assert_eq!(controller.engine().position(), Some(Duration::ZERO));

        controller.engine_mut().set_duration(Some(Duration::from_secs(200)));
        controller.seek(1.5);
        assert_eq!(controller.engine().position(), Some(Duration::from_secs(200)));
        controller.seek(-3.0);
        assert_eq!(controller.engine().position(), Some(Duration::ZERO));
        controller.seek(0.25);
        assert_eq!(controller.engine().position(), Some(Duration::from_secs(50)));
        assert_eq!(controller.progress(), 0.25);
    }

    #[test]
    fn ended_advances_to_next_row() {
        let mut controller = controller(&["a.mp3", "b.mp3"]);
        controller.select_track(1);
        controller.handle_event(PlaybackEvent::Ended);
        assert_eq!(controller.state().current_index(), Some(0));
        controller.pump_events();
        assert_eq!(controller.state().status(), PlaybackStatus::Playing);
    }

    #[test]
    fn ended_on_empty_playlist_loads_nothing() {
        let mut controller = controller(&["a.mp3"]);
        controller.select_track(0);
        controller.switch_playlist(Vec::new()).expect("empty is valid");
        controller.handle_event(PlaybackEvent::Ended);
        assert_eq!(controller.state().loaded_track(), Some(&Track::from("a.mp3")));
        assert_eq!(controller.state().current_index(), None);
    }

    #[test]
    fn toggle_after_end_replays_and_pauses_again() {
        let mut controller = controller(&["a.mp3"]);
        controller.select_track(0);
        controller.engine_mut().set_duration(Some(Duration::from_secs(60)));
        controller.seek(1.0);
        controller.switch_playlist(Vec::new()).expect("empty is valid");
        controller.pump_events();
        assert_eq!(controller.state().status(), PlaybackStatus::Paused);
        assert!(controller.engine().is_paused());

        controller.toggle_play_pause();
        assert_eq!(controller.state().status(), PlaybackStatus::Playing);
        assert!(!controller.engine().is_paused());
        assert!(
            controller
                .engine()
                .position()
                .is_some_and(|pos| pos < Duration::from_secs(1))
        );

        controller.toggle_play_pause();
        assert_eq!(controller.state().status(), PlaybackStatus::Paused);
        assert!(controller.engine().is_paused());
    }

    #[test]
    fn switching_keeps_position_of_loaded_track() {
        let mut controller = controller(&["a.mp3", "b.mp3"]);
        controller.select_track(1);
        controller.pump_events();

        let outcome = controller
            .switch_playlist(tracks(&["x.mp3", "b.mp3"]))
            .expect("valid");
        assert_eq!(outcome, SwitchOutcome::Applied { kept_position: true });
        assert_eq!(controller.state().current_index(), Some(1));
        assert_eq!(controller.state().status(), PlaybackStatus::Playing);
    }

    #[test]
    fn detached_track_is_followed_by_first_row() {
        let mut controller = controller(&["a.mp3", "b.mp3"]);
        controller.select_track(1);
        controller.pump_events();
        let outcome = controller
            .switch_playlist(tracks(&["x.mp3", "y.mp3"]))
            .expect("valid");
        assert_eq!(outcome, SwitchOutcome::Applied { kept_position: false });
        assert_eq!(controller.state().current_index(), Some(0));
        assert_eq!(controller.state().status(), PlaybackStatus::Playing);

        controller.handle_event(PlaybackEvent::Ended);
        assert_eq!(controller.state().current_index(), Some(0));
        assert_eq!(controller.state().loaded_track(), Some(&Track::from("x.mp3")));
    }

    #[test]
    fn invalid_switch_keeps_previous_playlist() {
        let mut controller = controller(&["a.mp3", "b.mp3"]);
        controller.select_track(1);
        let err = controller
            .switch_playlist(tracks(&["ok.mp3", ""]))
            .expect_err("blank entry");
        assert!(matches!(err, PlayerError::InvalidPlaylist(_)));
        assert_eq!(controller.state().playlist(), tracks(&["a.mp3", "b.mp3"]).as_slice());
        assert_eq!(controller.state().current_index(), Some(1));
    }

    #[test]
    fn stale_responses_are_dropped() {
        let mut controller = controller(&["a.mp3"]);
        let first = controller.request_playlist("one.json");
        let second = controller.request_playlist("two.json");
        assert!(second.generation > first.generation);
        assert_eq!(controller.latest_generation(), second.generation);

        let stale = controller.apply_playlist_response(PlaylistResponse {
            generation: first.generation,
            resource: first.resource,
            result: Ok(tracks(&["stale.mp3"])),
        });
        assert_eq!(stale, Ok(SwitchOutcome::Stale));
        assert_eq!(controller.state().playlist(), tracks(&["a.mp3"]).as_slice());

        let fresh = controller.apply_playlist_response(PlaylistResponse {
            generation: second.generation,
            resource: second.resource,
            result: Ok(tracks(&["fresh.mp3"])),
        });
        assert!(matches!(fresh, Ok(SwitchOutcome::Applied { .. })));
        assert_eq!(controller.state().playlist(), tracks(&["fresh.mp3"]).as_slice());
    }

    #[test]
    fn direct_switch_outdates_pending_fetch() {
        let mut controller = controller(&["a.mp3"]);
        let pending = controller.request_playlist("slow.json");
        controller
            .switch_playlist(tracks(&["x.mp3"]))
            .expect("valid");

        let late = controller.apply_playlist_response(PlaylistResponse {
            generation: pending.generation,
            resource: pending.resource,
            result: Ok(tracks(&["slow.mp3"])),
        });
        assert_eq!(late, Ok(SwitchOutcome::Stale));
        assert_eq!(controller.state().playlist(), tracks(&["x.mp3"]).as_slice());
    }

    #[test]
    fn failed_response_keeps_playlist() {
        let mut controller = controller(&["a.mp3"]);
        let request = controller.request_playlist("broken.json");
        let result = controller.apply_playlist_response(PlaylistResponse {
            generation: request.generation,
            resource: request.resource,
            result: Err(PlayerError::InvalidPlaylist(String::from("not an array"))),
        });
        assert!(matches!(result, Err(PlayerError::InvalidPlaylist(_))));
        assert_eq!(controller.state().playlist(), tracks(&["a.mp3"]).as_slice());
    }

    #[test]
    fn timeline_progress_handles_unknown_duration() {
        let unknown = Timeline {
            position: Some(Duration::from_secs(3)),
            duration: None,
        };
        assert_eq!(unknown.progress(), 0.0);

        let half = Timeline {
            position: Some(Duration::from_secs(30)),
            duration: Some(Duration::from_secs(60)),
        };
        assert_eq!(half.progress(), 0.5);
    }

    proptest::proptest! {
        #[test]
        fn skipping_a_full_lap_returns_to_start(len in 1usize..40, start in 0usize..40) {
            let ids: Vec<String> = (0..len).map(|n| format!("{n}.mp3")).collect();
            let mut controller = TransportController::new(NullAudioEngine::new(), "songs");
            controller
                .switch_playlist(ids.iter().map(|id| Track::new(id.as_str())).collect())
                .expect("valid");
            let start = start.min(len - 1);
            controller.select_track(start);

            for _ in 0..len {
                controller.skip(Direction::Next);
            }
            proptest::prop_assert_eq!(controller.state().current_index(), Some(start));
        }

        #[test]
        fn index_stays_in_bounds_after_random_intents(
            ops in proptest::collection::vec(0u8..7, 1..120)
        ) {
            let mut controller = controller(&["a.mp3", "b.mp3", "c.mp3", "d.mp3"]);
            for op in ops {
                match op {
                    0 => controller.toggle_play_pause(),
                    1 => controller.skip(Direction::Next),
                    2 => controller.skip(Direction::Previous),
                    3 => controller.select_track(9),
                    4 => controller.handle_event(PlaybackEvent::Ended),
                    5 => {
                        let _ = controller.switch_playlist(tracks(&["c.mp3", "z.mp3"]));
                    }
                    _ => {
                        let _ = controller.switch_playlist(tracks(&["a.mp3", "b.mp3", "c.mp3"]));
                    }
                }

                let state = controller.state();
                if let Some(idx) = state.current_index() {
                    proptest::prop_assert!(idx < state.playlist().len());
                }
            }
        }
    }
}
