use crate::audio::{AudioEngine, NullAudioEngine, RodioAudioEngine};
use crate::config::Settings;
use crate::core::{SwitchOutcome, TransportController};
use crate::library;
use crate::loader::PlaylistLoader;
use crate::model::{Direction, PlaybackStatus, PlaylistCard};
use crate::ui::{self, Chrome, Hitboxes};
use crate::view::NowPlayingView;
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::time::{Duration, Instant};

const SEEK_STEP: f64 = 0.05;

/// Terminal host around the transport controller. Owns only UI concerns:
/// the list cursor, scroll offset, card selection and click regions.
pub struct App<E: AudioEngine> {
    pub controller: TransportController<E>,
    pub cards: Vec<PlaylistCard>,
    pub active_card: Option<usize>,
    pub cursor: usize,
    loader: PlaylistLoader,
    autoplay_generation: Option<u64>,
    hitboxes: Hitboxes,
    list_offset: usize,
    quit: bool,
}

impl<E: AudioEngine> App<E> {
    pub fn new(controller: TransportController<E>, cards: Vec<PlaylistCard>) -> Self {
        Self {
            controller,
            cards,
            active_card: None,
            cursor: 0,
            loader: PlaylistLoader::new(),
            autoplay_generation: None,
            hitboxes: Hitboxes::default(),
            list_offset: 0,
            quit: false,
        }
    }

    /// Fetches the card at `index`. When `autoplay` is set and the response
    /// is still current on arrival, the first track is started.
    pub fn open_card(&mut self, index: usize, autoplay: bool) {
        let Some(card) = self.cards.get(index) else {
            return;
        };
        let request = self.controller.request_playlist(card.resource.clone());
        self.autoplay_generation = autoplay.then_some(request.generation);
        self.active_card = Some(index);
        self.loader.spawn(request);
        self.controller.dirty = true;
    }

    /// Applies finished playlist fetches and primitive notifications.
    pub fn pump(&mut self) {
        while let Some(response) = self.loader.try_recv() {
            let generation = response.generation;
            match self.controller.apply_playlist_response(response) {
                Ok(SwitchOutcome::Applied { .. }) => {
                    self.cursor = self.controller.state().current_index().unwrap_or(0);
                    self.list_offset = 0;
                    if self.autoplay_generation.take() == Some(generation)
                        && self.controller.state().status() == PlaybackStatus::Idle
                    {
                        self.controller.toggle_play_pause();
                    }
                }
                Ok(SwitchOutcome::Stale) => {}
                Err(_) => {
                    if self.autoplay_generation == Some(generation) {
                        self.autoplay_generation = None;
                    }
                }
            }
        }
        self.controller.pump_events();
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn view(&self) -> NowPlayingView {
        NowPlayingView::build(
            &self.controller.snapshot(),
            self.controller.timeline(),
            Some(self.controller.progress()),
        )
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        let rows = self.controller.state().playlist().len();
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char(' ') => self.controller.toggle_play_pause(),
            KeyCode::Char('n') => self.skip(Direction::Next),
            KeyCode::Char('b') | KeyCode::Char('p') => self.skip(Direction::Previous),
            KeyCode::Left => self.controller.seek_by(-SEEK_STEP),
            KeyCode::Right => self.controller.seek_by(SEEK_STEP),
            KeyCode::Down => {
                if rows > 0 {
                    self.cursor = (self.cursor + 1).min(rows - 1);
                    self.controller.dirty = true;
                }
            }
            KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                self.controller.dirty = true;
            }
            KeyCode::Enter => self.controller.select_track(self.cursor),
            KeyCode::Tab => {
                if !self.cards.is_empty() {
                    let next = self
                        .active_card
                        .map_or(0, |idx| (idx + 1) % self.cards.len());
                    self.open_card(next, false);
                }
            }
            KeyCode::Char(digit @ '1'..='9') => {
                let index = usize::from(digit as u8 - b'1');
                self.open_card(index, false);
            }
            _ => {}
        }
    }

    /// One delegated handler for every clickable region, keyed by row/card index.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(row) = self.hitboxes.row_at(mouse.column, mouse.row) {
                    self.cursor = row;
                    self.controller.select_track(row);
                } else if let Some(fraction) = self.hitboxes.seek_fraction(mouse.column, mouse.row)
                {
                    self.controller.seek(fraction);
                } else if let Some(card) = self.hitboxes.card_at(mouse.column, mouse.row) {
                    self.open_card(card, false);
                }
            }
            MouseEventKind::ScrollDown => self.handle_key(KeyEvent::from(KeyCode::Down)),
            MouseEventKind::ScrollUp => self.handle_key(KeyEvent::from(KeyCode::Up)),
            _ => {}
        }
    }

    fn skip(&mut self, direction: Direction) {
        self.controller.skip(direction);
        if let Some(idx) = self.controller.state().current_index() {
            self.cursor = idx;
        }
    }

    fn render(&mut self, frame: &mut ratatui::Frame) {
        let view = self.view();
        let chrome = Chrome {
            cards: &self.cards,
            active_card: self.active_card,
            cursor: self.cursor,
            list_offset: self.list_offset,
            message: &self.controller.status,
        };
        self.hitboxes = ui::draw(frame, &view, &chrome);
        self.list_offset = self.hitboxes.list_offset;
    }
}

/// Cards from settings plus any discovered in `playlists_dir`; the startup
/// playlist is always the first card.
pub fn cards_from_settings(settings: &Settings) -> Vec<PlaylistCard> {
    let mut configured = vec![PlaylistCard {
        name: settings
            .playlist
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("songs")),
        resource: settings.playlist.clone(),
    }];
    configured.extend(
        settings
            .cards
            .iter()
            .filter(|card| card.resource != settings.playlist)
            .cloned(),
    );

    let discovered = settings
        .playlists_dir
        .as_deref()
        .map(library::discover_cards)
        .unwrap_or_default();
    library::merge_cards(&configured, discovered)
}

pub fn run(settings: Settings) -> Result<()> {
    let engine: Box<dyn AudioEngine> = match RodioAudioEngine::new() {
        Ok(engine) => Box::new(engine),
        Err(err) => {
            log::warn!("no audio output, running silent: {err:#}");
            Box::new(NullAudioEngine::new())
        }
    };

    let controller = TransportController::new(engine, settings.songs_dir.clone());
    let mut app = App::new(controller, cards_from_settings(&settings));
    app.open_card(0, settings.autoplay);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut last_tick = Instant::now();
    let result: Result<()> = loop {
        app.pump();

        if app.controller.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            if let Err(err) = terminal.draw(|frame| app.render(frame)) {
                break Err(err.into());
            }
            app.controller.dirty = false;
            last_tick = Instant::now();
        }

        match event::poll(Duration::from_millis(33)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => break Err(err.into()),
        }

        match event::read() {
            Ok(Event::Key(key)) => app.handle_key(key),
            Ok(Event::Mouse(mouse)) => app.handle_mouse(mouse),
            Ok(Event::Resize(_, _)) => app.controller.dirty = true,
            Ok(_) => {}
            Err(err) => break Err(err.into()),
        }

        if app.should_quit() {
            break Ok(());
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    log::info!("shutting down");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Track;
    use std::fs;
    use std::path::PathBuf;

    fn write_playlist(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("write playlist");
        path
    }

    fn app_with_cards(cards: Vec<PlaylistCard>) -> App<NullAudioEngine> {
        App::new(TransportController::new(NullAudioEngine::new(), "songs"), cards)
    }

    fn wait_for_responses(app: &mut App<NullAudioEngine>, expected_len: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.controller.state().playlist().len() != expected_len && Instant::now() < deadline
        {
            app.pump();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn startup_card_autoplays_first_track() {
        let dir = tempfile::tempdir().expect("tempdir");
        let main = write_playlist(dir.path(), "songs.json", r#"["a.mp3", "b.mp3"]"#);
        let mut app = app_with_cards(vec![PlaylistCard {
            name: String::from("songs"),
            resource: main,
        }]);

        app.open_card(0, true);
        wait_for_responses(&mut app, 2);

        let state = app.controller.state();
        assert_eq!(state.current_index(), Some(0));
        assert_eq!(state.loaded_track(), Some(&Track::from("a.mp3")));
        assert_eq!(state.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn blocked_autoplay_still_shows_first_track() {
        let dir = tempfile::tempdir().expect("tempdir");
        let main = write_playlist(dir.path(), "songs.json", r#"["a.mp3"]"#);
        let mut app = app_with_cards(vec![PlaylistCard {
            name: String::from("songs"),
            resource: main,
        }]);
        app.controller.engine_mut().set_play_blocked(true);

        app.open_card(0, true);
        wait_for_responses(&mut app, 1);

        let state = app.controller.state();
        assert_eq!(state.current_index(), Some(0));
        assert_eq!(state.status(), PlaybackStatus::Paused);
    }

    #[test]
    fn switching_cards_does_not_interrupt_playback() {
        let dir = tempfile::tempdir().expect("tempdir");
        let main = write_playlist(dir.path(), "songs.json", r#"["a.mp3", "b.mp3"]"#);
        let other = write_playlist(dir.path(), "other.json", r#"["x.mp3", "b.mp3", "y.mp3"]"#);
        let mut app = app_with_cards(vec![
            PlaylistCard {
                name: String::from("songs"),
                resource: main,
            },
            PlaylistCard {
                name: String::from("other"),
                resource: other,
            },
        ]);

        app.open_card(0, false);
        wait_for_responses(&mut app, 2);
        app.controller.select_track(1);

        app.handle_key(KeyEvent::from(KeyCode::Char('2')));
        wait_for_responses(&mut app, 3);

        let state = app.controller.state();
        assert_eq!(app.active_card, Some(1));
        assert_eq!(state.current_index(), Some(1));
        assert_eq!(state.status(), PlaybackStatus::Playing);
        assert_eq!(app.cursor, 1);
    }

    #[test]
    fn broken_card_keeps_current_playlist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let main = write_playlist(dir.path(), "songs.json", r#"["a.mp3"]"#);
        let broken = write_playlist(dir.path(), "broken.json", r#"{"songs": ["z.mp3"]}"#);
        let mut app = app_with_cards(vec![
            PlaylistCard {
                name: String::from("songs"),
                resource: main,
            },
            PlaylistCard {
                name: String::from("broken"),
                resource: broken,
            },
        ]);

        app.open_card(0, false);
        wait_for_responses(&mut app, 1);
        app.open_card(1, false);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !app.controller.status.starts_with("Could not load") && Instant::now() < deadline {
            app.pump();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(app.controller.state().playlist(), &[Track::from("a.mp3")]);
    }

    #[test]
    fn keys_drive_transport() {
        let mut app = app_with_cards(Vec::new());
        app.controller
            .switch_playlist(vec![Track::from("a"), Track::from("b"), Track::from("c")])
            .expect("valid");

        app.handle_key(KeyEvent::from(KeyCode::Char(' ')));
        assert_eq!(app.controller.state().current_index(), Some(0));

        app.handle_key(KeyEvent::from(KeyCode::Char('b')));
        assert_eq!(app.controller.state().current_index(), Some(2));
        assert_eq!(app.cursor, 2);

        app.handle_key(KeyEvent::from(KeyCode::Up));
        app.handle_key(KeyEvent::from(KeyCode::Enter));
        assert_eq!(app.controller.state().current_index(), Some(1));

        app.handle_key(KeyEvent::from(KeyCode::Char('q')));
        assert!(app.should_quit());
    }

    #[test]
    fn startup_playlist_is_first_card() {
        let settings = Settings {
            playlist: PathBuf::from("main.json"),
            cards: vec![
                PlaylistCard {
                    name: String::from("dup"),
                    resource: PathBuf::from("main.json"),
                },
                PlaylistCard {
                    name: String::from("Chill"),
                    resource: PathBuf::from("chill.json"),
                },
            ],
            ..Settings::default()
        };
        let cards = cards_from_settings(&settings);
        let names: Vec<&str> = cards.iter().map(|card| card.name.as_str()).collect();
        assert_eq!(names, vec!["main", "Chill"]);
    }
}
