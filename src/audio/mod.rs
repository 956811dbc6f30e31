use crate::error::PlaybackError;
use crate::model::TrackLocation;
use anyhow::{Context, Result};
use rodio::Source;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Notifications raised by the playback primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Playback position moved.
    TimeUpdate,
    /// Duration of the loaded source became known.
    LoadedMetadata,
    /// The loaded source played to its end.
    Ended,
}

/// The playback primitive: a single audio output with one loaded source.
pub trait AudioEngine {
    /// Binds a new source. Playback of any previous source stops and the new
    /// one stays paused until [`AudioEngine::play`].
    fn load(&mut self, location: &TrackLocation) -> Result<(), PlaybackError>;
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn has_source(&self) -> bool;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    fn seek_to(&mut self, position: Duration) -> Result<(), PlaybackError>;
    /// Drains notifications raised since the last call. `Ended` is reported
    /// once per loaded source.
    fn poll_events(&mut self) -> Vec<PlaybackEvent>;
}

impl<E: AudioEngine + ?Sized> AudioEngine for Box<E> {
    fn load(&mut self, location: &TrackLocation) -> Result<(), PlaybackError> {
        (**self).load(location)
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn has_source(&self) -> bool {
        (**self).has_source()
    }

    fn position(&self) -> Option<Duration> {
        (**self).position()
    }

    fn duration(&self) -> Option<Duration> {
        (**self).duration()
    }

    fn seek_to(&mut self, position: Duration) -> Result<(), PlaybackError> {
        (**self).seek_to(position)
    }

    fn poll_events(&mut self) -> Vec<PlaybackEvent> {
        (**self).poll_events()
    }
}

/// Tracks which one-shot notifications were already raised for a source.
#[derive(Debug, Default)]
struct EventLatch {
    metadata_pending: bool,
    ended_reported: bool,
    last_position: Option<Duration>,
}

impl EventLatch {
    fn reset(&mut self, has_duration: bool) {
        self.metadata_pending = has_duration;
        self.ended_reported = false;
        self.last_position = None;
    }

    fn collect(&mut self, position: Option<Duration>, finished: bool) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        if std::mem::take(&mut self.metadata_pending) {
            events.push(PlaybackEvent::LoadedMetadata);
        }
        if position.is_some() && position != self.last_position {
            self.last_position = position;
            events.push(PlaybackEvent::TimeUpdate);
        }
        if finished && !self.ended_reported {
            self.ended_reported = true;
            events.push(PlaybackEvent::Ended);
        }
        events
    }
}

pub struct RodioAudioEngine {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    track_duration: Option<Duration>,
    latch: EventLatch,
}

impl RodioAudioEngine {
    pub fn new() -> Result<Self> {
        let mut stream = with_silenced_stderr(|| {
            OutputStreamBuilder::from_default_device()
                .context("failed to open default system output stream")
                .and_then(|builder| {
                    builder
                        .with_error_callback(|_| {})
                        .open_stream_or_fallback()
                        .context("failed to start default output stream")
                })
        })?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();

        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            latch: EventLatch::default(),
        })
    }
}

impl AudioEngine for RodioAudioEngine {
    fn load(&mut self, location: &TrackLocation) -> Result<(), PlaybackError> {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();
        self.current = None;
        self.track_duration = None;

        let path = location.to_path();
        let source = open_source(&path)?;
        self.track_duration = source
            .total_duration()
            .filter(|duration| !duration.is_zero());
        self.sink.append(source);
        self.current = Some(path);
        self.latch.reset(self.track_duration.is_some());
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let Some(path) = self.current.as_ref() else {
            return Err(PlaybackError::NoSource);
        };
        if self.sink.empty() {
            // Source played out; start it again from the top.
            self.sink.append(open_source(path)?);
            self.latch.ended_reported = false;
        }
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_paused(&self) -> bool {
        self.current.is_none() || self.sink.is_paused() || self.sink.empty()
    }

    fn has_source(&self) -> bool {
        self.current.is_some()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<(), PlaybackError> {
        if self.current.is_none() {
            return Err(PlaybackError::NoSource);
        }
        self.sink
            .try_seek(position)
            .map_err(|err| PlaybackError::Seek(format!("{err:?}")))
    }

    fn poll_events(&mut self) -> Vec<PlaybackEvent> {
        let finished = self.current.is_some() && !self.sink.is_paused() && self.sink.empty();
        let events = self.latch.collect(self.position(), finished);
        if finished {
            self.sink.pause();
        }
        events
    }
}

fn open_source(path: &Path) -> Result<impl Source + Send + 'static, PlaybackError> {
    let file = File::open(path).map_err(|err| PlaybackError::Open {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    Decoder::try_from(file).map_err(|err| PlaybackError::Decode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Silent engine driven by a wall clock. Used when no output device can be
/// opened, and for exercising the transport without audio hardware.
pub struct NullAudioEngine {
    paused: bool,
    current: Option<PathBuf>,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    play_blocked: bool,
    latch: EventLatch,
}

impl NullAudioEngine {
    pub fn new() -> Self {
        Self {
            paused: true,
            current: None,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            play_blocked: false,
            latch: EventLatch::default(),
        }
    }

    /// Makes every `play` fail the way a host denying autoplay would, until
    /// cleared again.
    pub fn set_play_blocked(&mut self, blocked: bool) {
        self.play_blocked = blocked;
    }

    /// Overrides the detected duration of the loaded source.
    pub fn set_duration(&mut self, duration: Option<Duration>) {
        self.track_duration = duration;
        self.latch.reset(duration.is_some());
    }

    fn estimate_duration(path: &Path) -> Option<Duration> {
        let file = File::open(path).ok()?;
        let source = Decoder::try_from(file).ok()?;
        source
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }

    fn at_end(&self) -> bool {
        self.track_duration
            .is_some_and(|duration| self.current.is_some() && self.current_position() >= duration)
    }

    fn is_finished(&self) -> bool {
        !self.paused && self.at_end()
    }
}

impl Default for NullAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for NullAudioEngine {
    fn load(&mut self, location: &TrackLocation) -> Result<(), PlaybackError> {
        let path = location.to_path();
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = Self::estimate_duration(&path);
        self.current = Some(path);
        self.latch.reset(self.track_duration.is_some());
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.current.is_none() {
            return Err(PlaybackError::NoSource);
        }
        if self.play_blocked {
            return Err(PlaybackError::Blocked(String::from(
                "playback requires a user gesture",
            )));
        }
        if self.at_end() {
            self.position_offset = Duration::ZERO;
            self.latch.ended_reported = false;
        }
        if self.paused {
            self.started_at = Some(Instant::now());
            self.paused = false;
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused || self.is_finished()
    }

    fn has_source(&self) -> bool {
        self.current.is_some()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.current_position())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<(), PlaybackError> {
        if self.current.is_none() {
            return Err(PlaybackError::NoSource);
        }

        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
        self.latch.ended_reported = false;
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<PlaybackEvent> {
        let finished = self.is_finished();
        let events = self.latch.collect(self.position(), finished);
        if finished {
            self.pause();
        }
        events
    }
}
