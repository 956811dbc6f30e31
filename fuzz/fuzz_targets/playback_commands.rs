//! Drives a playbar transport with arbitrary play/skip/seek/switch intents
//! against the silent engine. The current row must always stay inside the
//! playlist, through detached tracks and empty playlist switches alike.
#![no_main]

use libfuzzer_sys::fuzz_target;
use playbar::audio::{NullAudioEngine, PlaybackEvent};
use playbar::core::TransportController;
use playbar::model::{Direction, Track};

fuzz_target!(|data: &[u8]| {
    let mut controller = TransportController::new(NullAudioEngine::new(), "songs");
    let len = data.len() % 32;
    let _ = controller.switch_playlist(
        (0..len)
            .map(|idx| Track::new(format!("track_{idx}.mp3")))
            .collect(),
    );

    for byte in data {
        match byte % 8 {
            0 => controller.toggle_play_pause(),
            1 => controller.skip(Direction::Next),
            2 => controller.skip(Direction::Previous),
            3 => controller.select_track(usize::from(*byte / 8)),
            4 => controller.seek(f64::from(*byte) / 128.0 - 0.5),
            5 => controller.handle_event(PlaybackEvent::Ended),
            6 => {
                let keep = usize::from(*byte / 8) % 8;
                let _ = controller.switch_playlist(
                    (keep..keep + 3)
                        .map(|idx| Track::new(format!("track_{idx}.mp3")))
                        .collect(),
                );
            }
            _ => {
                let _ = controller.switch_playlist(Vec::new());
            }
        }

        let state = controller.state();
        if let Some(idx) = state.current_index() {
            assert!(idx < state.playlist().len());
        }
    }
});
