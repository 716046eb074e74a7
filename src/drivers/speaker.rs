//! Speaker driver: a square wave on an LEDC channel, fed by a player thread.
//!
//! Callers hand a melody to the player through an `embassy-sync`
//! [`Signal`]; the player waits on it with `futures_lite::future::block_on`
//! and plays notes in short slices, abandoning the current melody as soon
//! as a newer one is signalled.  An empty melody silences the speaker.

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::info;

use super::hw_init::speaker_tone;
use crate::melody::{MAX_MELODY_LEN, Melody, Tone};

/// Longest sleep between interrupt checks while a note sounds.
const SLICE_MS: u64 = 10;

struct Request {
    generation: u32,
    melody: Melody,
}

struct Player {
    request: Signal<CriticalSectionRawMutex, Request>,
    /// Generation of the most recent request.
    requested: AtomicU32,
    /// Generation of the last request played to completion or abandoned.
    finished: AtomicU32,
}

#[derive(Clone)]
pub struct Speaker {
    player: Arc<Player>,
}

impl Speaker {
    /// Spawn the player thread.
    pub fn start() -> std::io::Result<Self> {
        let player = Arc::new(Player {
            request: Signal::new(),
            requested: AtomicU32::new(0),
            finished: AtomicU32::new(0),
        });
        let worker = Arc::clone(&player);
        std::thread::Builder::new()
            .name("audio".into())
            .stack_size(4096)
            .spawn(move || run_player(&worker))?;
        info!("Speaker: player thread started");
        Ok(Self { player })
    }

    /// Replace whatever is playing with `tones`.
    pub fn play(&self, tones: &[Tone]) -> u32 {
        let melody: Melody = tones.iter().copied().take(MAX_MELODY_LEN).collect();
        let generation = self.player.requested.fetch_add(1, Ordering::AcqRel) + 1;
        self.player.request.signal(Request { generation, melody });
        generation
    }

    pub fn stop(&self) {
        self.play(&[]);
    }

    /// Block until the request `generation` has finished.
    pub fn wait(&self, generation: u32) {
        while self.player.finished.load(Ordering::Acquire) < generation {
            std::thread::sleep(Duration::from_millis(SLICE_MS));
        }
    }

    pub fn is_playing(&self) -> bool {
        self.player.finished.load(Ordering::Acquire) < self.player.requested.load(Ordering::Acquire)
    }
}

fn run_player(player: &Player) {
    loop {
        let request = futures_lite::future::block_on(player.request.wait());
        play_melody(player, &request.melody);
        speaker_tone(0);
        player.finished.fetch_max(request.generation, Ordering::AcqRel);
    }
}

/// Returns early if a newer request arrives.
fn play_melody(player: &Player, melody: &[Tone]) {
    for tone in melody {
        speaker_tone(tone.freq_hz);
        let mut remaining = u64::from(tone.duration_ms);
        while remaining > 0 {
            if player.request.signaled() {
                return;
            }
            let slice = remaining.min(SLICE_MS);
            std::thread::sleep(Duration::from_millis(slice));
            remaining -= slice;
        }
    }
}
