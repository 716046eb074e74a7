//! Tones and note-name melodies for the speaker.
//!
//! Melodies are written the way a musician would jot them down:
//! `("c6", 100)` is a C in the sixth octave held for 100 ms, `("r", 50)` is
//! a 50 ms rest.  Parsing happens once at startup; the audio path only ever
//! sees resolved [`Tone`]s.

use serde::{Deserialize, Serialize};

/// Longest melody the player accepts (notes beyond this are dropped).
pub const MAX_MELODY_LEN: usize = 32;

/// A single note: frequency in Hz (0 = rest) and duration in ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tone {
    pub freq_hz: u16,
    pub duration_ms: u16,
}

impl Tone {
    pub const fn new(freq_hz: u16, duration_ms: u16) -> Self {
        Self { freq_hz, duration_ms }
    }

    pub const fn rest(duration_ms: u16) -> Self {
        Self { freq_hz: 0, duration_ms }
    }

    pub fn is_rest(&self) -> bool {
        self.freq_hz == 0
    }
}

pub type Melody = heapless::Vec<Tone, MAX_MELODY_LEN>;

/// Arm cue: rising C-E-G.
pub const ARM_CUE: [Tone; 3] = [
    Tone::new(1047, 100),
    Tone::new(1319, 100),
    Tone::new(1568, 100),
];

/// Disarm cue: falling G-C.
pub const DISARM_CUE: [Tone; 2] = [Tone::new(1568, 100), Tone::new(1047, 100)];

/// Resolve a note name (`c4`, `f#5`, `bb3`, `r`) to a frequency in Hz.
///
/// Equal temperament with A4 = 440 Hz.  Returns `Some(0)` for a rest and
/// `None` if the name is not a note.
pub fn note_frequency(name: &str) -> Option<u16> {
    let name = name.trim().to_ascii_lowercase();
    if name == "r" || name == "rest" || name.is_empty() {
        return Some(0);
    }

    let mut chars = name.chars();
    let letter = chars.next()?;
    let base: i32 = match letter {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.as_bytes().first() {
        Some(b'#') => (1, &rest[1..]),
        Some(b'b') if rest.len() > 1 => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i32 = octave_str.parse().ok()?;
    if !(0..=8).contains(&octave) {
        return None;
    }

    // MIDI note number; A4 = 69.
    let midi = (octave + 1) * 12 + base + accidental;
    let freq = 440.0_f32 * 2.0_f32.powf((midi - 69) as f32 / 12.0);
    Some(freq.round() as u16)
}

/// Build a melody from `(note, duration_ms)` pairs.  Unknown note names are
/// logged and skipped so a typo never silences the whole alert.
pub fn melody_from_notes(notes: &[(&str, u16)]) -> Melody {
    let mut melody = Melody::new();
    for &(name, duration_ms) in notes {
        match note_frequency(name) {
            Some(freq_hz) => {
                if melody.push(Tone::new(freq_hz, duration_ms)).is_err() {
                    log::warn!("melody: truncated at {} notes", MAX_MELODY_LEN);
                    break;
                }
            }
            None => log::warn!("melody: unknown note '{}' skipped", name),
        }
    }
    melody
}

/// Total playing time of a tone sequence.
pub fn duration_ms(tones: &[Tone]) -> u32 {
    tones.iter().map(|t| u32::from(t.duration_ms)).sum()
}
