//! Single-LED animation patterns.
//!
//! An [`Animation`] is a pure function of elapsed time: the indicator
//! render loop asks [`Animation::level_at`] for a brightness (0-255) each
//! frame and drops the animation once it returns `None`.  Finished
//! animations leave the LED dark.
//!
//! | Pattern        | Shape                                  | Used for                 |
//! |----------------|----------------------------------------|--------------------------|
//! | `SLOW_PULSE`   | 1 s fade in, 2 s fade out, forever     | train arriving (slot 0)  |
//! | `HEARTBEAT`    | one 250 ms / 750 ms pulse              | fetch ok, nothing due    |
//! | `FAILURE_BLINK`| 10 ms on / 250 ms off, x3              | fetch failed             |
//! | `SELF_TEST`    | 1 s on / 1 s off, once                 | power-on lamp test       |
//! | `SWEEP_FLASH`  | 10 ms on / 10 ms off, once             | network-up sweep         |
//! | `RESET_BLINK`  | 1 s on / 1 s off, forever              | reset pending            |

/// How many times a pattern cycle plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Times(u16),
    Forever,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    /// Square wave.
    Blink { on_ms: u32, off_ms: u32, repeat: Repeat },
    /// Linear ramp 0 → 255 → 0.
    Pulse { fade_in_ms: u32, fade_out_ms: u32, repeat: Repeat },
}

pub const SLOW_PULSE: Animation = Animation::Pulse {
    fade_in_ms: 1000,
    fade_out_ms: 2000,
    repeat: Repeat::Forever,
};

pub const HEARTBEAT: Animation = Animation::Pulse {
    fade_in_ms: 250,
    fade_out_ms: 750,
    repeat: Repeat::Times(1),
};

pub const FAILURE_BLINK: Animation = Animation::Blink {
    on_ms: 10,
    off_ms: 250,
    repeat: Repeat::Times(3),
};

pub const SELF_TEST: Animation = Animation::Blink {
    on_ms: 1000,
    off_ms: 1000,
    repeat: Repeat::Times(1),
};

pub const SWEEP_FLASH: Animation = Animation::Blink {
    on_ms: 10,
    off_ms: 10,
    repeat: Repeat::Times(1),
};

pub const RESET_BLINK: Animation = Animation::Blink {
    on_ms: 1000,
    off_ms: 1000,
    repeat: Repeat::Forever,
};

impl Animation {
    /// Length of one cycle.
    pub fn period_ms(&self) -> u32 {
        match *self {
            Self::Blink { on_ms, off_ms, .. } => on_ms + off_ms,
            Self::Pulse { fade_in_ms, fade_out_ms, .. } => fade_in_ms + fade_out_ms,
        }
    }

    pub fn repeat(&self) -> Repeat {
        match *self {
            Self::Blink { repeat, .. } | Self::Pulse { repeat, .. } => repeat,
        }
    }

    /// Total run time, `None` for an endless pattern.
    pub fn duration_ms(&self) -> Option<u32> {
        match self.repeat() {
            Repeat::Times(n) => Some(self.period_ms().saturating_mul(u32::from(n))),
            Repeat::Forever => None,
        }
    }

    /// Brightness `elapsed_ms` into the animation, or `None` once it has
    /// run its course.
    pub fn level_at(&self, elapsed_ms: u32) -> Option<u8> {
        if let Some(total) = self.duration_ms() {
            if elapsed_ms >= total {
                return None;
            }
        }
        let period = self.period_ms();
        if period == 0 {
            return None;
        }
        let phase = elapsed_ms % period;

        Some(match *self {
            Self::Blink { on_ms, .. } => {
                if phase < on_ms {
                    u8::MAX
                } else {
                    0
                }
            }
            Self::Pulse { fade_in_ms, fade_out_ms, .. } => {
                ramp(phase, fade_in_ms, fade_out_ms)
            }
        })
    }

    pub fn is_finished(&self, elapsed_ms: u32) -> bool {
        self.level_at(elapsed_ms).is_none()
    }
}

/// Triangular brightness curve without libm: 0 → 255 over `up_ms`, then
/// back to 0 over `down_ms`.
fn ramp(phase_ms: u32, up_ms: u32, down_ms: u32) -> u8 {
    let pos = u64::from(phase_ms);
    if pos < u64::from(up_ms) {
        ((pos * 255) / u64::from(up_ms)) as u8
    } else if down_ms == 0 {
        0
    } else {
        let left = u64::from(up_ms + down_ms) - pos;
        ((left * 255) / u64::from(down_ms)) as u8
    }
}
