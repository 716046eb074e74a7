//! Notification Scheduler: the arm/disarm latch behind the button.
//!
//! A short press toggles the latch and plays a cue; holding the button
//! past `long_press_ms` asks for a reset instead.  When armed, the control
//! loop calls [`NotificationScheduler::fire_if_armed`] the cycle the
//! trigger minute lights up; that plays the melody once and disarms.
//!
//! All state is atomic so the latch can be read from any thread; button
//! edges are delivered by the main loop after debouncing.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::info;

use crate::app::ports::AudioPort;
use crate::melody::{ARM_CUE, DISARM_CUE, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonOutcome {
    /// Short press: the latch flipped to the carried state (true = armed).
    Toggled(bool),
    /// Released after the long-press threshold.
    LongPressReset,
    /// Release without a matching press.
    Ignored,
}

pub struct NotificationScheduler {
    armed: AtomicBool,
    pressed: AtomicBool,
    /// Press timestamp, ms since boot (wrapping).
    pressed_at_ms: AtomicU32,
    long_press_ms: u32,
}

impl NotificationScheduler {
    pub const fn new(long_press_ms: u32) -> Self {
        Self {
            armed: AtomicBool::new(false),
            pressed: AtomicBool::new(false),
            pressed_at_ms: AtomicU32::new(0),
            long_press_ms,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::Acquire)
    }

    /// Start the long-press countdown.  A second press edge without a
    /// release in between keeps the original start time.
    pub fn on_press(&self, now_ms: u32) {
        if self.pressed.load(Ordering::Acquire) {
            return;
        }
        self.pressed_at_ms.store(now_ms, Ordering::Relaxed);
        self.pressed.store(true, Ordering::Release);
    }

    pub fn on_release(&self, now_ms: u32, audio: &mut impl AudioPort) -> ButtonOutcome {
        if !self.pressed.swap(false, Ordering::AcqRel) {
            return ButtonOutcome::Ignored;
        }
        let held = now_ms.wrapping_sub(self.pressed_at_ms.load(Ordering::Relaxed));
        if held >= self.long_press_ms {
            return ButtonOutcome::LongPressReset;
        }
        ButtonOutcome::Toggled(self.toggle(audio))
    }

    /// True while the button is still held past the threshold.
    pub fn long_press_expired(&self, now_ms: u32) -> bool {
        self.is_pressed()
            && now_ms.wrapping_sub(self.pressed_at_ms.load(Ordering::Relaxed)) >= self.long_press_ms
    }

    /// Flip the latch and play the matching cue.  Returns the new state.
    pub fn toggle(&self, audio: &mut impl AudioPort) -> bool {
        let armed = !self.armed.fetch_xor(true, Ordering::AcqRel);
        audio.off();
        if armed {
            info!("Notification: armed");
            audio.play(&ARM_CUE, false);
        } else {
            info!("Notification: disarmed");
            audio.play(&DISARM_CUE, false);
        }
        armed
    }

    /// Play `melody` and disarm, but only if armed.  Fires at most once
    /// per arming.
    pub fn fire_if_armed(&self, melody: &[Tone], audio: &mut impl AudioPort) -> bool {
        if self
            .armed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        info!("Notification: playing alert");
        audio.play(melody, false);
        true
    }
}
