//! Indicator bank driver.
//!
//! Slots `0..PWM_INDICATOR_SLOTS` sit on LEDC channels and can fade; the
//! rest are plain GPIO outputs that switch at half brightness.  Slot state
//! lives behind an `embassy-sync` blocking mutex shared with the render
//! thread, which advances animations every [`FRAME_MS`] and writes only
//! the outputs whose level changed.

use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{info, warn};

use super::hw_init::{gpio_write, ledc_set, pwm_channel_for};
use super::hw_timer::monotonic_ms;
use super::led_patterns::Animation;

/// Render period.
pub const FRAME_MS: u64 = 20;

/// Digital slots light at or above this level.
const DIGITAL_THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotMode {
    Off,
    On,
    Animating { animation: Animation, started_ms: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    gpio: i32,
    channel: Option<u32>,
    mode: SlotMode,
    /// Last level written to the pin.
    level: u8,
}

impl Slot {
    fn target_level(&mut self, now_ms: u64) -> u8 {
        match self.mode {
            SlotMode::Off => 0,
            SlotMode::On => u8::MAX,
            SlotMode::Animating { animation, started_ms } => {
                let elapsed = now_ms.saturating_sub(started_ms).min(u64::from(u32::MAX)) as u32;
                match animation.level_at(elapsed) {
                    Some(level) => level,
                    None => {
                        self.mode = SlotMode::Off;
                        0
                    }
                }
            }
        }
    }

    fn write(&self) {
        match self.channel {
            Some(channel) => ledc_set(channel, self.level),
            None => gpio_write(self.gpio, self.level >= DIGITAL_THRESHOLD),
        }
    }
}

type SlotTable = Mutex<CriticalSectionRawMutex, RefCell<Vec<Slot>>>;

/// Cloneable handle to the bank; clones share state with the render thread.
#[derive(Clone)]
pub struct IndicatorBank {
    slots: Arc<SlotTable>,
}

impl IndicatorBank {
    pub fn new(pins: &[i32]) -> Self {
        let slots = pins
            .iter()
            .enumerate()
            .map(|(i, &gpio)| Slot {
                gpio,
                channel: pwm_channel_for(i),
                mode: SlotMode::Off,
                level: 0,
            })
            .collect();
        Self {
            slots: Arc::new(Mutex::new(RefCell::new(slots))),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock(|s| s.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the render thread.
    pub fn start_render_thread(&self) -> std::io::Result<()> {
        let bank = self.clone();
        std::thread::Builder::new()
            .name("indicators".into())
            .stack_size(4096)
            .spawn(move || {
                loop {
                    bank.tick(monotonic_ms());
                    std::thread::sleep(std::time::Duration::from_millis(FRAME_MS));
                }
            })?;
        info!("Indicators: render thread started ({} ms frames)", FRAME_MS);
        Ok(())
    }

    fn set_mode(&self, slot: usize, mode: SlotMode) {
        let found = self.slots.lock(|s| match s.borrow_mut().get_mut(slot) {
            Some(entry) => {
                entry.mode = mode;
                true
            }
            None => false,
        });
        if found {
            self.tick(monotonic_ms());
        } else {
            warn!("Indicators: slot {} out of range", slot);
        }
    }

    pub fn set_on(&self, slot: usize) {
        self.set_mode(slot, SlotMode::On);
    }

    pub fn set_off(&self, slot: usize) {
        self.set_mode(slot, SlotMode::Off);
    }

    pub fn start(&self, slot: usize, animation: Animation) {
        self.set_mode(
            slot,
            SlotMode::Animating {
                animation,
                started_ms: monotonic_ms(),
            },
        );
    }

    /// Lit or animating.
    pub fn is_active(&self, slot: usize) -> bool {
        self.slots.lock(|s| {
            s.borrow()
                .get(slot)
                .is_some_and(|entry| entry.mode != SlotMode::Off)
        })
    }

    pub fn is_animating(&self, slot: usize) -> bool {
        self.slots.lock(|s| {
            s.borrow()
                .get(slot)
                .is_some_and(|entry| matches!(entry.mode, SlotMode::Animating { .. }))
        })
    }

    /// Level last written to the slot's output.
    pub fn level(&self, slot: usize) -> u8 {
        self.slots.lock(|s| s.borrow().get(slot).map_or(0, |entry| entry.level))
    }

    /// Advance every slot to `now_ms` and write the outputs that changed.
    pub fn tick(&self, now_ms: u64) {
        let changed: Vec<Slot> = self.slots.lock(|s| {
            s.borrow_mut()
                .iter_mut()
                .filter_map(|slot| {
                    let level = slot.target_level(now_ms);
                    if level == slot.level {
                        return None;
                    }
                    slot.level = level;
                    Some(*slot)
                })
                .collect()
        });
        for slot in &changed {
            slot.write();
        }
    }

    /// Block until the animation on `slot` has finished.  Renders while
    /// waiting, so it also works before the render thread is running.
    pub fn wait_idle(&self, slot: usize) {
        while self.is_animating(slot) {
            self.tick(monotonic_ms());
            std::thread::sleep(std::time::Duration::from_millis(FRAME_MS / 2));
        }
    }
}
