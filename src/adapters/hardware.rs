//! Hardware adapter: bridges the indicator bank and speaker to the domain
//! port traits.
//!
//! This is the only module the control loop reaches real outputs through.
//! On non-espidf targets the underlying drivers write to cfg-gated stubs,
//! so the adapter still runs (and renders state) on the host.

use log::warn;

use crate::app::ports::{AudioPort, IndicatorPort};
use crate::drivers::indicator::IndicatorBank;
use crate::drivers::led_patterns::Animation;
use crate::drivers::speaker::Speaker;
use crate::melody::Tone;

/// Concrete adapter that combines all outputs behind port traits.
pub struct HardwareAdapter {
    bank: IndicatorBank,
    speaker: Speaker,
}

impl HardwareAdapter {
    pub fn new(bank: IndicatorBank, speaker: Speaker) -> Self {
        Self { bank, speaker }
    }

    pub fn bank(&self) -> &IndicatorBank {
        &self.bank
    }
}

// ── IndicatorPort implementation ──────────────────────────────

impl IndicatorPort for HardwareAdapter {
    fn indicator_count(&self) -> usize {
        self.bank.len()
    }

    fn on(&mut self, slot: usize) {
        self.bank.set_on(slot);
    }

    fn off(&mut self, slot: usize) {
        self.bank.set_off(slot);
    }

    fn animate(&mut self, slot: usize, animation: Animation, blocking: bool) {
        self.bank.start(slot, animation);
        if blocking {
            if animation.duration_ms().is_some() {
                self.bank.wait_idle(slot);
            } else {
                warn!("Indicators: endless animation on slot {} cannot block", slot);
            }
        }
    }

    fn is_active(&self, slot: usize) -> bool {
        self.bank.is_active(slot)
    }
}

// ── AudioPort implementation ──────────────────────────────────

impl AudioPort for HardwareAdapter {
    fn play(&mut self, tones: &[Tone], blocking: bool) {
        let generation = self.speaker.play(tones);
        if blocking {
            self.speaker.wait(generation);
        }
    }

    fn off(&mut self) {
        self.speaker.stop();
    }
}
