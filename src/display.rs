//! Display State Controller.
//!
//! Maps the per-cycle [`EtaSet`] onto the indicator bank.  Each slot
//! remembers the steady state it was last commanded into, so a slot that
//! is already lit is left alone (its pulse keeps its phase) and only
//! dark → lit transitions count as activations.
//!
//! | in set | slot active | action                                  |
//! |--------|-------------|-----------------------------------------|
//! | yes    | no          | slot 0: slow pulse, others: on; activate |
//! | yes    | yes         | none                                     |
//! | no     | yes         | off                                      |
//! | no     | no          | none                                     |
//!
//! Transient animations (heartbeat, failure blink) do not change a slot's
//! active state.

use log::debug;

use crate::app::ports::IndicatorPort;
use crate::config::MAX_INDICATORS;
use crate::drivers::led_patterns::{FAILURE_BLINK, HEARTBEAT, SLOW_PULSE};
use crate::feed::{EtaSet, FetchOutcome};

/// Slot that pulses for an arriving train and gives the heartbeat.
pub const ARRIVING_SLOT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorSlot {
    pub index: usize,
    pub is_active: bool,
}

pub struct DisplayController {
    slots: heapless::Vec<IndicatorSlot, MAX_INDICATORS>,
    status_slot: usize,
}

impl DisplayController {
    /// `count` is clamped to the mask width; `status_slot` must lie inside
    /// the bank (validated with the config).
    pub fn new(count: usize, status_slot: usize) -> Self {
        let mut slots = heapless::Vec::new();
        for index in 0..count.min(MAX_INDICATORS) {
            let _ = slots.push(IndicatorSlot {
                index,
                is_active: false,
            });
        }
        Self { slots, status_slot }
    }

    pub fn slots(&self) -> &[IndicatorSlot] {
        &self.slots
    }

    /// Currently active slots as a set.
    pub fn active(&self) -> EtaSet {
        self.slots.iter().filter(|s| s.is_active).map(|s| s.index).collect()
    }

    /// Bring the bank in line with `etas` and return the slots that were
    /// activated by this call.
    pub fn reconcile(
        &mut self,
        etas: &EtaSet,
        outcome: FetchOutcome,
        hw: &mut impl IndicatorPort,
    ) -> EtaSet {
        let mut activated = EtaSet::new();

        for slot in &mut self.slots {
            let wanted = etas.contains(slot.index);
            match (wanted, slot.is_active) {
                (true, false) => {
                    if slot.index == ARRIVING_SLOT {
                        hw.animate(slot.index, SLOW_PULSE, false);
                    } else {
                        hw.on(slot.index);
                    }
                    slot.is_active = true;
                    activated.insert(slot.index);
                    debug!("Display: slot {} on", slot.index);
                }
                (false, true) => {
                    hw.off(slot.index);
                    slot.is_active = false;
                    debug!("Display: slot {} off", slot.index);
                }
                _ => {}
            }
        }

        match outcome {
            FetchOutcome::Success if etas.is_empty() => {
                hw.animate(ARRIVING_SLOT, HEARTBEAT, false);
            }
            FetchOutcome::Failure => {
                hw.animate(self.status_slot, FAILURE_BLINK, false);
            }
            FetchOutcome::Success => {}
        }

        activated
    }

    /// Forget all commanded state (after the bank was driven externally,
    /// e.g. by the reset blink).
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.is_active = false;
        }
    }
}
