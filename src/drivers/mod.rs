//! Output drivers, button input, hardware initialisation, and timing helpers.

pub mod button;
pub mod hw_init;
pub mod hw_timer;
pub mod indicator;
pub mod led_patterns;
pub mod speaker;
pub mod watchdog;
