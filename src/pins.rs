//! GPIO / peripheral pin assignments for the tracker board.
//!
//! Single source of truth for the default wiring.  `TrackerConfig`
//! copies these at startup; nothing else hard-codes a pin number.

// ---------------------------------------------------------------------------
// Indicator bank (one LED per ETA minute, slot 0 = arriving now)
// ---------------------------------------------------------------------------

/// Indicator LEDs in slot order.  Slot `i` lights when a train is `i`
/// minutes out.
pub const INDICATOR_GPIOS: [i32; 10] = [4, 5, 6, 7, 15, 16, 17, 18, 8, 9];

/// The first `PWM_INDICATOR_SLOTS` slots sit on LEDC channels and can fade;
/// the rest are plain push-pull outputs.
pub const PWM_INDICATOR_SLOTS: usize = 6;

// ---------------------------------------------------------------------------
// Speaker (passive piezo, square wave from LEDC)
// ---------------------------------------------------------------------------

pub const SPEAKER_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// User button (active-low with internal pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button: short press arms/disarms the alert, long press
/// resets the device.
pub const BUTTON_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC frequency for the indicator LEDs (1 kHz).
pub const LED_PWM_FREQ_HZ: u32 = 1_000;
/// LEDC channel driving the speaker (highest channel on the S3).
pub const SPEAKER_LEDC_CHANNEL: u32 = 7;
