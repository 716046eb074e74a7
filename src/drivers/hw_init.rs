//! One-shot hardware peripheral initialization.
//!
//! Configures LEDC timers/channels for the indicator bank and speaker, the
//! plain GPIO outputs for indicators beyond the PWM channels, and the
//! button input, using raw ESP-IDF sys calls.  Called once from `main()`
//! before the control loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

// ── Channel map ───────────────────────────────────────────────

/// LEDC timer shared by the PWM indicator channels.
pub const LEDC_TIMER_INDICATORS: u32 = 0;
/// LEDC timer retuned per note for the speaker.
pub const LEDC_TIMER_SPEAKER: u32 = 1;

/// LEDC channel for an indicator slot, if that slot can fade.
pub fn pwm_channel_for(slot: usize) -> Option<u32> {
    (slot < pins::PWM_INDICATOR_SLOTS).then_some(slot as u32)
}

// ── Init ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals(
    indicator_pins: &[i32],
    speaker_pin: i32,
    button_pin: i32,
) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_indicators(indicator_pins)?;
        init_speaker(speaker_pin)?;
        init_button(button_pin)?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(
    indicator_pins: &[i32],
    _speaker_pin: i32,
    _button_pin: i32,
) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped ({} indicators)", indicator_pins.len());
    Ok(())
}

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t, err: fn(i32) -> HwInitError) -> Result<(), HwInitError> {
    if ret == ESP_OK { Ok(()) } else { Err(err(ret)) }
}

#[cfg(target_os = "espidf")]
unsafe fn init_indicators(indicator_pins: &[i32]) -> Result<(), HwInitError> {
    // Timer 0: indicator LEDs (1 kHz, 8-bit)
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: LEDC_TIMER_INDICATORS,
        duty_resolution: pins::PWM_RESOLUTION_BITS,
        freq_hz: pins::LED_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    check(unsafe { ledc_timer_config(&timer) }, HwInitError::LedcInitFailed)?;

    for (slot, &gpio) in indicator_pins.iter().enumerate() {
        if let Some(channel) = pwm_channel_for(slot) {
            let cfg = ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel,
                timer_sel: LEDC_TIMER_INDICATORS,
                gpio_num: gpio,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            };
            check(unsafe { ledc_channel_config(&cfg) }, HwInitError::LedcInitFailed)?;
        } else {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << gpio,
                mode: gpio_mode_t_GPIO_MODE_OUTPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
            };
            check(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)?;
            unsafe { gpio_set_level(gpio, 0) };
        }
    }

    info!(
        "hw_init: {} indicators ({} on LEDC)",
        indicator_pins.len(),
        indicator_pins.len().min(pins::PWM_INDICATOR_SLOTS)
    );
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_speaker(speaker_pin: i32) -> Result<(), HwInitError> {
    // Timer 1: speaker square wave; frequency is retuned per note.
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: LEDC_TIMER_SPEAKER,
        duty_resolution: pins::PWM_RESOLUTION_BITS,
        freq_hz: 1_000,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    check(unsafe { ledc_timer_config(&timer) }, HwInitError::LedcInitFailed)?;

    let cfg = ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: pins::SPEAKER_LEDC_CHANNEL,
        timer_sel: LEDC_TIMER_SPEAKER,
        gpio_num: speaker_pin,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    };
    check(unsafe { ledc_channel_config(&cfg) }, HwInitError::LedcInitFailed)?;

    info!("hw_init: speaker on GPIO{} (LEDC CH{})", speaker_pin, pins::SPEAKER_LEDC_CHANNEL);
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_button(button_pin: i32) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << button_pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    check(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)?;
    info!("hw_init: button on GPIO{} (pull-up, any edge)", button_pin);
    Ok(())
}

// ── Output helpers ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an output pin configured in
    // init_indicators().
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: LEDC channels were configured in init_peripherals(); each
    // channel has a single writer (render or audio thread).
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty));
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) {}

/// Drive the speaker at `freq_hz` (50% duty), or silence it for 0.
#[cfg(target_os = "espidf")]
pub fn speaker_tone(freq_hz: u16) {
    if freq_hz == 0 {
        ledc_set(pins::SPEAKER_LEDC_CHANNEL, 0);
        return;
    }
    // SAFETY: timer 1 is owned by the audio thread after init.
    let ret = unsafe {
        ledc_set_freq(
            ledc_mode_t_LEDC_LOW_SPEED_MODE,
            LEDC_TIMER_SPEAKER,
            u32::from(freq_hz),
        )
    };
    if ret != ESP_OK {
        log::warn!("speaker: cannot set {} Hz (rc={})", freq_hz, ret);
        return;
    }
    ledc_set(pins::SPEAKER_LEDC_CHANNEL, 128);
}

#[cfg(not(target_os = "espidf"))]
pub fn speaker_tone(_freq_hz: u16) {}

// ── GPIO ISR Service ──────────────────────────────────────────

/// Install the per-pin GPIO ISR service and register the button handler.
/// Call after init_peripherals() and before the control loop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service(button_pin: i32) -> Result<(), HwInitError> {
    use crate::drivers::button::button_gpio_isr;

    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).  The registered handler
    // only reads the pin and pushes to the lock-free edge queue.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        gpio_set_intr_type(button_pin, gpio_int_type_t_GPIO_INTR_ANYEDGE);
        let ret = gpio_isr_handler_add(
            button_pin,
            Some(button_gpio_isr),
            button_pin as usize as *mut core::ffi::c_void,
        );
        if ret != ESP_OK {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_intr_enable(button_pin);
    }
    info!("hw_init: ISR service installed (button)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service(_button_pin: i32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
