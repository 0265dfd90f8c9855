//! One-shot hardware peripheral initialization.
//!
//! Configures the thermocouple ADC channel, the status LED GPIO, and the
//! heater LEDC timer/channel using raw ESP-IDF sys calls. Called once from
//! `main()` before the dispatch loop starts.
//!
//! Host builds replace every register access with atomics so tests and the
//! simulator can inject ADC counts and inspect the outputs.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, Ordering};

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc)    => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc)   => write!(f, "LEDC timer/channel config failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

/// LEDC channel driving the heater MOSFET.
pub const LEDC_CH_HEATER: u32 = 0;

#[cfg(target_os = "espidf")]
pub fn init_peripherals(adc_channel: u8) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the dispatch loop; single-threaded.
    unsafe {
        init_adc(adc_channel)?;
        init_gpio_outputs()?;
        init_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(_adc_channel: u8) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// dispatch-loop ADC read path.  `init_adc()` completes before the loop
/// starts, so there is no concurrent access.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc(channel: u8) -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    // The amplifier is calibrated against 10-bit counts.
    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_10,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), u32::from(channel), &chan_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    info!("hw_init: ADC1 CH{} configured (thermocouple amplifier)", channel);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u8) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, single-threaded dispatch-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), u32::from(channel), &mut raw) };
    if ret != ESP_OK as i32 {
        // Full scale reads as a disconnected probe and keeps the heater off.
        return u16::MAX;
    }
    raw.max(0) as u16
}

#[cfg(not(target_os = "espidf"))]
static SIM_ADC_RAW: AtomicU16 = AtomicU16::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u8) -> u16 {
    SIM_ADC_RAW.load(Ordering::Relaxed)
}

/// Inject the raw count returned by the next ADC reads.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc_raw(raw: u16) {
    SIM_ADC_RAW.store(raw, Ordering::Relaxed);
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::STATUS_LED_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    unsafe { gpio_set_level(pins::STATUS_LED_GPIO, 0) };

    info!("hw_init: status LED GPIO{} configured", pins::STATUS_LED_GPIO);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs(). Dispatch loop only.
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

#[cfg(not(target_os = "espidf"))]
static SIM_LED_LEVEL: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, high: bool) {
    SIM_LED_LEVEL.store(high, Ordering::Relaxed);
}

/// Last level written to the status LED.
#[cfg(not(target_os = "espidf"))]
pub fn sim_led_level() -> bool {
    SIM_LED_LEVEL.load(Ordering::Relaxed)
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const HEATER_LEDC_TIMER: ledc_timer_t = ledc_timer_t_LEDC_TIMER_0;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Heater: 8-bit, starts at the slowest period with the output low.
    // SAFETY: Called from single main-task context via init_peripherals().
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: HEATER_LEDC_TIMER,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::HEATER_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

    let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: LEDC_CH_HEATER,
        timer_sel: HEATER_LEDC_TIMER,
        gpio_num: pins::HEATER_PWM_GPIO,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    }) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

    info!("hw_init: LEDC configured (heater=CH{})", LEDC_CH_HEATER);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: LEDC channels were configured in init_ledc(); duty register
    // writes are race-free since only the dispatch loop calls this function.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty));
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(target_os = "espidf")]
pub fn ledc_set_frequency(hz: u32) {
    // SAFETY: timer configured in init_ledc(); dispatch loop only.
    let ret = unsafe {
        ledc_set_freq(ledc_mode_t_LEDC_LOW_SPEED_MODE, HEATER_LEDC_TIMER, hz)
    };
    if ret != ESP_OK as i32 {
        log::warn!("hw_init: LEDC frequency {} Hz rejected (rc={})", hz, ret);
    }
}

#[cfg(not(target_os = "espidf"))]
static SIM_LEDC_DUTY: AtomicU8 = AtomicU8::new(0);
#[cfg(not(target_os = "espidf"))]
static SIM_LEDC_FREQ: AtomicU32 = AtomicU32::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, duty: u8) {
    SIM_LEDC_DUTY.store(duty, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set_frequency(hz: u32) {
    SIM_LEDC_FREQ.store(hz, Ordering::Relaxed);
}

/// Last 8-bit duty written to the heater channel.
#[cfg(not(target_os = "espidf"))]
pub fn sim_ledc_duty() -> u8 {
    SIM_LEDC_DUTY.load(Ordering::Relaxed)
}

/// Last frequency written to the heater timer.
#[cfg(not(target_os = "espidf"))]
pub fn sim_ledc_frequency() -> u32 {
    SIM_LEDC_FREQ.load(Ordering::Relaxed)
}
