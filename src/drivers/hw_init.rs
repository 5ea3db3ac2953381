//! One-shot hardware peripheral initialization.
//!
//! Configures the input GPIOs (encoder, push switch, touch pad), the DHT11
//! data line and the ADC1 channel for the sound sensor using raw ESP-IDF
//! sys calls. Called once from `main()` before the event loop starts.
//!
//! The I2C bus is not set up here; `main` builds it with esp-idf-hal and
//! hands it to the OLED and accelerometer drivers.
//!
//! Off target, levels and ADC readings come from atomics that tests set
//! with [`sim_set_level`] and [`sim_set_adc`].

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before the event loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_adc()?;
    }
    info!("HW: peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("HW(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn configure_input(pin: i32, pull_up: bool) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // KY-040 has its own pull-ups on CLK/DT but not on the switch.
    for pin in [pins::ENCODER_CLK_GPIO, pins::ENCODER_DT_GPIO, pins::ENCODER_SW_GPIO] {
        unsafe { configure_input(pin, true)? };
    }
    // TTP223 drives its output push-pull.
    unsafe { configure_input(pins::TOUCH_GPIO, false)? };

    // DHT11 data: open drain with pull-up, idle high.
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::DHT11_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    unsafe { gpio_set_level(pins::DHT11_GPIO, 1) };

    info!("HW: GPIO inputs configured");
    Ok(())
}

/// Raw level of an input pin (`true` = high).
#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: reading a configured input has no side effects.
    unsafe { gpio_get_level(pin) != 0 }
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: only valid after `init_adc()`, from the main loop. No other
/// task reads the ADC.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::ADC1_CH_SOUND, &chan_cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("HW: ADC1 configured (CH{}=sound)", pins::ADC1_CH_SOUND);
    Ok(())
}

/// One 12-bit conversion, `None` on driver error.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Option<u16> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    (ret == ESP_OK).then(|| raw.max(0) as u16)
}

// ── Simulation ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

    /// One bit per GPIO (the C3 has 22).
    static LEVELS: AtomicU32 = AtomicU32::new(0);
    static ADC: AtomicU16 = AtomicU16::new(0);

    pub fn set_level(pin: i32, high: bool) {
        let mask = 1u32 << pin;
        if high {
            LEVELS.fetch_or(mask, Ordering::Relaxed);
        } else {
            LEVELS.fetch_and(!mask, Ordering::Relaxed);
        }
    }

    pub fn level(pin: i32) -> bool {
        LEVELS.load(Ordering::Relaxed) & (1u32 << pin) != 0
    }

    pub fn set_adc(raw: u16) {
        ADC.store(raw, Ordering::Relaxed);
    }

    pub fn adc() -> u16 {
        ADC.load(Ordering::Relaxed)
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_level(pin: i32, high: bool) {
    sim::set_level(pin, high);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(raw: u16) {
    sim::set_adc(raw);
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    sim::level(pin)
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Option<u16> {
    Some(sim::adc())
}
