//! GPIO / peripheral pin assignments for the Coompel board (ESP32-C3).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// I2C bus (SH1106 OLED + MPU6050)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 6;
pub const I2C_SCL_GPIO: i32 = 7;
pub const I2C_FREQ_HZ: u32 = 400_000;

/// SH1106 7-bit address (0x3D on some modules).
pub const OLED_I2C_ADDR: u8 = 0x3C;
/// MPU6050 7-bit address (AD0 low).
pub const MPU6050_I2C_ADDR: u8 = 0x68;

// ---------------------------------------------------------------------------
// Rotary encoder (KY-040): CLK/DT quadrature + push switch
// ---------------------------------------------------------------------------

pub const ENCODER_CLK_GPIO: i32 = 2;
pub const ENCODER_DT_GPIO: i32 = 3;
/// Encoder push switch, active-low with internal pull-up.
pub const ENCODER_SW_GPIO: i32 = 10;

// ---------------------------------------------------------------------------
// Capacitive touch pad (TTP223): active-high digital output
// ---------------------------------------------------------------------------

pub const TOUCH_GPIO: i32 = 1;

// ---------------------------------------------------------------------------
// Environment sensors
// ---------------------------------------------------------------------------

/// DHT11 single-wire data line.
pub const DHT11_GPIO: i32 = 4;
/// HW-484 sound sensor analog output (ADC1 channel 0 on GPIO0).
pub const SOUND_ADC_GPIO: i32 = 0;
pub const ADC1_CH_SOUND: u32 = 0;
