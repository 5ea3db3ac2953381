//! Hardware adapter: bridges the board peripherals to the domain ports.
//!
//! - [`BoardInputs`] samples the encoder, its push switch and the touch
//!   pad for [`InputPort`].
//! - [`BoardSensors`] combines the MPU6050 accelerometer, the DHT11 and
//!   the sound ADC behind [`SensorPort`]. Each sensor is optional; one
//!   that failed to initialise just reports `None`.
//!
//! The MPU6050 driver is generic over an `embedded-hal` I2C bus so it
//! shares the bus with the OLED and runs against a mock in tests.

use log::{info, warn};

use crate::app::ports::{Acceleration, Climate, InputPort, RawInputs, SensorPort};
use crate::drivers::hw_init;
use crate::pins;
use crate::sensors::motion::{GRAVITY, calibration_offsets};

// ───────────────────────────────────────────────────────────────
// Inputs
// ───────────────────────────────────────────────────────────────

/// GPIO-backed [`InputPort`].
pub struct BoardInputs {
    touch_enabled: bool,
}

impl BoardInputs {
    pub fn new(touch_enabled: bool) -> Self {
        Self { touch_enabled }
    }
}

impl InputPort for BoardInputs {
    fn sample(&mut self) -> RawInputs {
        RawInputs {
            encoder_clk: hw_init::gpio_read(pins::ENCODER_CLK_GPIO),
            encoder_dt: hw_init::gpio_read(pins::ENCODER_DT_GPIO),
            // Switch to ground with pull-up.
            button_pressed: !hw_init::gpio_read(pins::ENCODER_SW_GPIO),
            touch_active: self.touch_enabled && hw_init::gpio_read(pins::TOUCH_GPIO),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// MPU6050
// ───────────────────────────────────────────────────────────────

const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_VALUE: u8 = 0x68;
/// LSB per g at the ±4 g range.
const ACCEL_LSB_PER_G: f32 = 8192.0;
const CALIBRATION_SAMPLES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuError {
    Bus,
    WrongDevice(u8),
}

pub struct Mpu6050<I2C> {
    i2c: I2C,
    address: u8,
    offsets: Acceleration,
}

impl<I2C> Mpu6050<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            offsets: Acceleration::default(),
        }
    }

    /// Check identity, wake the chip and select ±4 g.
    pub fn init(&mut self) -> Result<(), ImuError> {
        let mut who = [0u8; 1];
        self.i2c
            .write_read(self.address, &[REG_WHO_AM_I], &mut who)
            .map_err(|_| ImuError::Bus)?;
        if who[0] != WHO_AM_I_VALUE {
            return Err(ImuError::WrongDevice(who[0]));
        }
        self.i2c
            .write(self.address, &[REG_PWR_MGMT_1, 0x00])
            .map_err(|_| ImuError::Bus)?;
        self.i2c
            .write(self.address, &[REG_ACCEL_CONFIG, 0x08])
            .map_err(|_| ImuError::Bus)?;
        info!("IMU: MPU6050 ready at 0x{:02X}", self.address);
        Ok(())
    }

    /// Average resting samples into offsets. The board must lie flat.
    pub fn calibrate(&mut self) -> Result<Acceleration, ImuError> {
        let mut samples = [Acceleration::default(); CALIBRATION_SAMPLES];
        for slot in &mut samples {
            *slot = self.read_raw()?;
        }
        self.offsets = calibration_offsets(&samples);
        info!(
            "IMU: offsets x={:.2} y={:.2} z={:.2}",
            self.offsets.x, self.offsets.y, self.offsets.z
        );
        Ok(self.offsets)
    }

    pub fn read(&mut self) -> Result<Acceleration, ImuError> {
        let raw = self.read_raw()?;
        Ok(Acceleration {
            x: raw.x - self.offsets.x,
            y: raw.y - self.offsets.y,
            z: raw.z - self.offsets.z,
        })
    }

    fn read_raw(&mut self) -> Result<Acceleration, ImuError> {
        let mut buf = [0u8; 6];
        self.i2c
            .write_read(self.address, &[REG_ACCEL_XOUT_H], &mut buf)
            .map_err(|_| ImuError::Bus)?;
        let axis = |hi: u8, lo: u8| f32::from(i16::from_be_bytes([hi, lo])) / ACCEL_LSB_PER_G * GRAVITY;
        Ok(Acceleration {
            x: axis(buf[0], buf[1]),
            y: axis(buf[2], buf[3]),
            z: axis(buf[4], buf[5]),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// DHT11
// ───────────────────────────────────────────────────────────────

/// Validate the checksum of a 40-bit DHT11 frame and decode it.
pub fn decode_dht11(frame: [u8; 5]) -> Option<Climate> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return None;
    }
    let humidity = f32::from(frame[0]) + f32::from(frame[1]) / 10.0;
    let temp_mag = f32::from(frame[2]) + f32::from(frame[3] & 0x7F) / 10.0;
    let temperature = if frame[3] & 0x80 != 0 { -temp_mag } else { temp_mag };
    if humidity > 100.0 {
        return None;
    }
    Some(Climate {
        temperature_c: temperature,
        humidity_pct: humidity,
    })
}

/// Bit-banged single-wire read. Blocks for about 25 ms.
#[cfg(target_os = "espidf")]
fn read_dht11_frame(pin: i32) -> Option<[u8; 5]> {
    use esp_idf_svc::sys::{esp_rom_delay_us, esp_timer_get_time, gpio_get_level, gpio_set_level};

    let now_us = || unsafe { esp_timer_get_time() };
    // Busy-wait until the line leaves `level`; returns the time spent.
    let wait_while = |level: i32, timeout_us: i64| -> Option<i64> {
        let start = now_us();
        while unsafe { gpio_get_level(pin) } == level {
            if now_us() - start > timeout_us {
                return None;
            }
        }
        Some(now_us() - start)
    };

    // SAFETY: the pin is configured open drain in hw_init; only the main
    // loop drives it.
    unsafe {
        gpio_set_level(pin, 0);
        esp_rom_delay_us(20_000);
        gpio_set_level(pin, 1);
        esp_rom_delay_us(30);
    }

    // Sensor answers low 80 µs, high 80 µs.
    wait_while(1, 100)?;
    wait_while(0, 100)?;
    wait_while(1, 100)?;

    let mut frame = [0u8; 5];
    for bit in 0..40 {
        wait_while(0, 80)?;
        let high = wait_while(1, 100)?;
        if high > 40 {
            frame[bit / 8] |= 1 << (7 - bit % 8);
        }
    }
    Some(frame)
}

#[cfg(not(target_os = "espidf"))]
fn read_dht11_frame(_pin: i32) -> Option<[u8; 5]> {
    None
}

// ───────────────────────────────────────────────────────────────
// SensorPort
// ───────────────────────────────────────────────────────────────

/// All optional sensors behind one [`SensorPort`].
pub struct BoardSensors<I2C> {
    imu: Option<Mpu6050<I2C>>,
    climate_enabled: bool,
    sound_enabled: bool,
    imu_errors: u32,
}

impl<I2C> BoardSensors<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// `imu` is `None` when the accelerometer failed to initialise.
    pub fn new(imu: Option<Mpu6050<I2C>>, climate_enabled: bool, sound_enabled: bool) -> Self {
        if imu.is_none() {
            warn!("SENSORS: no accelerometer, motion disabled");
        }
        Self {
            imu,
            climate_enabled,
            sound_enabled,
            imu_errors: 0,
        }
    }

    pub fn has_imu(&self) -> bool {
        self.imu.is_some()
    }
}

impl<I2C> SensorPort for BoardSensors<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    fn read_acceleration(&mut self) -> Option<Acceleration> {
        let imu = self.imu.as_mut()?;
        match imu.read() {
            Ok(a) => Some(a),
            Err(e) => {
                self.imu_errors = self.imu_errors.wrapping_add(1);
                if self.imu_errors.is_power_of_two() {
                    warn!("SENSORS: accelerometer read failed ({:?}, {} total)", e, self.imu_errors);
                }
                None
            }
        }
    }

    fn read_climate(&mut self) -> Option<Climate> {
        if !self.climate_enabled {
            return None;
        }
        read_dht11_frame(pins::DHT11_GPIO).and_then(decode_dht11)
    }

    fn read_sound(&mut self) -> Option<u16> {
        if !self.sound_enabled {
            return None;
        }
        hw_init::adc1_read(pins::ADC1_CH_SOUND)
    }
}
