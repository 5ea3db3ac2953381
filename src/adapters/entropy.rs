//! Random numbers for the idle behaviours.
//!
//! On the device [`EspEntropy`] reads the hardware RNG (`esp_random`,
//! true random once the radio is up). Elsewhere it falls back to a
//! clock-seeded [`XorShift32`], which tests seed explicitly for
//! reproducible blink timing.

use crate::app::ports::EntropyPort;

/// Marsaglia xorshift32. Never yields zero state.
#[derive(Debug, Clone)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

impl EntropyPort for XorShift32 {
    fn random_range(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        low + self.next_u32() % (high - low)
    }
}

/// Hardware RNG on the device, seeded xorshift in simulation.
pub struct EspEntropy {
    #[cfg(not(target_os = "espidf"))]
    fallback: XorShift32,
}

impl EspEntropy {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            fallback: XorShift32::new(
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.subsec_nanos())
                    .unwrap_or(1),
            ),
        }
    }
}

impl Default for EspEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyPort for EspEntropy {
    #[cfg(target_os = "espidf")]
    fn random_range(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        // SAFETY: esp_random has no preconditions.
        low + unsafe { esp_idf_svc::sys::esp_random() } % (high - low)
    }

    #[cfg(not(target_os = "espidf"))]
    fn random_range(&mut self, low: u32, high: u32) -> u32 {
        self.fallback.random_range(low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_range_returns_low() {
        let mut r = XorShift32::new(7);
        assert_eq!(r.random_range(5, 5), 5);
        assert_eq!(r.random_range(9, 3), 9);
    }

    #[test]
    fn zero_seed_is_replaced() {
        let mut r = XorShift32::new(0);
        assert_ne!(r.next_u32(), 0);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = XorShift32::new(42);
        let mut b = XorShift32::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    proptest! {
        #[test]
        fn stays_in_range(seed in any::<u32>(), low in 0u32..10_000, span in 1u32..50_000) {
            let mut r = XorShift32::new(seed);
            for _ in 0..8 {
                let v = r.random_range(low, low + span);
                prop_assert!(v >= low && v < low + span);
            }
        }
    }
}
