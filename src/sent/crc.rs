//! # SENT CRC-4 Implementation
//!
//! Nibble-wise CRC-4 used by the TLE4998 fast channel.
//!
//! **Polynomial**: 0x0D (x^4 + x^3 + x^2 + 1)
//! **Seed**: 0x05
//!
//! Message bytes carry one nibble each. Only the low four bits of every byte
//! take part in the calculation; the upper bits are masked off before the
//! table lookup, so the result is always in 0-15.

use super::protocol::{CanonicalMessage, CRC_MESSAGE_LEN, NIBBLE_MAX, TLE4998_CRC_SEED};

/// SENT CRC-4 polynomial (x^4 implicit)
const CRC4_POLY: u8 = 0x0D;

/// Precomputed CRC-4 lookup table
pub const CRC4_TABLE: [u8; 16] = generate_crc4_table();

/// Generate CRC-4 lookup table at compile time
const fn generate_crc4_table() -> [u8; 16] {
    let mut table = [0u8; 16];
    let mut i = 0;

    while i < 16 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 4 {
            if (crc & 0x08) != 0 {
                crc = ((crc << 1) ^ CRC4_POLY) & NIBBLE_MAX;
            } else {
                crc = (crc << 1) & NIBBLE_MAX;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Seeded CRC-4 over a fixed number of nibbles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc4 {
    seed: u8,
    length: usize,
}

impl Default for Crc4 {
    fn default() -> Self {
        Self::tle4998()
    }
}

impl Crc4 {
    /// Create a CRC engine with a custom seed and message length
    ///
    /// # Arguments
    ///
    /// * `seed` - Initial accumulator (masked to 4 bits)
    /// * `length` - Number of message nibbles consumed (status + data)
    pub fn new(seed: u8, length: usize) -> Self {
        Self {
            seed: seed & NIBBLE_MAX,
            length,
        }
    }

    /// TLE4998 fast channel: seed 0x05, status + 6 data nibbles
    pub fn tle4998() -> Self {
        Self::new(TLE4998_CRC_SEED, CRC_MESSAGE_LEN)
    }

    pub fn seed(&self) -> u8 {
        self.seed
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Calculate the checksum over the first `length` nibbles of `message`
    ///
    /// Shorter messages are consumed completely.
    pub fn compute(&self, message: &[u8]) -> u8 {
        let mut crc = self.seed;

        for &nibble in message.iter().take(self.length) {
            crc = CRC4_TABLE[((crc ^ nibble) & NIBBLE_MAX) as usize];
        }

        crc
    }
}

/// Calculate the TLE4998 fast-channel CRC of a canonical message
///
/// # Examples
///
/// ```
/// use sent_redundancy::sent::crc::crc4_tle4998;
///
/// assert_eq!(crc4_tle4998(&[0, 1, 2, 3, 4, 5, 6]), 0x2);
/// ```
pub fn crc4_tle4998(message: &CanonicalMessage) -> u8 {
    Crc4::tle4998().compute(message)
}

/// Bit-by-bit CRC-4 (slow, for verification)
#[cfg(test)]
fn crc4_slow(seed: u8, message: &[u8]) -> u8 {
    let mut crc = seed & NIBBLE_MAX;

    for &nibble in message {
        crc ^= nibble & NIBBLE_MAX;

        for _ in 0..4 {
            if (crc & 0x08) != 0 {
                crc = ((crc << 1) ^ CRC4_POLY) & NIBBLE_MAX;
            } else {
                crc = (crc << 1) & NIBBLE_MAX;
            }
        }
    }

    crc
}
