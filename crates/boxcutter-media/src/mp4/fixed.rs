//! Fixed-point numbers used by header boxes.
//!
//! Values keep their raw representation; the integer and fractional parts
//! are both exposed so nothing is lost to truncation.

use std::fmt;

/// Unsigned 16.16 fixed-point value (track width/height, movie rate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Fixed16_16(pub u32);

impl Fixed16_16 {
    /// The value 1.0.
    pub const ONE: Self = Self(0x0001_0000);

    /// Integer part.
    pub fn integer(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Fractional part, in units of 1/65536.
    pub fn fraction(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Value as `numerator / 65536`.
    pub fn as_ratio(&self) -> (u32, u32) {
        (self.0, 1 << 16)
    }

    /// Exact value as a float (every 16.16 value is representable in f64).
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / 65536.0
    }
}

impl fmt::Display for Fixed16_16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

/// Signed 8.8 fixed-point value (volume, balance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Fixed8_8(pub i16);

impl Fixed8_8 {
    /// The value 1.0.
    pub const ONE: Self = Self(0x0100);

    /// Integer part, rounded towards negative infinity.
    pub fn integer(&self) -> i8 {
        (self.0 >> 8) as i8
    }

    /// Fractional part, in units of 1/256.
    pub fn fraction(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Value as `numerator / 256`.
    pub fn as_ratio(&self) -> (i16, u16) {
        (self.0, 1 << 8)
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / 256.0
    }
}

impl fmt::Display for Fixed8_8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}
