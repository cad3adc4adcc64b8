// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Fixed width 128-bit unsigned integer used as generator state and row id.
//!
//! All arithmetic wraps modulo 2^128, which is exactly what the linear
//! congruential recurrence in [`crate::random`] requires.

use std::fmt::{self, Display, Formatter};
use std::ops::{Add, AddAssign, Mul, MulAssign, Shl, Shr};
use std::str::FromStr;

use crate::error::TeraSortError;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A 128-bit unsigned value stored as a high and a low 64-bit half.
///
/// Ordering is unsigned: `high` is compared first, then `low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Unsigned128 {
    high: u64,
    low: u64,
}

impl Unsigned128 {
    /// Zero
    pub const ZERO: Unsigned128 = Unsigned128::new(0, 0);
    /// One
    pub const ONE: Unsigned128 = Unsigned128::new(0, 1);

    /// Creates a value from its high and low 64-bit halves.
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// Creates a value from a native `u128`.
    pub const fn from_u128(value: u128) -> Self {
        Self {
            high: (value >> 64) as u64,
            low: value as u64,
        }
    }

    /// Returns the value as a native `u128`.
    pub const fn as_u128(self) -> u128 {
        ((self.high as u128) << 64) | self.low as u128
    }

    /// The most significant 64 bits.
    pub const fn high8(self) -> u64 {
        self.high
    }

    /// The least significant 64 bits.
    pub const fn low8(self) -> u64 {
        self.low
    }

    /// Multiplies by a 64-bit scalar, discarding bits above 128.
    pub const fn mul_u64(self, scalar: u64) -> Self {
        Self::from_u128(self.as_u128().wrapping_mul(scalar as u128))
    }

    /// Byte `i` of the value, 0 being the most significant.
    ///
    /// # Panics
    ///
    /// Panics if `i >= 16`.
    pub fn byte(self, i: usize) -> u8 {
        assert!(i < 16, "byte index {i} out of range for a 128-bit value");
        (self.as_u128() >> (120 - 8 * i)) as u8
    }

    /// The upper-case ASCII hex digit for nibble `i`, 0 being the most
    /// significant.
    ///
    /// # Panics
    ///
    /// Panics if `i >= 32`.
    pub fn hex_digit(self, i: usize) -> u8 {
        assert!(i < 32, "hex digit index {i} out of range for a 128-bit value");
        let nibble = (self.as_u128() >> (124 - 4 * i)) & 0xF;
        HEX_DIGITS[nibble as usize]
    }
}

impl From<u128> for Unsigned128 {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl From<u64> for Unsigned128 {
    fn from(value: u64) -> Self {
        Self::new(0, value)
    }
}

impl From<Unsigned128> for u128 {
    fn from(value: Unsigned128) -> Self {
        value.as_u128()
    }
}

impl Add for Unsigned128 {
    type Output = Unsigned128;

    fn add(self, rhs: Self) -> Self::Output {
        Self::from_u128(self.as_u128().wrapping_add(rhs.as_u128()))
    }
}

impl AddAssign for Unsigned128 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul for Unsigned128 {
    type Output = Unsigned128;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::from_u128(self.as_u128().wrapping_mul(rhs.as_u128()))
    }
}

impl MulAssign for Unsigned128 {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Shl<u32> for Unsigned128 {
    type Output = Unsigned128;

    fn shl(self, bits: u32) -> Self::Output {
        Self::from_u128(self.as_u128().checked_shl(bits).unwrap_or(0))
    }
}

impl Shr<u32> for Unsigned128 {
    type Output = Unsigned128;

    fn shr(self, bits: u32) -> Self::Output {
        Self::from_u128(self.as_u128().checked_shr(bits).unwrap_or(0))
    }
}

impl Display for Unsigned128 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.high, self.low)
    }
}

impl FromStr for Unsigned128 {
    type Err = TeraSortError;

    /// Parses up to 32 hex digits, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() || digits.len() > 32 {
            return Err(TeraSortError::General(format!(
                "'{s}' is not a 128-bit hex value"
            )));
        }
        u128::from_str_radix(digits, 16)
            .map(Self::from_u128)
            .map_err(|e| {
                TeraSortError::General(format!("'{s}' is not a 128-bit hex value: {e}"))
            })
    }
}
