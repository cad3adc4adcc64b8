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

//! The fixed 100-byte TeraSort record.
//!
//! ```text
//!  0..10   key, the 10 most significant bytes of the random value
//! 10..12   0x00 0x11
//! 12..44   record index as 32 upper-case ASCII hex digits
//! 44..48   0x88 0x99 0xAA 0xBB
//! 48..96   hex digits 20..32 of the random value, each repeated 4 times
//! 96..100  0xCC 0xDD 0xEE 0xFF
//! ```

use crate::unsigned::Unsigned128;

/// Length of an encoded record in bytes.
pub const RECORD_LEN: usize = 100;
/// Length of the sort key at the start of a record.
pub const KEY_LEN: usize = 10;
/// Length of everything after the key.
pub const VALUE_LEN: usize = RECORD_LEN - KEY_LEN;

const ROW_ID_OFFSET: usize = 12;
const FILLER_OFFSET: usize = 48;
const FILLER_DIGITS: usize = 12;
const FIRST_FILLER_DIGIT: usize = 20;

/// Writes the record for `rand` and `index` into `buf`.
///
/// Every byte of `buf` is overwritten, so a single buffer can be reused for
/// consecutive records.
pub fn encode_record(buf: &mut [u8; RECORD_LEN], rand: Unsigned128, index: Unsigned128) {
    for (i, b) in buf[..KEY_LEN].iter_mut().enumerate() {
        *b = rand.byte(i);
    }

    buf[10] = 0x00;
    buf[11] = 0x11;

    for (i, b) in buf[ROW_ID_OFFSET..ROW_ID_OFFSET + 32].iter_mut().enumerate() {
        *b = index.hex_digit(i);
    }

    buf[44..48].copy_from_slice(&[0x88, 0x99, 0xAA, 0xBB]);

    for i in 0..FILLER_DIGITS {
        let digit = rand.hex_digit(FIRST_FILLER_DIGIT + i);
        let start = FILLER_OFFSET + i * 4;
        buf[start..start + 4].fill(digit);
    }

    buf[96..100].copy_from_slice(&[0xCC, 0xDD, 0xEE, 0xFF]);
}

/// An encoded record.
///
/// Records deliberately have no equality or ordering of their own; order
/// them by key through a [`crate::partitioner::KeyComparator`].
#[derive(Clone, Copy)]
pub struct Record([u8; RECORD_LEN]);

impl Record {
    /// Encodes the record for `rand` and `index`.
    pub fn new(rand: Unsigned128, index: Unsigned128) -> Self {
        let mut buf = [0u8; RECORD_LEN];
        encode_record(&mut buf, rand, index);
        Self(buf)
    }

    /// Wraps already encoded bytes.
    pub fn from_bytes(bytes: [u8; RECORD_LEN]) -> Self {
        Self(bytes)
    }

    /// The 10-byte sort key.
    pub fn key(&self) -> &[u8; KEY_LEN] {
        self.0[..KEY_LEN]
            .try_into()
            .unwrap_or_else(|_| unreachable!("record is {RECORD_LEN} bytes"))
    }

    /// Everything after the key.
    pub fn value(&self) -> &[u8] {
        &self.0[KEY_LEN..]
    }

    /// The whole record.
    pub fn as_bytes(&self) -> &[u8; RECORD_LEN] {
        &self.0
    }

    /// Parses the record index embedded in bytes 12..44.
    ///
    /// Returns `None` unless those bytes are 32 uppercase hex digits, the
    /// only form [`encode_record`] writes.
    pub fn index(&self) -> Option<Unsigned128> {
        self.0[ROW_ID_OFFSET..ROW_ID_OFFSET + 32]
            .iter()
            .try_fold(0u128, |acc, &b| {
                let digit = match b {
                    b'0'..=b'9' => b - b'0',
                    b'A'..=b'F' => b - b'A' + 10,
                    _ => return None,
                };
                Some((acc << 4) | u128::from(digit))
            })
            .map(Unsigned128::from_u128)
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("key", &format_args!("{:02x?}", self.key()))
            .field("index", &self.index())
            .finish()
    }
}
