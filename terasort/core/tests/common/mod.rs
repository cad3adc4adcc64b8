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

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use terasort_core::record::{RECORD_LEN, Record};

/// Records 0, 1 and 2 of the dataset, hex encoded.
pub const GOLDEN_RECORDS: [&str; 3] = [
    "4a696d47726179524950001130303030303030303030303030303030303030303030303030303030303030308899aabb323232323030303032323232303030303232323230303030323232323030303032323232303030303232323231313131ccddeeff",
    "01fe85265b7fa2867503001130303030303030303030303030303030303030303030303030303030303030318899aabb383838383131313131313131393939394343434330303030464646463434343437373737464646463030303036363636ccddeeff",
    "a9519f73c1e78f3bfaf4001130303030303030303030303030303030303030303030303030303030303030328899aabb323232323131313138383838454545453030303036363636444444444545454532323232303030304242424246464646ccddeeff",
];

/// Decodes a hex encoded record.
pub fn decode_hex_record(hex: &str) -> [u8; RECORD_LEN] {
    assert_eq!(hex.len(), RECORD_LEN * 2, "bad fixture length");
    let mut out = [0u8; RECORD_LEN];
    for (i, b) in out.iter_mut().enumerate() {
        *b = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).expect("bad fixture hex");
    }
    out
}

/// Byte-wise equality of two record sequences.
pub fn assert_same_records(actual: &[Record], expected: &[Record]) {
    assert_eq!(actual.len(), expected.len(), "record counts differ");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(a.as_bytes(), e.as_bytes(), "record {i} differs");
    }
}
