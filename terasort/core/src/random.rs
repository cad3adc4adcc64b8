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

//! Skip-ahead linear congruential generator over 128-bit state.
//!
//! The recurrence is `x' = A * x + C (mod 2^128)`. Advancing by `k` steps is
//! itself an affine map `x -> A_k * x + C_k`, so the state for any record can
//! be reached by composing the precomputed power-of-two steps that make up
//! `k`, one composition per set bit.

use std::sync::LazyLock;

use crate::unsigned::Unsigned128;

/// Multiplier of the recurrence. Odd, which gives the full 2^128 period.
pub const MULTIPLIER: Unsigned128 =
    Unsigned128::new(0x2360_ED05_1FC6_5DA4, 0x4385_DF64_9FCC_F645);

/// Increment of the recurrence.
pub const INCREMENT: Unsigned128 =
    Unsigned128::new(0x4A69_6D47_7261_7952, 0x4950_2020_2020_2021);

/// The generator state at step 0, shared by every partition.
pub const GLOBAL_SEED: Unsigned128 = Unsigned128::ZERO;

/// An affine map `x -> multiplier * x + increment (mod 2^128)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffineStep {
    /// Coefficient applied to the state.
    pub multiplier: Unsigned128,
    /// Constant added after multiplication.
    pub increment: Unsigned128,
}

impl AffineStep {
    /// A single step of the generator.
    pub const ONE_STEP: AffineStep = AffineStep {
        multiplier: MULTIPLIER,
        increment: INCREMENT,
    };

    /// The identity map, i.e. zero steps.
    pub const IDENTITY: AffineStep = AffineStep {
        multiplier: Unsigned128::ONE,
        increment: Unsigned128::ZERO,
    };

    /// Applies the map to `x`.
    pub fn apply(&self, x: Unsigned128) -> Unsigned128 {
        self.multiplier * x + self.increment
    }

    /// The map that applies `self` first and then `next`.
    pub fn then(&self, next: &AffineStep) -> AffineStep {
        AffineStep {
            multiplier: next.multiplier * self.multiplier,
            increment: next.multiplier * self.increment + next.increment,
        }
    }

    /// The map applied twice: `(A^2, A*C + C)`.
    pub fn double(&self) -> AffineStep {
        self.then(self)
    }
}

/// `STEP_TABLE[i]` advances the generator by `2^i` steps.
static STEP_TABLE: LazyLock<[AffineStep; 128]> = LazyLock::new(|| {
    let mut table = [AffineStep::IDENTITY; 128];
    let mut step = AffineStep::ONE_STEP;
    for entry in table.iter_mut() {
        *entry = step;
        step = step.double();
    }
    table
});

/// The affine map that advances the generator by `advance` steps.
pub fn step_for(advance: Unsigned128) -> AffineStep {
    let mut result = AffineStep::IDENTITY;
    let mut bits = advance.as_u128();
    while bits != 0 {
        let i = bits.trailing_zeros() as usize;
        result = result.then(&STEP_TABLE[i]);
        bits &= bits - 1;
    }
    result
}

/// The generator state after `advance` steps from [`GLOBAL_SEED`].
pub fn skip_ahead(advance: Unsigned128) -> Unsigned128 {
    step_for(advance).apply(GLOBAL_SEED)
}

/// A generator that owns its state and starts wherever it was seeded.
///
/// Each partition creates its own, so no state is ever shared between
/// workers.
#[derive(Debug, Clone)]
pub struct SkipAheadRng {
    state: Unsigned128,
}

impl SkipAheadRng {
    /// Positions a generator exactly `record_index` steps after the global
    /// seed, in O(log record_index) multiplications.
    pub fn seed_to(record_index: u64) -> Self {
        Self {
            state: skip_ahead(Unsigned128::from(record_index)),
        }
    }

    /// Starts a generator at an arbitrary state.
    pub fn from_state(state: Unsigned128) -> Self {
        Self { state }
    }

    /// The current state.
    pub fn state(&self) -> Unsigned128 {
        self.state
    }

    /// Advances one step and returns the new state.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Unsigned128 {
        self.state = AffineStep::ONE_STEP.apply(self.state);
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(steps: u64) -> Unsigned128 {
        let mut rng = SkipAheadRng::from_state(GLOBAL_SEED);
        for _ in 0..steps {
            rng.next();
        }
        rng.state()
    }

    #[test]
    fn skip_ahead_matches_sequential_replay() {
        for steps in [0u64, 1, 2, 3, 1000, 1 << 20] {
            assert_eq!(
                SkipAheadRng::seed_to(steps).state(),
                replay(steps),
                "mismatch after {steps} steps"
            );
        }
    }

    #[test]
    fn first_steps_match_known_states() {
        assert_eq!(SkipAheadRng::seed_to(0).state(), Unsigned128::ZERO);
        assert_eq!(SkipAheadRng::seed_to(1).state(), INCREMENT);
        assert_eq!(
            SkipAheadRng::seed_to(2).state(),
            "01fe85265b7fa28675038119c0f47f06".parse().unwrap()
        );
        assert_eq!(
            SkipAheadRng::seed_to(1000).state(),
            "90db8a8410f3b34844029abe082ac798".parse().unwrap()
        );
        assert_eq!(
            SkipAheadRng::seed_to(1 << 20).state(),
            "79eef43a61880ba82d81fcad95f00000".parse().unwrap()
        );
    }

    #[test]
    fn step_table_doubles() {
        assert_eq!(STEP_TABLE[0], AffineStep::ONE_STEP);
        assert_eq!(
            STEP_TABLE[1].multiplier,
            "17bce35bdf69743c529ed9eb20e0ae99".parse().unwrap()
        );
        for i in 1..128 {
            assert_eq!(STEP_TABLE[i], STEP_TABLE[i - 1].double());
        }
    }

    #[test]
    fn seeding_is_pure() {
        let a = SkipAheadRng::seed_to(123_456_789);
        let b = SkipAheadRng::seed_to(123_456_789);
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn composition_is_additive() {
        let a = step_for(Unsigned128::from(12_345u64));
        let b = step_for(Unsigned128::from(67_890u64));
        assert_eq!(a.then(&b), step_for(Unsigned128::from(12_345u64 + 67_890)));
    }

    #[test]
    fn full_cycle_returns_to_seed() {
        // 2^128 steps is the full period, represented as wrap to zero;
        // 2^127 twice must land back on the seed.
        let half = step_for(Unsigned128::new(1 << 63, 0));
        assert_eq!(half.double().apply(GLOBAL_SEED), GLOBAL_SEED);
        assert_ne!(half.apply(GLOBAL_SEED), GLOBAL_SEED);
    }
}
