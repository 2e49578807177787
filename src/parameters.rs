// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Security parameter definitions and signing configuration.
//!
//! The Paillier modulus has to be large enough that Party1's masked
//! contribution `ρ·q + k2⁻¹·z + k2⁻¹·R·(x1 + x2)` never wraps around `n`,
//! where `q` is the secp256k1 group order and `ρ < q²`. That value stays
//! below `2^770`, so a 1024-bit modulus is the smallest one accepted.

use crate::algorithm::Algorithm;
use serde::{Deserialize, Serialize};

/// Bit size of the Paillier modulus `n` generated for each signature.
pub const DEFAULT_PAILLIER_STRENGTH: usize = 2048;

/// Smallest Paillier modulus (in bits) that key generation accepts.
pub const MIN_PAILLIER_STRENGTH: usize = 1024;

/// Number of Miller-Rabin rounds used when searching for Paillier primes.
///
/// A composite survives a single round with probability at most 1/4, so 40
/// rounds bound the error by `2^-80`.
pub const PRIMALITY_ROUNDS: usize = 40;

/// Upper bound on nonce agreement attempts before giving up.
///
/// A single attempt fails only when the shared nonce point has a zero
/// x-coordinate mod `q`, so hitting this bound means something is broken.
pub(crate) const NONCE_AGREEMENT_RETRY_MAX: usize = 1000;

/// Upper bound on draws when rejection sampling a random value.
pub(crate) const CRYPTOGRAPHIC_RETRY_MAX: usize = 500;

/// Offset added to the recovery id to form the Ethereum-style `v` byte.
pub const RECOVERY_ID_OFFSET: u8 = 27;

/// Length in bytes of the message hash consumed by the protocol.
pub const MESSAGE_HASH_LEN: usize = 32;

/// Knobs for a signing client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Bit size of the per-signature Paillier modulus.
    pub paillier_strength: usize,
    /// Miller-Rabin rounds applied to each prime candidate.
    pub primality_rounds: usize,
    /// Generate the two Paillier primes on separate threads.
    pub parallel_prime_generation: bool,
    /// How the two key shares combine into the master key.
    pub algorithm: Algorithm,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            paillier_strength: DEFAULT_PAILLIER_STRENGTH,
            primality_rounds: PRIMALITY_ROUNDS,
            parallel_prime_generation: true,
            algorithm: Algorithm::Additive,
        }
    }
}

impl SigningConfig {
    /// Returns a copy of `self` using `algorithm`.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Returns a copy of `self` using a Paillier modulus of `strength` bits.
    pub fn with_paillier_strength(mut self, strength: usize) -> Self {
        self.paillier_strength = strength;
        self
    }

    /// Returns a copy of `self` running `rounds` Miller-Rabin rounds per
    /// prime candidate.
    pub fn with_primality_rounds(mut self, rounds: usize) -> Self {
        self.primality_rounds = rounds;
        self
    }

    /// Returns a copy of `self` with parallel prime generation switched on
    /// or off.
    pub fn with_parallel_prime_generation(mut self, parallel: bool) -> Self {
        self.parallel_prime_generation = parallel;
        self
    }

    /// Checks that the configuration can produce usable Paillier keys.
    pub(crate) fn validate(&self) -> crate::errors::Result<()> {
        if self.paillier_strength < MIN_PAILLIER_STRENGTH || self.paillier_strength % 2 != 0 {
            return arg_err!(format!(
                "Paillier strength must be an even number of at least {MIN_PAILLIER_STRENGTH} bits, got {}",
                self.paillier_strength
            ));
        }
        if self.primality_rounds == 0 {
            return arg_err!("At least one primality round is required");
        }
        Ok(())
    }
}
