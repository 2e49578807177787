// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Prime generation for Paillier moduli.
//!
//! Primes are drawn from `glass_pumpkin` and kept only if their two top bits
//! are set, so the product of two of them has exactly twice the bit length.
//! Every candidate is then run through our own Miller-Rabin test, whose
//! number of rounds is chosen by the caller. The same test, preceded by
//! trial division against the primes below 1000, checks imported factors.

use crate::{
    errors::{InternalError, Result},
    parameters::CRYPTOGRAPHIC_RETRY_MAX,
};
use lazy_static::lazy_static;
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use tracing::{error, trace};

/// Primes below this bound are used for trial division.
const TRIAL_DIVISION_BOUND: u32 = 1000;

lazy_static! {
    static ref SMALL_PRIMES: Vec<u32> = {
        let mut sieve = vec![true; TRIAL_DIVISION_BOUND as usize];
        sieve[0] = false;
        sieve[1] = false;
        let mut i = 2;
        while i * i < sieve.len() {
            if sieve[i] {
                (i * i..sieve.len()).step_by(i).for_each(|j| sieve[j] = false);
            }
            i += 1;
        }
        sieve
            .iter()
            .enumerate()
            .filter_map(|(p, &is_prime)| is_prime.then_some(p as u32))
            .collect()
    };
}

/// Outcome of dividing a candidate by the small primes.
enum TrialDivision {
    /// The candidate is itself one of the small primes.
    SmallPrime,
    /// The candidate has a small factor.
    Composite,
    /// No small factor was found.
    Inconclusive,
}

fn trial_division(candidate: &BigUint) -> TrialDivision {
    for &p in SMALL_PRIMES.iter() {
        if *candidate == BigUint::from(p) {
            return TrialDivision::SmallPrime;
        }
        if (candidate % p).is_zero() {
            return TrialDivision::Composite;
        }
    }
    TrialDivision::Inconclusive
}

/// Probabilistic primality test.
///
/// A composite `candidate` is accepted with probability at most
/// `4^-rounds`; primes are always accepted.
pub(crate) fn is_probable_prime<R: RngCore + CryptoRng>(
    rng: &mut R,
    candidate: &BigUint,
    rounds: usize,
) -> bool {
    if *candidate < BigUint::from(2u8) {
        return false;
    }
    match trial_division(candidate) {
        TrialDivision::SmallPrime => return true,
        TrialDivision::Composite => return false,
        TrialDivision::Inconclusive => {}
    }

    let one = BigUint::one();
    let two = BigUint::from(2u8);
    let n_minus_one = candidate - &one;
    // candidate is odd and larger than 1000 here, so n - 1 is even and non-zero
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, candidate);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, candidate);
            if x == n_minus_one {
                continue 'witness;
            }
            if x == one {
                return false;
            }
        }
        return false;
    }
    true
}

/// Samples a random prime of exactly `bits` bits whose two most significant
/// bits are set.
///
/// Candidates come from [`glass_pumpkin::prime::from_rng`]; each one must
/// then also pass `rounds` rounds of [`is_probable_prime`].
#[cfg_attr(feature = "flame_it", flame("Paillier"))]
pub(crate) fn random_prime<R: RngCore + CryptoRng>(
    rng: &mut R,
    bits: usize,
    rounds: usize,
) -> Result<BigUint> {
    for attempt in 1..=CRYPTOGRAPHIC_RETRY_MAX {
        let candidate = glass_pumpkin::prime::from_rng(bits, rng).map_err(|e| {
            error!("Prime generation failed: {e}");
            InternalError::InvalidParameter(format!("cannot generate a {bits}-bit prime: {e}"))
        })?;
        if !candidate.bit(bits as u64 - 2) {
            continue;
        }
        if is_probable_prime(rng, &candidate, rounds) {
            trace!("Found a {bits}-bit prime after {attempt} candidates");
            return Ok(candidate);
        }
    }
    error!("Exceeded the retry limit while generating a {bits}-bit prime");
    Err(InternalError::InternalInvariantFailed)
}

#[cfg(test)]
lazy_static! {
    /// 512-bit primes with their two top bits set, pre-generated so that tests
    /// don't spend their time in prime generation.
    pub(crate) static ref POOL_OF_PRIMES: Vec<BigUint> = include_str!("primes_512.txt")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| BigUint::parse_bytes(line.trim().as_bytes(), 16).unwrap())
        .collect();
}

/// Returns two distinct primes from the pre-generated pool.
///
/// This must only be used in tests: the pool is public.
#[cfg(test)]
pub(crate) fn get_prime_pair_from_pool_insecure<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> (BigUint, BigUint) {
    use rand::seq::index::sample;
    let picked = sample(rng, POOL_OF_PRIMES.len(), 2);
    (
        POOL_OF_PRIMES[picked.index(0)].clone(),
        POOL_OF_PRIMES[picked.index(1)].clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parameters::PRIMALITY_ROUNDS, utils::testing::init_testing};

    #[test]
    fn small_values_are_classified_correctly() {
        let mut rng = init_testing();
        for p in [2u32, 3, 5, 7, 997, 1009, 7919] {
            assert!(is_probable_prime(&mut rng, &BigUint::from(p), PRIMALITY_ROUNDS));
        }
        for c in [0u32, 1, 4, 9, 1001, 7917] {
            assert!(!is_probable_prime(&mut rng, &BigUint::from(c), PRIMALITY_ROUNDS));
        }
    }

    #[test]
    fn carmichael_numbers_are_rejected() {
        let mut rng = init_testing();
        // Chernick numbers (6k+1)(12k+1)(18k+1) whose factors all lie above
        // the trial division bound, so only Miller-Rabin can catch them
        let carmichaels = [
            BigUint::from(1_171u64 * 2_341 * 3_511),
            BigUint::from(1_237u64 * 2_473 * 3_709),
        ];
        for c in carmichaels {
            assert!(!is_probable_prime(&mut rng, &c, PRIMALITY_ROUNDS));
        }
    }

    #[test]
    fn mersenne_prime_is_accepted() {
        let mut rng = init_testing();
        let m127 = (BigUint::one() << 127) - 1u32;
        assert!(is_probable_prime(&mut rng, &m127, PRIMALITY_ROUNDS));
        let not_prime = (BigUint::one() << 128) - 1u32;
        assert!(!is_probable_prime(&mut rng, &not_prime, PRIMALITY_ROUNDS));
    }

    #[test]
    fn agrees_with_independent_primality_check() {
        let mut rng = init_testing();
        for _ in 0..200 {
            let candidate = rng.gen_biguint(128) | BigUint::one();
            assert_eq!(
                is_probable_prime(&mut rng, &candidate, PRIMALITY_ROUNDS),
                glass_pumpkin::prime::check(&candidate)
            );
        }
    }

    #[test]
    fn random_primes_have_requested_shape() {
        let mut rng = init_testing();
        for _ in 0..4 {
            let p = random_prime(&mut rng, 256, PRIMALITY_ROUNDS).unwrap();
            assert_eq!(p.bits(), 256);
            assert!(p.bit(254));
            assert!(p.bit(0));
            assert!(glass_pumpkin::prime::check(&p));
        }
    }

    #[test]
    fn tiny_primes_are_refused() {
        let mut rng = init_testing();
        assert!(matches!(
            random_prime(&mut rng, 8, PRIMALITY_ROUNDS),
            Err(InternalError::InvalidParameter(_))
        ));
    }

    #[test]
    fn prime_pool_is_sound() {
        let mut rng = init_testing();
        assert!(POOL_OF_PRIMES.len() >= 8);
        for p in POOL_OF_PRIMES.iter() {
            assert_eq!(p.bits(), 512);
            assert!(is_probable_prime(&mut rng, p, 10));
        }
        let (p, q) = get_prime_pair_from_pool_insecure(&mut rng);
        assert_ne!(p, q);
    }
}
