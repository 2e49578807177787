// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    errors::{InternalError, Result},
    parameters::{CRYPTOGRAPHIC_RETRY_MAX, MESSAGE_HASH_LEN},
};
use k256::{
    elliptic_curve::{bigint::Encoding, Curve, PrimeField},
    FieldBytes, Scalar,
};
use lazy_static::lazy_static;
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use sha3::{Digest, Keccak256};
use tracing::error;
use zeroize::Zeroizing;

lazy_static! {
    static ref K256_ORDER: BigUint =
        BigUint::from_bytes_be(&k256::Secp256k1::ORDER.to_be_bytes());
}

/// The order `q` of the secp256k1 group.
pub(crate) fn k256_order() -> &'static BigUint {
    &K256_ORDER
}

/// Computes a^e (mod n)
#[cfg_attr(feature = "flame_it", flame("utils"))]
pub(crate) fn modpow(a: &BigUint, e: &BigUint, n: &BigUint) -> BigUint {
    a.modpow(e, n)
}

/// Computes `a⁻¹ mod n`, failing if `a` and `n` share a factor.
pub(crate) fn mod_inverse(a: &BigUint, n: &BigUint) -> Result<BigUint> {
    a.modinv(n).ok_or_else(|| {
        error!("Tried to invert a value that is not coprime to its modulus");
        InternalError::InvalidParameter(String::from("value is not invertible"))
    })
}

/// Sample a number uniformly at random from the range [0, n).
pub(crate) fn random_positive_bn<R: RngCore + CryptoRng>(rng: &mut R, n: &BigUint) -> BigUint {
    rng.gen_biguint_below(n)
}

/// Generate a random `BigUint` that is in the multiplicative group of
/// integers modulo `n`.
pub(crate) fn random_bn_in_z_star<R: RngCore + CryptoRng>(
    rng: &mut R,
    n: &BigUint,
) -> Result<BigUint> {
    std::iter::repeat_with(|| rng.gen_biguint_below(n))
        .take(CRYPTOGRAPHIC_RETRY_MAX)
        .find(|candidate| !candidate.is_zero() && candidate.gcd(n).is_one())
        .ok_or_else(|| {
            error!("Failed to sample an element of Z*_n");
            InternalError::InternalInvariantFailed
        })
}

/// Serializes `x` as a 32-byte big-endian array, as expected by `k256`.
///
/// Fails if `x` does not fit into 32 bytes.
pub(crate) fn bn_to_field_bytes(x: &BigUint) -> Result<FieldBytes> {
    let bytes = Zeroizing::new(x.to_bytes_be());
    if bytes.len() > 32 {
        error!("Integer does not fit in a secp256k1 field element");
        return Err(InternalError::InternalInvariantFailed);
    }
    let mut padded = FieldBytes::default();
    padded[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(padded)
}

/// Converts `x` to a [`Scalar`] after reducing it modulo the group order.
pub(crate) fn bn_to_scalar(x: &BigUint) -> Result<Scalar> {
    let reduced = x % k256_order();
    let bytes = Zeroizing::new(bn_to_field_bytes(&reduced)?);
    Option::from(Scalar::from_repr(*bytes)).ok_or_else(|| {
        error!("Failed to convert BigUint into k256::Scalar");
        InternalError::InternalInvariantFailed
    })
}

/// Converts a [`Scalar`] to its canonical integer value in `[0, q)`.
pub(crate) fn scalar_to_bn(x: &Scalar) -> BigUint {
    let bytes = Zeroizing::new(x.to_repr());
    BigUint::from_bytes_be(bytes.as_slice())
}

/// Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let digest = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Interprets a message hash as an integer mod `q`.
///
/// Only hashes of exactly [`MESSAGE_HASH_LEN`] bytes are accepted, which is
/// also what ECDSA verification expects of a prehashed message.
pub(crate) fn message_hash_to_scalar(message_hash: &[u8]) -> Result<Scalar> {
    if message_hash.len() != MESSAGE_HASH_LEN {
        error!(
            "Message hash has length {}, expected {MESSAGE_HASH_LEN}",
            message_hash.len()
        );
        return arg_err!(format!(
            "message hash must be {MESSAGE_HASH_LEN} bytes, got {}",
            message_hash.len()
        ));
    }
    bn_to_scalar(&BigUint::from_bytes_be(message_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::init_testing;

    #[test]
    fn scalar_conversion_reduces_modulo_order() {
        let q = k256_order();
        let x = q + BigUint::from(5u8);
        assert_eq!(bn_to_scalar(&x).unwrap(), Scalar::from(5u64));
        assert_eq!(scalar_to_bn(&Scalar::from(5u64)), BigUint::from(5u8));
        assert_eq!(bn_to_scalar(q).unwrap(), Scalar::ZERO);
    }

    #[test]
    fn scalar_roundtrip_preserves_random_values() {
        let mut rng = init_testing();
        for _ in 0..50 {
            let x = random_positive_bn(&mut rng, k256_order());
            assert_eq!(scalar_to_bn(&bn_to_scalar(&x).unwrap()), x);
        }
    }

    #[test]
    fn oversized_integers_do_not_become_field_bytes() {
        let too_big = BigUint::one() << 256;
        assert!(bn_to_field_bytes(&too_big).is_err());
    }

    #[test]
    fn keccak_matches_known_digest() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn message_hashes_must_have_digest_length() {
        assert!(message_hash_to_scalar(&[]).is_err());
        assert!(message_hash_to_scalar(&[1u8; 31]).is_err());
        assert!(message_hash_to_scalar(&[1u8; 33]).is_err());
        let mut hash = [0u8; 32];
        hash[31] = 9;
        assert_eq!(message_hash_to_scalar(&hash).unwrap(), Scalar::from(9u64));
    }

    #[test]
    fn inverse_of_non_unit_fails() {
        let n = BigUint::from(15u8);
        assert!(mod_inverse(&BigUint::from(5u8), &n).is_err());
        assert_eq!(
            mod_inverse(&BigUint::from(2u8), &n).unwrap(),
            BigUint::from(8u8)
        );
    }

    #[test]
    fn z_star_samples_are_units() {
        let mut rng = init_testing();
        let n = BigUint::from(3u32 * 5 * 7 * 11);
        for _ in 0..100 {
            let x = random_bn_in_z_star(&mut rng, &n).unwrap();
            assert!(!x.is_zero());
            assert!(x.gcd(&n).is_one());
        }
    }
}

////////////////////////////
// Test Utility Functions //
////////////////////////////
