// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    curve::CurvePoint,
    errors::Result,
    utils::{bn_to_field_bytes, k256_order},
};
use k256::{elliptic_curve::PrimeField, FieldBytes, NonZeroScalar, Scalar};
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;
use tracing::error;
use zeroize::{ZeroizeOnDrop, Zeroizing};

/// One party's share of a wallet key: a secret scalar and the matching
/// public point.
///
/// # 🔒 Storage requirements
/// This type must be stored securely by the calling application.
#[derive(Clone, ZeroizeOnDrop)]
pub struct KeyShare {
    x: Scalar, // in the range [1, q)
    #[zeroize(skip)]
    X: CurvePoint,
}

impl Debug for KeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyShare")
            .field("x", &"[redacted]")
            .field("X", &self.X)
            .finish()
    }
}

impl PartialEq for KeyShare {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
    }
}

impl Eq for KeyShare {}

impl KeyShare {
    /// Sample a key share uniformly at random.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let x = *NonZeroScalar::random(rng);
        Self {
            x,
            X: CurvePoint::GENERATOR.multiply_by_scalar(&x),
        }
    }

    /// Builds the key share for secret `x`.
    pub fn from_scalar(x: Scalar) -> Result<Self> {
        if x == Scalar::ZERO {
            error!("Refusing to build a key share from a zero scalar");
            return Err(key_err!("secret scalar must be non-zero"));
        }
        Ok(Self {
            x,
            X: CurvePoint::GENERATOR.multiply_by_scalar(&x),
        })
    }

    /// Builds the key share for the 32-byte big-endian secret `bytes`.
    ///
    /// Values outside `[1, q)` are rejected rather than reduced.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            error!("Key share encoding has length {}", bytes.len());
            return Err(key_err!("secret scalar must be encoded in 32 bytes"));
        }
        let repr = Zeroizing::new(FieldBytes::clone_from_slice(bytes));
        let x: Option<Scalar> = Scalar::from_repr(*repr).into();
        match x {
            Some(x) => Self::from_scalar(x),
            None => {
                error!("Key share encoding is not smaller than the group order");
                Err(key_err!("secret scalar out of range"))
            }
        }
    }

    /// Builds the key share for the integer secret `x`, which must lie in
    /// `[1, q)`.
    pub fn from_biguint(x: &BigUint) -> Result<Self> {
        if x >= k256_order() {
            error!("Key share integer is not smaller than the group order");
            return Err(key_err!("secret scalar out of range"));
        }
        let bytes = Zeroizing::new(bn_to_field_bytes(x)?);
        Self::from_bytes(bytes.as_slice())
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.x
    }

    /// The public point `x·G`.
    pub fn public_point(&self) -> &CurvePoint {
        &self.X
    }

    /// 32-byte big-endian encoding of the secret scalar.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(self.x.to_repr().as_slice());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::InternalError, utils::testing::init_testing};
    use num_traits::{One, Zero};

    #[test]
    fn importing_the_same_scalar_is_deterministic() {
        let mut rng = init_testing();
        let share = KeyShare::generate(&mut rng);
        let a = KeyShare::from_bytes(share.to_bytes().as_slice()).unwrap();
        let b = KeyShare::from_scalar(*share.scalar()).unwrap();
        assert_eq!(a, share);
        assert_eq!(b, share);
        assert_eq!(a.public_point(), share.public_point());
    }

    #[test]
    fn integer_import_matches_scalar_import() {
        let share = KeyShare::from_biguint(&BigUint::one()).unwrap();
        assert_eq!(share.public_point(), &CurvePoint::GENERATOR);
        assert_eq!(share, KeyShare::from_scalar(Scalar::ONE).unwrap());
    }

    #[test]
    fn invalid_scalars_are_key_errors() {
        assert!(matches!(
            KeyShare::from_scalar(Scalar::ZERO),
            Err(InternalError::KeyError(_))
        ));
        assert!(matches!(
            KeyShare::from_biguint(&BigUint::zero()),
            Err(InternalError::KeyError(_))
        ));
        assert!(matches!(
            KeyShare::from_biguint(k256_order()),
            Err(InternalError::KeyError(_))
        ));
        assert!(KeyShare::from_bytes(&[0xff; 32]).is_err());
        assert!(KeyShare::from_bytes(&[1; 31]).is_err());
    }

    #[test]
    fn debug_output_hides_secret() {
        let share = KeyShare::from_scalar(Scalar::from(1234u64)).unwrap();
        let rendered = format!("{share:?}");
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains(&format!("{:?}", share.scalar())));
    }
}
