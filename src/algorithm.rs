// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The two ways of splitting a wallet key between the parties.
//!
//! With [`Algorithm::Additive`] the wallet key is `d = x1 + x2`, with
//! [`Algorithm::Multiplicative`] it is `d = x1·x2`. Everything that depends
//! on the choice lives here: deriving the master public key and Party1's
//! homomorphic contribution to the signature.

use crate::{
    curve::CurvePoint,
    errors::{InternalError, Result},
    keyshare::KeyShare,
    paillier::PaillierCiphertext,
    utils::{k256_order, random_positive_bn, scalar_to_bn},
};
use k256::Scalar;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::error;

/// How the two key shares combine into the wallet key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// `d = x1 + x2`, master key `X1 + X2`.
    Additive,
    /// `d = x1·x2`, master key `x_own·X_other`.
    Multiplicative,
}

impl Algorithm {
    /// Derives the master public key from our own share and the other
    /// party's public point.
    ///
    /// Both parties arrive at the same point.
    pub(crate) fn master_public_key(
        &self,
        own: &KeyShare,
        counterparty: &CurvePoint,
    ) -> Result<CurvePoint> {
        let master = match self {
            Algorithm::Additive => *own.public_point() + *counterparty,
            Algorithm::Multiplicative => counterparty.multiply_by_scalar(own.scalar()),
        };
        if master.is_identity() {
            error!("Key shares combine to the point at infinity");
            return Err(key_err!("combined public key is the point at infinity"));
        }
        Ok(master)
    }

    /// Party1's contribution to a signature, computed entirely under the
    /// other party's Paillier key.
    ///
    /// `c_key` encrypts the other party's share `x2`. The returned ciphertext
    /// decrypts to an integer congruent to `k2⁻¹·(z + r·d)` modulo `q`, with
    /// the hash term masked by a random multiple `ρ·q` of the group order.
    /// It is not blinded yet.
    pub(crate) fn partial_signature<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        own: &KeyShare,
        z: &Scalar,
        c_key: &PaillierCiphertext,
        r: &Scalar,
        k2: &Scalar,
    ) -> Result<PaillierCiphertext> {
        let order = k256_order();
        let k2_inv: Scalar = Option::from(k2.invert()).ok_or_else(|| {
            error!("Could not invert k2");
            InternalError::CouldNotInvertScalar
        })?;
        let public_key = c_key.public_key();

        // c1 = Enc(ρ·q + k2⁻¹·z mod q) with ρ in [0, q²)
        let rho = random_positive_bn(rng, &(order * order));
        let masked_hash = rho * order + scalar_to_bn(&(k2_inv * z));
        let c1 = public_key.encrypt(&masked_hash)?;

        match self {
            Algorithm::Additive => {
                let c2 = public_key.encrypt(&scalar_to_bn(own.scalar()))?;
                let c3 = c_key.add(&c2)?;
                let v = scalar_to_bn(&(k2_inv * r));
                let c4 = c3.multiply(&v);
                c1.add(&c4)
            }
            Algorithm::Multiplicative => {
                let v = scalar_to_bn(&(k2_inv * r * own.scalar()));
                c_key.multiply(&v).add(&c1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        paillier::{prime_gen::get_prime_pair_from_pool_insecure, PaillierPrivateKey},
        utils::{bn_to_scalar, testing::init_testing},
    };
    use k256::elliptic_curve::Field;

    #[test]
    fn both_parties_derive_the_same_master_key() {
        let mut rng = init_testing();
        let x1 = KeyShare::generate(&mut rng);
        let x2 = KeyShare::generate(&mut rng);
        for algorithm in [Algorithm::Additive, Algorithm::Multiplicative] {
            assert_eq!(
                algorithm
                    .master_public_key(&x1, x2.public_point())
                    .unwrap(),
                algorithm
                    .master_public_key(&x2, x1.public_point())
                    .unwrap()
            );
        }

        let d = *x1.scalar() * x2.scalar();
        assert_eq!(
            Algorithm::Multiplicative
                .master_public_key(&x1, x2.public_point())
                .unwrap(),
            CurvePoint::GENERATOR.multiply_by_scalar(&d)
        );
    }

    #[test]
    fn opposite_additive_shares_are_rejected() {
        let x1 = KeyShare::from_scalar(Scalar::from(5u64)).unwrap();
        let x2 = KeyShare::from_scalar(-Scalar::from(5u64)).unwrap();
        assert!(matches!(
            Algorithm::Additive.master_public_key(&x1, x2.public_point()),
            Err(InternalError::KeyError(_))
        ));
    }

    #[test]
    fn partial_signature_decrypts_to_expected_value() {
        let mut rng = init_testing();
        let (p, q) = get_prime_pair_from_pool_insecure(&mut rng);
        let sk = PaillierPrivateKey::from_primes(p, q).unwrap();

        let x1 = KeyShare::generate(&mut rng);
        let x2 = KeyShare::generate(&mut rng);
        let c_key = sk
            .encrypt(&scalar_to_bn(x2.scalar()))
            .unwrap()
            .blind(&mut rng)
            .unwrap();
        let z = Scalar::random(&mut rng);
        let r = Scalar::random(&mut rng);
        let k2 = Scalar::random(&mut rng);
        let k2_inv = k2.invert().unwrap();

        for (algorithm, d) in [
            (Algorithm::Additive, *x1.scalar() + x2.scalar()),
            (Algorithm::Multiplicative, *x1.scalar() * x2.scalar()),
        ] {
            let c = algorithm
                .partial_signature(&mut rng, &x1, &z, &c_key, &r, &k2)
                .unwrap();
            let plaintext = sk.decrypt(&c).unwrap();
            assert_eq!(bn_to_scalar(&plaintext).unwrap(), k2_inv * (z + r * d));
        }
    }

    #[test]
    fn zero_k2_cannot_be_inverted() {
        let mut rng = init_testing();
        let (p, q) = get_prime_pair_from_pool_insecure(&mut rng);
        let sk = PaillierPrivateKey::from_primes(p, q).unwrap();
        let x1 = KeyShare::generate(&mut rng);
        let c_key = sk.encrypt(&scalar_to_bn(&Scalar::ONE)).unwrap();
        assert_eq!(
            Algorithm::Additive.partial_signature(
                &mut rng,
                &x1,
                &Scalar::ONE,
                &c_key,
                &Scalar::ONE,
                &Scalar::ZERO
            ),
            Err(InternalError::CouldNotInvertScalar)
        );
    }
}
