// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The responding party.
//!
//! Party1 holds one key share and never decrypts anything: it only combines
//! its own share with ciphertexts under the other party's Paillier key.

use crate::{
    algorithm::Algorithm,
    curve::CurvePoint,
    errors::Result,
    keyshare::KeyShare,
    paillier::PaillierCiphertext,
    parameters::MIN_PAILLIER_STRENGTH,
    utils::message_hash_to_scalar,
};
use k256::Scalar;
use rand::{CryptoRng, RngCore};
use tracing::{error, info, instrument};

/// The half-signer that answers partial signature requests.
#[derive(Debug, Clone)]
pub struct Party1 {
    key_share: KeyShare,
    master_public_key: CurvePoint,
    algorithm: Algorithm,
}

impl Party1 {
    /// Pairs `key_share` with the other party's public point.
    pub fn new(
        key_share: KeyShare,
        counterparty: &CurvePoint,
        algorithm: Algorithm,
    ) -> Result<Self> {
        let master_public_key = algorithm.master_public_key(&key_share, counterparty)?;
        Ok(Self {
            key_share,
            master_public_key,
            algorithm,
        })
    }

    /// The wallet's public key.
    pub fn master_public_key(&self) -> &CurvePoint {
        &self.master_public_key
    }

    /// This party's public point.
    pub fn public_point(&self) -> &CurvePoint {
        self.key_share.public_point()
    }

    /// The key splitting scheme in use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Computes the encrypted partial signature for `message_hash`.
    ///
    /// `c_key` encrypts the other party's share under that party's Paillier
    /// key, `r` is the agreed nonce x-projection and `k2` the nonce share
    /// handed to us. The result is blinded.
    #[instrument(skip_all, err(Debug))]
    pub fn partial_sign<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        message_hash: &[u8],
        c_key: &PaillierCiphertext,
        r: &Scalar,
        k2: &Scalar,
    ) -> Result<PaillierCiphertext> {
        let z = message_hash_to_scalar(message_hash)?;
        if *k2 == Scalar::ZERO {
            error!("Received a zero nonce share");
            return arg_err!("k2 must be non-zero");
        }
        if *r == Scalar::ZERO {
            error!("Received a zero nonce point projection");
            return arg_err!("r must be non-zero");
        }
        if c_key.public_key().n().bits() < MIN_PAILLIER_STRENGTH as u64 {
            error!(
                "Paillier modulus of {} bits is too small to hold the partial signature",
                c_key.public_key().n().bits()
            );
            return arg_err!("Paillier modulus is too small");
        }

        let contribution = self
            .algorithm
            .partial_signature(rng, &self.key_share, &z, c_key, r, k2)?
            .ensure_blinded(rng)?;
        info!(
            "Computed {:?} partial signature for wallet {}",
            self.algorithm,
            self.master_public_key.address()
        );
        Ok(contribution)
    }
}
