// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The initiating party.
//!
//! A signature is produced in two steps around a single request to Party1:
//! [`Party2::gen_partial_sig_message`] sets up a fresh Paillier key and
//! agrees on a nonce, and [`Party2::compute_signature`] decrypts Party1's
//! answer and turns it into a recoverable signature. A session is single
//! use; a failed request has to start over with a new session.

use crate::{
    algorithm::Algorithm,
    curve::CurvePoint,
    errors::{InternalError, Result},
    keyshare::KeyShare,
    paillier::{PaillierCiphertext, PaillierPrivateKey, PaillierPublicKey},
    parameters::{SigningConfig, MESSAGE_HASH_LEN, NONCE_AGREEMENT_RETRY_MAX},
    signature::{normalize_s, RecoverableSignature},
    utils::{bn_to_scalar, message_hash_to_scalar, scalar_to_bn},
};
use k256::{ecdsa::Signature, elliptic_curve::PrimeField, NonZeroScalar, Scalar};
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;
use tracing::{debug, error, info, instrument, warn};
use zeroize::Zeroize;

/// Source of the ephemeral nonce scalars `k1` and `k2`.
pub trait NonceSource {
    /// Returns the next nonce scalar.
    fn next_nonce(&mut self) -> Scalar;
}

/// Draws nonces uniformly from `[1, q)` using a CSPRNG.
pub struct RngNonceSource<'a, R>(pub &'a mut R);

impl<R: RngCore + CryptoRng> NonceSource for RngNonceSource<'_, R> {
    fn next_nonce(&mut self) -> Scalar {
        *NonZeroScalar::random(&mut *self.0)
    }
}

/// Party2's state for one signature.
///
/// # 🔒 Lifetime requirements
/// This type must only be used _once_.
pub struct PartialSigMessage {
    paillier: PaillierPrivateKey,
    c_key: PaillierCiphertext,
    message_hash: [u8; MESSAGE_HASH_LEN],
    k1: Scalar,
    k2: Scalar,
    R: Scalar,
}

impl Debug for PartialSigMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialSigMessage")
            .field("paillier", &self.paillier)
            .field("message_hash", &hex::encode(self.message_hash))
            .field("k1", &"[redacted]")
            .field("k2", &"[redacted]")
            .field("R", &self.R)
            .finish()
    }
}

impl Drop for PartialSigMessage {
    fn drop(&mut self) {
        self.k1.zeroize();
        self.k2.zeroize();
    }
}

impl PartialSigMessage {
    fn new(
        paillier: PaillierPrivateKey,
        c_key: PaillierCiphertext,
        message_hash: [u8; MESSAGE_HASH_LEN],
        (k1, k2, R): (Scalar, Scalar, Scalar),
    ) -> Self {
        debug!("Agreed on a signing nonce");
        Self {
            paillier,
            c_key,
            message_hash,
            k1,
            k2,
            R,
        }
    }

    /// The encryption of Party2's key share, blinded.
    pub fn c_key(&self) -> &PaillierCiphertext {
        &self.c_key
    }

    /// The session's Paillier public key.
    pub fn paillier_public_key(&self) -> &PaillierPublicKey {
        self.paillier.public_key()
    }

    /// The hash being signed.
    pub fn message_hash(&self) -> &[u8] {
        &self.message_hash
    }

    /// The agreed nonce x-projection, i.e. the signature's `r`.
    pub fn r(&self) -> &Scalar {
        &self.R
    }

    /// The nonce share that is handed to Party1.
    pub fn k2(&self) -> &Scalar {
        &self.k2
    }

    /// Pairs Party1's answer with this session.
    pub fn partial_sig(&self, encrypted_contribution: PaillierCiphertext) -> PartialSig {
        PartialSig {
            encrypted_contribution,
            message_hash: self.message_hash,
            k1: self.k1,
            R: self.R,
        }
    }
}

/// Party1's encrypted contribution, tied to the session it answers.
pub struct PartialSig {
    encrypted_contribution: PaillierCiphertext,
    message_hash: [u8; MESSAGE_HASH_LEN],
    k1: Scalar,
    R: Scalar,
}

impl Debug for PartialSig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialSig")
            .field("encrypted_contribution", &self.encrypted_contribution)
            .field("message_hash", &hex::encode(self.message_hash))
            .field("k1", &"[redacted]")
            .field("R", &self.R)
            .finish()
    }
}

impl Drop for PartialSig {
    fn drop(&mut self) {
        self.k1.zeroize();
    }
}

impl PartialSig {
    /// The ciphertext returned by Party1.
    pub fn encrypted_contribution(&self) -> &PaillierCiphertext {
        &self.encrypted_contribution
    }
}

/// The initiator that drives a signature.
#[derive(Debug, Clone)]
pub struct Party2 {
    key_share: KeyShare,
    master_public_key: CurvePoint,
    algorithm: Algorithm,
}

impl Party2 {
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

    /// Uses a master public key reported by the other party instead of
    /// deriving it.
    pub fn with_master_public_key(
        key_share: KeyShare,
        master_public_key: CurvePoint,
        algorithm: Algorithm,
    ) -> Result<Self> {
        if master_public_key.is_identity() {
            return Err(key_err!("master public key is the point at infinity"));
        }
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

    pub(crate) fn key_share(&self) -> &KeyShare {
        &self.key_share
    }

    /// The key splitting scheme in use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Starts a signing session for `message_hash`: generates a Paillier key
    /// as described by `config` and agrees on a nonce.
    #[instrument(skip_all, err(Debug))]
    pub fn gen_partial_sig_message<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        config: &SigningConfig,
        message_hash: &[u8],
    ) -> Result<PartialSigMessage> {
        let paillier = PaillierPrivateKey::generate_with_config(rng, config)?;
        self.gen_partial_sig_message_with(rng, paillier, message_hash)
    }

    /// Like [`Party2::gen_partial_sig_message`], with the Paillier key
    /// supplied by the caller.
    pub fn gen_partial_sig_message_with<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        paillier: PaillierPrivateKey,
        message_hash: &[u8],
    ) -> Result<PartialSigMessage> {
        let (hash, c_key) = self.paillier_setup(rng, &paillier, message_hash)?;
        let nonce = agree_on_nonce(&mut RngNonceSource(rng))?;
        Ok(PartialSigMessage::new(paillier, c_key, hash, nonce))
    }

    /// Like [`Party2::gen_partial_sig_message_with`], drawing the nonce
    /// shares from `nonces` instead of `rng`.
    pub fn gen_partial_sig_message_with_nonces<R: RngCore + CryptoRng, N: NonceSource>(
        &self,
        rng: &mut R,
        nonces: &mut N,
        paillier: PaillierPrivateKey,
        message_hash: &[u8],
    ) -> Result<PartialSigMessage> {
        let (hash, c_key) = self.paillier_setup(rng, &paillier, message_hash)?;
        let nonce = agree_on_nonce(nonces)?;
        Ok(PartialSigMessage::new(paillier, c_key, hash, nonce))
    }

    /// Checks the hash and encrypts our share under `paillier`, blinded
    /// with randomness from `rng`.
    fn paillier_setup<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        paillier: &PaillierPrivateKey,
        message_hash: &[u8],
    ) -> Result<([u8; MESSAGE_HASH_LEN], PaillierCiphertext)> {
        // Validates the length
        message_hash_to_scalar(message_hash)?;
        let mut hash = [0u8; MESSAGE_HASH_LEN];
        hash.copy_from_slice(message_hash);

        let c_key = paillier
            .encrypt(&scalar_to_bn(self.key_share.scalar()))?
            .blind(rng)?;
        Ok((hash, c_key))
    }

    /// Decrypts Party1's contribution into a low-S `(r, s)` signature
    /// without checking it.
    ///
    /// A contribution made under a different Paillier key than the session's
    /// decrypts to garbage, and so does the resulting signature.
    pub fn combine(&self, message: &PartialSigMessage, partial: &PartialSig) -> Result<Signature> {
        if partial.message_hash != message.message_hash || partial.R != message.R {
            error!("Partial signature belongs to a different session");
            return Err(InternalError::ProtocolConsistency(String::from(
                "partial signature does not match the session",
            )));
        }
        let decrypted = message.paillier.decrypt(&partial.encrypted_contribution)?;
        let s_prime = bn_to_scalar(&decrypted)?;
        let k1_inv: Scalar = Option::from(partial.k1.invert()).ok_or_else(|| {
            error!("Could not invert k1");
            InternalError::CouldNotInvertScalar
        })?;
        let s = normalize_s(k1_inv * s_prime);

        Signature::from_scalars(message.R.to_repr(), s.to_repr()).map_err(|_| {
            warn!("Combined signature has a zero component");
            InternalError::SignatureRecovery
        })
    }

    /// Finishes a session: combines Party1's contribution and finds the
    /// recovery id that yields the master public key.
    #[instrument(skip_all, err(Debug))]
    pub fn compute_signature(
        &self,
        message: &PartialSigMessage,
        partial: &PartialSig,
    ) -> Result<RecoverableSignature> {
        let signature = self.combine(message, partial)?;
        let recoverable = RecoverableSignature::recover(
            &signature,
            &message.message_hash,
            &self.master_public_key,
        )?;
        info!(
            "Signed for wallet {} with recovery id {}",
            self.master_public_key.address(),
            recoverable.recovery_id()
        );
        Ok(recoverable)
    }
}

/// Draws nonce pairs until both ways of computing the shared nonce point
/// agree on a non-zero x-projection.
fn agree_on_nonce<N: NonceSource>(nonces: &mut N) -> Result<(Scalar, Scalar, Scalar)> {
    for attempt in 1..=NONCE_AGREEMENT_RETRY_MAX {
        let mut k1 = nonces.next_nonce();
        let mut k2 = nonces.next_nonce();
        match candidate_nonce(&k1, &k2) {
            Some(R) => {
                if attempt > 1 {
                    debug!("Nonce agreement took {attempt} attempts");
                }
                return Ok((k1, k2, R));
            }
            None => {
                k1.zeroize();
                k2.zeroize();
            }
        }
    }
    error!("Nonce agreement failed {NONCE_AGREEMENT_RETRY_MAX} times in a row");
    Err(InternalError::ProtocolConsistency(String::from(
        "could not agree on a non-zero nonce",
    )))
}

/// `x(k1·k2·G) mod q`, computed once from each side, if both agree and are
/// non-zero.
fn candidate_nonce(k1: &Scalar, k2: &Scalar) -> Option<Scalar> {
    if *k1 == Scalar::ZERO || *k2 == Scalar::ZERO {
        return None;
    }
    let Q1 = CurvePoint::GENERATOR.multiply_by_scalar(k1);
    let Q2 = CurvePoint::GENERATOR.multiply_by_scalar(k2);
    let R1 = Q2.multiply_by_scalar(k1).x_projection().ok()?;
    let R2 = Q1.multiply_by_scalar(k2).x_projection().ok()?;
    (R1 == R2 && R1 != Scalar::ZERO).then_some(R1)
}
