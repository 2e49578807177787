//! Types and methods for the JSON messages exchanged with Party1.

// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Integers travel as decimal strings and curve points as hex encoded SEC1.
//! Ciphertexts carry an `exponent` field for compatibility with servers that
//! use a fixed-point ciphertext encoding; with the `g = n + 1` scheme it is
//! always zero.

use crate::{
    curve::CurvePoint,
    errors::{InternalError, Result},
    paillier::{PaillierCiphertext, PaillierPublicKey},
    party2::PartialSigMessage,
    utils::{bn_to_scalar, k256_order, scalar_to_bn},
};
use k256::Scalar;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{error, instrument, trace};

/// The only ciphertext exponent this crate produces or accepts.
pub const CIPHERTEXT_EXPONENT: i32 = 0;

fn parse_decimal(field: &str, value: &str) -> Result<BigUint> {
    BigUint::from_str(value).map_err(|_| {
        error!("Field `{field}` is not a decimal integer");
        InternalError::Serialization
    })
}

fn parse_scalar(field: &str, value: &str) -> Result<Scalar> {
    let x = parse_decimal(field, value)?;
    if &x >= k256_order() {
        error!("Field `{field}` is not reduced modulo the group order");
        return arg_err!(format!("`{field}` must be smaller than the group order"));
    }
    bn_to_scalar(&x)
}

fn check_exponent(exponent: i32) -> Result<()> {
    if exponent != CIPHERTEXT_EXPONENT {
        error!("Received a ciphertext with exponent {exponent}");
        return arg_err!(format!(
            "ciphertext exponent must be {CIPHERTEXT_EXPONENT}, got {exponent}"
        ));
    }
    Ok(())
}

fn parse_ciphertext(modulus: &str, cipher_text: &str, exponent: i32) -> Result<PaillierCiphertext> {
    check_exponent(exponent)?;
    let public_key = PaillierPublicKey::new(parse_decimal("modulus", modulus)?)?;
    PaillierCiphertext::from_raw(parse_decimal("cipherText", cipher_text)?, public_key)
}

/// Asks Party1 to register a wallet for the sender's key share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    /// The sender's public point, hex SEC1.
    pub public_key: String,
}

impl CreateWalletRequest {
    /// Request for the holder of `public_key`.
    pub fn new(public_key: &CurvePoint) -> Self {
        Self {
            public_key: public_key.to_hex(false),
        }
    }

    /// The sender's public point.
    pub fn client_point(&self) -> Result<CurvePoint> {
        CurvePoint::try_from_hex(&self.public_key)
    }
}

/// Party1's answer to a [`CreateWalletRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletResponse {
    /// The wallet's master public key, hex uncompressed SEC1.
    pub public_key: String,
}

impl CreateWalletResponse {
    /// Response announcing `master_public_key`.
    pub fn new(master_public_key: &CurvePoint) -> Self {
        Self {
            public_key: master_public_key.to_hex(false),
        }
    }

    /// The wallet's master public key.
    pub fn master_public_key(&self) -> Result<CurvePoint> {
        CurvePoint::try_from_hex(&self.public_key)
    }
}

/// Asks Party1 for its encrypted partial signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSignRequest {
    /// The sender's public point, hex SEC1. Identifies the wallet.
    pub public_key: String,
    /// The 32-byte hash being signed.
    #[serde(alias = "message")]
    pub message_hash: Vec<u8>,
    /// The sender's encrypted key share.
    pub cipher_text: String,
    /// Always [`CIPHERTEXT_EXPONENT`].
    pub exponent: i32,
    /// The sender's Paillier modulus.
    pub modulus: String,
    /// The agreed nonce x-projection.
    pub r: String,
    /// Party1's nonce share.
    pub k2: String,
}

impl PartialSignRequest {
    /// Builds the request for `session`, sent by the holder of
    /// `public_key`.
    #[instrument(skip_all)]
    pub fn new(public_key: &CurvePoint, session: &PartialSigMessage) -> Self {
        trace!("New partial sign request created.");
        Self {
            public_key: public_key.to_hex(false),
            message_hash: session.message_hash().to_vec(),
            cipher_text: session.c_key().value().to_string(),
            exponent: CIPHERTEXT_EXPONENT,
            modulus: session.paillier_public_key().n().to_string(),
            r: scalar_to_bn(session.r()).to_string(),
            k2: scalar_to_bn(session.k2()).to_string(),
        }
    }

    /// The sender's public point.
    pub fn client_point(&self) -> Result<CurvePoint> {
        CurvePoint::try_from_hex(&self.public_key)
    }

    /// The sender's encrypted key share.
    pub fn c_key(&self) -> Result<PaillierCiphertext> {
        parse_ciphertext(&self.modulus, &self.cipher_text, self.exponent)
    }

    /// The agreed nonce x-projection.
    pub fn nonce_r(&self) -> Result<Scalar> {
        parse_scalar("r", &self.r)
    }

    /// Party1's nonce share.
    pub fn nonce_k2(&self) -> Result<Scalar> {
        parse_scalar("k2", &self.k2)
    }
}

/// Party1's encrypted partial signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSignResponse {
    /// The Paillier modulus the ciphertext is encrypted under.
    pub modulus: String,
    /// The ciphertext.
    pub cipher_text: String,
    /// Always [`CIPHERTEXT_EXPONENT`].
    pub exponent: i32,
}

impl PartialSignResponse {
    /// Response carrying `ciphertext`, which must already be blinded.
    pub fn new(ciphertext: &PaillierCiphertext) -> Result<Self> {
        if !ciphertext.is_blinded() {
            error!("Refusing to reveal an unblinded ciphertext");
            return Err(InternalError::InternalInvariantFailed);
        }
        Ok(Self {
            modulus: ciphertext.public_key().n().to_string(),
            cipher_text: ciphertext.value().to_string(),
            exponent: CIPHERTEXT_EXPONENT,
        })
    }

    /// The ciphertext.
    pub fn ciphertext(&self) -> Result<PaillierCiphertext> {
        parse_ciphertext(&self.modulus, &self.cipher_text, self.exponent)
    }
}

/// The `{ "data": ... }` envelope the HTTP server wraps its answers in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// The payload.
    pub data: T,
}
