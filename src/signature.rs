// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Recoverable ECDSA signatures.

use crate::{
    curve::CurvePoint,
    errors::{InternalError, Result},
    parameters::{MESSAGE_HASH_LEN, RECOVERY_ID_OFFSET},
};
use k256::{
    ecdsa::{signature::hazmat::PrehashVerifier, RecoveryId, Signature, VerifyingKey},
    elliptic_curve::{scalar::IsHigh, PrimeField},
    Scalar,
};
use serde::{Deserialize, Serialize};
use tracing::{error, trace};

/// An ECDSA signature `(r, s)` together with the recovery id that recovers
/// the signer's public key from it.
///
/// `s` is always the low representative, `s ≤ q/2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    r: Scalar,
    s: Scalar,
    recovery_id: u8,
}

impl RecoverableSignature {
    /// Finds the recovery id under which `signature` recovers
    /// `public_key` for `message_hash`.
    ///
    /// Fails with [`InternalError::SignatureRecovery`] if none of the four
    /// candidates does.
    pub(crate) fn recover(
        signature: &Signature,
        message_hash: &[u8],
        public_key: &CurvePoint,
    ) -> Result<Self> {
        let expected = public_key.to_verifying_key()?;
        let recovery_id = (0u8..4)
            .filter_map(RecoveryId::from_byte)
            .find(|id| {
                match VerifyingKey::recover_from_prehash(message_hash, signature, *id) {
                    Ok(candidate) => candidate == expected,
                    Err(e) => {
                        trace!("Recovery id {} is not applicable: {e}", id.to_byte());
                        false
                    }
                }
            })
            .ok_or_else(|| {
                error!("No recovery id reproduces the expected public key");
                InternalError::SignatureRecovery
            })?;

        let (r, s) = signature.split_scalars();
        Ok(Self {
            r: *r,
            s: *s,
            recovery_id: recovery_id.to_byte(),
        })
    }

    /// The x-projection of the nonce point.
    pub fn r(&self) -> &Scalar {
        &self.r
    }

    /// The (low) `s` component.
    pub fn s(&self) -> &Scalar {
        &self.s
    }

    /// The recovery id, in `0..4`.
    pub fn recovery_id(&self) -> u8 {
        self.recovery_id
    }

    /// The Ethereum-style recovery byte, `recovery_id + 27`.
    pub fn v(&self) -> u8 {
        self.recovery_id + RECOVERY_ID_OFFSET
    }

    /// `r ‖ s ‖ v` as 65 bytes.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r.to_repr());
        out[32..64].copy_from_slice(&self.s.to_repr());
        out[64] = self.v();
        out
    }

    /// The plain `(r, s)` signature.
    pub fn to_signature(&self) -> Result<Signature> {
        Signature::from_scalars(self.r.to_repr(), self.s.to_repr()).map_err(|_| {
            error!("Signature has a zero component");
            InternalError::InternalInvariantFailed
        })
    }

    /// Checks this signature on `message_hash` against `public_key`.
    pub fn verify(&self, public_key: &CurvePoint, message_hash: &[u8]) -> Result<()> {
        verify_prehash(public_key, message_hash, &self.to_signature()?)
    }
}

/// Standard ECDSA verification of `signature` over a 32-byte hash.
pub fn verify_prehash(
    public_key: &CurvePoint,
    message_hash: &[u8],
    signature: &Signature,
) -> Result<()> {
    if message_hash.len() != MESSAGE_HASH_LEN {
        return arg_err!(format!(
            "message hash must be {MESSAGE_HASH_LEN} bytes, got {}",
            message_hash.len()
        ));
    }
    public_key
        .to_verifying_key()?
        .verify_prehash(message_hash, signature)
        .map_err(|_| {
            error!("Signature does not verify under the expected public key");
            InternalError::InvalidSignature
        })
}

/// Maps `s` to `min(s, q - s)`.
pub(crate) fn normalize_s(s: Scalar) -> Scalar {
    if bool::from(s.is_high()) {
        -s
    } else {
        s
    }
}
