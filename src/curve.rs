// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! secp256k1 point wrapper: encodings, x-projection and Ethereum addresses.

use crate::{
    errors::{InternalError, Result},
    utils::{bn_to_scalar, keccak256},
};
use k256::{
    ecdsa::VerifyingKey,
    elliptic_curve::{
        point::AffineCoordinates,
        sec1::{FromEncodedPoint, ToEncodedPoint},
    },
    AffinePoint, EncodedPoint, ProjectivePoint, Scalar,
};
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::error;
use zeroize::Zeroize;

/// Wrapper around [`k256::ProjectivePoint`] so that we can define our own
/// encodings for it.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Zeroize)]
pub struct CurvePoint(pub(crate) ProjectivePoint);

impl CurvePoint {
    /// The secp256k1 base point.
    pub const GENERATOR: Self = CurvePoint(ProjectivePoint::GENERATOR);
    /// The point at infinity.
    pub const IDENTITY: Self = CurvePoint(ProjectivePoint::IDENTITY);

    pub(crate) fn multiply_by_scalar(&self, scalar: &Scalar) -> Self {
        Self(self.0 * scalar)
    }

    /// Whether this is the point at infinity.
    pub fn is_identity(&self) -> bool {
        self.0 == ProjectivePoint::IDENTITY
    }

    /// The affine x-coordinate reduced modulo the group order, i.e. the `r`
    /// an ECDSA signature derives from a nonce point.
    pub(crate) fn x_projection(&self) -> Result<Scalar> {
        if self.is_identity() {
            error!("Attempted to take the x-projection of the point at infinity");
            return Err(InternalError::InternalInvariantFailed);
        }
        let x = self.0.to_affine().x();
        bn_to_scalar(&BigUint::from_bytes_be(x.as_slice()))
    }

    /// SEC1 encoding, 33 bytes when `compress` is set and 65 otherwise.
    pub fn to_sec1_bytes(&self, compress: bool) -> Vec<u8> {
        self.0
            .to_affine()
            .to_encoded_point(compress)
            .as_bytes()
            .to_vec()
    }

    /// Parses a compressed or uncompressed SEC1 encoding.
    ///
    /// The point at infinity is rejected.
    pub fn try_from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| {
            error!("Failed to parse bytes as a SEC1 encoded point");
            key_err!("malformed SEC1 encoding")
        })?;
        let point: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
        match point {
            Some(point) if point != AffinePoint::IDENTITY => Ok(Self(point.into())),
            _ => {
                error!("SEC1 encoding does not describe a usable curve point");
                Err(key_err!("encoding is not a point on secp256k1"))
            }
        }
    }

    /// Hex of the SEC1 encoding.
    pub fn to_hex(&self, compress: bool) -> String {
        hex::encode(self.to_sec1_bytes(compress))
    }

    /// Parses the hex of a SEC1 encoding, with or without a `0x` prefix.
    pub fn try_from_hex(encoded: &str) -> Result<Self> {
        let trimmed = encoded.strip_prefix("0x").unwrap_or(encoded);
        let bytes = hex::decode(trimmed).map_err(|_| {
            error!("Curve point hex is not valid hex");
            InternalError::Serialization
        })?;
        Self::try_from_sec1_bytes(&bytes)
    }

    /// The Ethereum address of this point, EIP-55 checksummed and `0x`
    /// prefixed.
    ///
    /// The address is the last 20 bytes of the Keccak-256 hash of the
    /// uncompressed encoding without its `0x04` tag.
    pub fn address(&self) -> String {
        let uncompressed = self.to_sec1_bytes(false);
        let hash = keccak256(&uncompressed[1..]);
        to_checksum_address(&hash[12..])
    }

    /// This point as an ECDSA verification key.
    pub fn to_verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_affine(self.0.to_affine()).map_err(|_| {
            error!("The point at infinity is not a verification key");
            key_err!("point at infinity")
        })
    }
}

/// Mixed-case checksum encoding of a 20-byte address.
fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());
    let checksummed: String = lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let nibble = (hash[i / 2] >> (4 * (1 - i % 2))) & 0x0f;
            if nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();
    format!("0x{checksummed}")
}

impl std::ops::Add for CurvePoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl From<ProjectivePoint> for CurvePoint {
    fn from(p: ProjectivePoint) -> Self {
        Self(p)
    }
}

impl Serialize for CurvePoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let afp = AffinePoint::from(self.0);
        afp.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CurvePoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let p = AffinePoint::deserialize(deserializer)?;
        Ok(Self(p.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::init_testing;
    use k256::elliptic_curve::Group;

    #[test]
    fn sec1_encodings_round_trip() {
        let rng = &mut init_testing();
        let point = CurvePoint(ProjectivePoint::random(rng));
        for compress in [true, false] {
            let bytes = point.to_sec1_bytes(compress);
            assert_eq!(bytes.len(), if compress { 33 } else { 65 });
            assert_eq!(CurvePoint::try_from_sec1_bytes(&bytes).unwrap(), point);
            let hex = point.to_hex(compress);
            assert_eq!(CurvePoint::try_from_hex(&hex).unwrap(), point);
            assert_eq!(CurvePoint::try_from_hex(&format!("0x{hex}")).unwrap(), point);
        }
    }

    #[test]
    fn malformed_encodings_are_rejected() {
        assert!(CurvePoint::try_from_sec1_bytes(&[]).is_err());
        assert!(CurvePoint::try_from_sec1_bytes(&[0u8]).is_err());
        assert!(CurvePoint::try_from_sec1_bytes(&[2u8; 33][..32]).is_err());
        assert_eq!(
            CurvePoint::try_from_hex("not hex"),
            Err(InternalError::Serialization)
        );
    }

    #[test]
    fn addresses_match_well_known_keys() {
        let one = CurvePoint::GENERATOR;
        assert_eq!(one.address(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        let two = one + one;
        assert_eq!(two.address(), "0x2B5AD5c4795c026514f8317c7a215E218DcCD6cF");
    }

    #[test]
    fn x_projection_of_generator_is_its_x_coordinate() {
        let x = CurvePoint::GENERATOR.x_projection().unwrap();
        assert_eq!(
            hex::encode(x.to_bytes()),
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert!(CurvePoint::IDENTITY.x_projection().is_err());
    }

    #[test]
    fn identity_is_not_a_verifying_key() {
        assert!(CurvePoint::IDENTITY.to_verifying_key().is_err());
        assert!(CurvePoint::GENERATOR.to_verifying_key().is_ok());
    }
}
