// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! A list of error types which are produced during an execution of the protocol
use thiserror::Error;

/// The default Result type used in this crate
pub type Result<T> = std::result::Result<T, InternalError>;

/// Represents an error in the manipulation of internal cryptographic data
#[derive(Clone, Eq, PartialEq, Error, Debug)]
#[allow(missing_docs)]
pub enum InternalError {
    /// A caller handed in a malformed value: a Paillier strength below the
    /// minimum, a plaintext outside `[0, n)`, an empty message hash, a zero
    /// nonce, and so on.
    #[error("Function call contained invalid arguments: `{0}`")]
    InvalidParameter(String),
    /// Nonce agreement kept producing a zero or mismatched `R`.
    #[error("Protocol consistency check failed: `{0}`")]
    ProtocolConsistency(String),
    /// None of the four recovery ids reproduces the master public key.
    #[error("Could not construct a recoverable signature for the master public key")]
    SignatureRecovery,
    /// A signature failed standard ECDSA verification.
    #[error("Signature does not verify under the expected public key")]
    InvalidSignature,
    /// The counterparty could not be reached or answered with garbage.
    #[error("Transport to the counterparty failed: `{0}`")]
    Transport(String),
    /// A scalar or curve point could not be turned into a key.
    #[error("Invalid key material: `{0}`")]
    KeyError(String),
    /// The responder has no key share registered for the requesting client.
    #[error("No wallet is registered for this client")]
    UnknownWallet,
    #[error("Serialization Error")]
    Serialization,
    #[error("Could not invert a Scalar")]
    CouldNotInvertScalar,
    #[error("Represents some code assumption that was checked at runtime but failed to be true")]
    InternalInvariantFailed,
}

macro_rules! arg_err {
    ($x:expr) => {{
        Err(crate::errors::InternalError::InvalidParameter(String::from(
            $x,
        )))
    }};
}

macro_rules! key_err {
    ($x:expr) => {{
        crate::errors::InternalError::KeyError(String::from($x))
    }};
}
