// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Two-party threshold ECDSA over secp256k1
//!
//! A wallet key is split between a server, [`Party1`], and a client,
//! [`Party2`], so that neither ever holds the whole key. Together they
//! produce ordinary ECDSA signatures that verify under the wallet's public
//! key and carry an Ethereum-style recovery byte.
//!
//! The key can be split additively (`d = x1 + x2`) or multiplicatively
//! (`d = x1·x2`), see [`Algorithm`]. For every signature Party2 generates a
//! fresh Paillier key pair and sends Party1 an encryption of its share;
//! Party1 folds its own share and half of the nonce into that ciphertext
//! homomorphically, and Party2 decrypts the result into the signature.
//!
//! A signature takes a single round trip:
//!
//! 1. [`Party2::gen_partial_sig_message`] sets up the session.
//! 2. [`PartialSignRequest`] carries it to Party1, whose
//!    [`Party1::partial_sign`] (or [`Party1Service::partial_sign`] when
//!    serving many wallets) answers with a [`PartialSignResponse`].
//! 3. [`Party2::compute_signature`] turns the answer into a
//!    [`RecoverableSignature`].
//!
//! [`MpcWallet`] runs these steps over any [`Counterparty`] transport. The
//! network example under `demos/network` shows the same exchange over HTTP.

#![allow(non_snake_case)]
#![warn(missing_docs)]
#![cfg_attr(feature = "flame_it", feature(proc_macro_hygiene))]
#[cfg(feature = "flame_it")]
extern crate flame;
#[cfg(feature = "flame_it")]
#[macro_use]
extern crate flamer;

#[macro_use]
pub mod errors;

mod algorithm;
mod curve;
mod keyshare;
mod messages;
mod paillier;
mod parameters;
mod party1;
mod party2;
mod server;
mod signature;
mod storage;
mod transport;
mod utils;
mod wallet;

pub use algorithm::Algorithm;
pub use curve::CurvePoint;
pub use keyshare::KeyShare;
pub use messages::{
    CreateWalletRequest, CreateWalletResponse, Envelope, PartialSignRequest, PartialSignResponse,
    CIPHERTEXT_EXPONENT,
};
pub use paillier::{PaillierCiphertext, PaillierPrivateKey, PaillierPublicKey};
pub use parameters::{
    SigningConfig, DEFAULT_PAILLIER_STRENGTH, MESSAGE_HASH_LEN, MIN_PAILLIER_STRENGTH,
    PRIMALITY_ROUNDS, RECOVERY_ID_OFFSET,
};
pub use party1::Party1;
pub use party2::{NonceSource, PartialSig, PartialSigMessage, Party2, RngNonceSource};
pub use server::Party1Service;
pub use signature::{verify_prehash, RecoverableSignature};
pub use storage::{InMemoryKeyShareStore, KeyShareStore};
pub use transport::{Counterparty, InProcessCounterparty};
pub use utils::keccak256;
pub use wallet::MpcWallet;

#[cfg(test)]
mod tests;
