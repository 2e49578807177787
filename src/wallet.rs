// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! A client wallet whose key is shared with Party1.

use crate::{
    curve::CurvePoint,
    errors::Result,
    keyshare::KeyShare,
    messages::{CreateWalletRequest, PartialSignRequest},
    parameters::SigningConfig,
    party2::Party2,
    signature::RecoverableSignature,
    transport::Counterparty,
    utils::keccak256,
};
use rand::{CryptoRng, RngCore};
use tracing::{error, info, instrument};
use zeroize::Zeroizing;

/// Party2 together with a connection to Party1.
#[derive(Debug)]
pub struct MpcWallet<C> {
    party2: Party2,
    counterparty: C,
    config: SigningConfig,
}

impl<C: Counterparty> MpcWallet<C> {
    /// Creates a wallet with a fresh key share and registers it with
    /// Party1.
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        counterparty: C,
        config: SigningConfig,
    ) -> Result<Self> {
        Self::import(KeyShare::generate(rng), counterparty, config)
    }

    /// Creates a wallet from an existing key share and registers it with
    /// Party1. Party1 hands back the same wallet for a share it already
    /// knows.
    #[instrument(skip_all, err(Debug))]
    pub fn import(
        key_share: KeyShare,
        mut counterparty: C,
        config: SigningConfig,
    ) -> Result<Self> {
        config.validate()?;
        let request = CreateWalletRequest::new(key_share.public_point());
        let master_public_key = counterparty.create_wallet(&request)?.master_public_key()?;
        let party2 =
            Party2::with_master_public_key(key_share, master_public_key, config.algorithm)?;
        info!("Wallet {} is ready", party2.master_public_key().address());
        Ok(Self {
            party2,
            counterparty,
            config,
        })
    }

    /// The wallet's Ethereum address.
    pub fn address(&self) -> String {
        self.party2.master_public_key().address()
    }

    /// The wallet's public key.
    pub fn master_public_key(&self) -> &CurvePoint {
        self.party2.master_public_key()
    }

    /// The signing configuration.
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Our key share's secret scalar, for backing up the wallet.
    pub fn export_key_share(&self) -> Zeroizing<[u8; 32]> {
        self.party2.key_share().to_bytes()
    }

    /// Signs `message` together with Party1.
    ///
    /// With `need_to_hash` the message is hashed with Keccak-256 first;
    /// otherwise it has to be a 32-byte hash already. The signature is
    /// checked against the wallet's public key before it is returned.
    #[instrument(skip_all, err(Debug))]
    pub fn sign_message<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        message: &[u8],
        need_to_hash: bool,
    ) -> Result<RecoverableSignature> {
        let hash = message_hash(message, need_to_hash)?;
        let session = self
            .party2
            .gen_partial_sig_message(rng, &self.config, &hash)?;
        let request = PartialSignRequest::new(self.party2.public_point(), &session);
        let response = self.counterparty.partial_sign(&request)?;
        let partial = session.partial_sig(response.ciphertext()?);
        let signature = self.party2.compute_signature(&session, &partial)?;
        signature.verify(self.master_public_key(), &hash)?;
        Ok(signature)
    }

    /// Checks `signature` on `message` against the wallet's public key.
    pub fn validate_signature(
        &self,
        message: &[u8],
        signature: &RecoverableSignature,
        need_to_hash: bool,
    ) -> Result<()> {
        let hash = message_hash(message, need_to_hash)?;
        signature.verify(self.master_public_key(), &hash)
    }
}

fn message_hash(message: &[u8], need_to_hash: bool) -> Result<Vec<u8>> {
    if need_to_hash {
        Ok(keccak256(message).to_vec())
    } else if message.is_empty() {
        error!("Asked to sign an empty message hash");
        arg_err!("message hash must not be empty")
    } else {
        Ok(message.to_vec())
    }
}
