// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Party1 as a service for many wallets.

use crate::{
    algorithm::Algorithm,
    errors::{InternalError, Result},
    keyshare::KeyShare,
    messages::{
        CreateWalletRequest, CreateWalletResponse, PartialSignRequest, PartialSignResponse,
    },
    party1::Party1,
    storage::KeyShareStore,
};
use rand::{CryptoRng, RngCore};
use tracing::{error, info, instrument};

/// Answers wallet creation and partial signature requests, keeping one key
/// share per client in `S`.
#[derive(Debug)]
pub struct Party1Service<S> {
    store: S,
    algorithm: Algorithm,
}

impl<S: KeyShareStore> Party1Service<S> {
    /// A service backed by `store`, splitting keys according to `algorithm`.
    pub fn new(store: S, algorithm: Algorithm) -> Self {
        Self { store, algorithm }
    }

    /// The key splitting scheme in use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a wallet for the requesting client and returns its master
    /// public key.
    ///
    /// A client that already has a wallet gets the existing one back.
    #[instrument(skip_all, err(Debug))]
    pub fn create_wallet<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        request: &CreateWalletRequest,
    ) -> Result<CreateWalletResponse> {
        let client_point = request.client_point()?;
        let client_id = client_point.address();
        let share = self
            .store
            .insert_if_absent(&client_id, KeyShare::generate(rng))?;
        let party1 = Party1::new(share, &client_point, self.algorithm)?;
        info!(
            "Wallet {} is served for client {client_id}",
            party1.master_public_key().address()
        );
        Ok(CreateWalletResponse::new(party1.master_public_key()))
    }

    /// Computes the encrypted partial signature asked for by `request`.
    #[instrument(skip_all, err(Debug))]
    pub fn partial_sign<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        request: &PartialSignRequest,
    ) -> Result<PartialSignResponse> {
        let client_point = request.client_point()?;
        let client_id = client_point.address();
        let share = self.store.get(&client_id)?.ok_or_else(|| {
            error!("No wallet registered for client {client_id}");
            InternalError::UnknownWallet
        })?;
        let party1 = Party1::new(share, &client_point, self.algorithm)?;

        let contribution = party1.partial_sign(
            rng,
            &request.message_hash,
            &request.c_key()?,
            &request.nonce_r()?,
            &request.nonce_k2()?,
        )?;
        PartialSignResponse::new(&contribution)
    }
}
