// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! How a wallet reaches Party1.
//!
//! Failures of a remote implementation are reported as
//! [`InternalError::Transport`](crate::errors::InternalError::Transport).
//! Nothing here retries; a failed signing attempt is restarted by the caller
//! with a new session.

use crate::{
    errors::Result,
    messages::{
        CreateWalletRequest, CreateWalletResponse, PartialSignRequest, PartialSignResponse,
    },
    server::Party1Service,
    storage::KeyShareStore,
};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use std::sync::Arc;

/// The two operations a wallet needs from Party1.
pub trait Counterparty {
    /// Registers the sender's key share and returns the master public key.
    fn create_wallet(&mut self, request: &CreateWalletRequest) -> Result<CreateWalletResponse>;

    /// Asks for an encrypted partial signature.
    fn partial_sign(&mut self, request: &PartialSignRequest) -> Result<PartialSignResponse>;
}

/// Calls a [`Party1Service`] living in the same process.
#[derive(Debug)]
pub struct InProcessCounterparty<S, R = OsRng> {
    service: Arc<Party1Service<S>>,
    rng: R,
}

impl<S: KeyShareStore> InProcessCounterparty<S> {
    /// Connects to `service`, which draws its randomness from the OS.
    pub fn new(service: Arc<Party1Service<S>>) -> Self {
        Self {
            service,
            rng: OsRng,
        }
    }
}

impl<S: KeyShareStore, R: RngCore + CryptoRng> InProcessCounterparty<S, R> {
    /// Connects to `service`, which draws its randomness from `rng`.
    pub fn with_rng(service: Arc<Party1Service<S>>, rng: R) -> Self {
        Self { service, rng }
    }
}

impl<S: KeyShareStore, R: RngCore + CryptoRng> Counterparty for InProcessCounterparty<S, R> {
    fn create_wallet(&mut self, request: &CreateWalletRequest) -> Result<CreateWalletResponse> {
        self.service.create_wallet(&mut self.rng, request)
    }

    fn partial_sign(&mut self, request: &PartialSignRequest) -> Result<PartialSignResponse> {
        self.service.partial_sign(&mut self.rng, request)
    }
}
