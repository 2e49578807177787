// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use rocket::{
    response::{self, Responder},
    Request,
};
use two_party_ecdsa::Algorithm;

pub(crate) type Result<T = ()> = std::result::Result<T, ErrorWrapper>;

#[derive(Debug)]
pub(crate) struct ErrorWrapper(pub(crate) anyhow::Error);

impl<E> From<E> for ErrorWrapper
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        ErrorWrapper(error.into())
    }
}

#[rocket::async_trait]
impl<'r> Responder<'r, 'static> for ErrorWrapper {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        response::Debug(self.0).respond_to(request)
    }
}

#[derive(clap::Parser)]
pub(crate) struct Args {
    #[clap(short, long, arg_enum)]
    pub(crate) role: RoleType,
    #[clap(short, long, default_value_t = 8000)]
    pub(crate) port: u16,
    #[clap(short, long, default_value_t = 8000)]
    pub(crate) server_port: u16,
    #[clap(short, long, arg_enum, default_value = "additive")]
    pub(crate) algorithm: AlgorithmType,
    /// Hex encoded key share to restore a wallet from
    #[clap(short, long)]
    pub(crate) key_share: Option<String>,
}

#[derive(clap::ArgEnum, Clone)]
pub(crate) enum RoleType {
    Server,
    Client,
}

#[derive(clap::ArgEnum, Clone, Copy)]
pub(crate) enum AlgorithmType {
    Additive,
    Multiplicative,
}

impl From<AlgorithmType> for Algorithm {
    fn from(algorithm: AlgorithmType) -> Self {
        match algorithm {
            AlgorithmType::Additive => Algorithm::Additive,
            AlgorithmType::Multiplicative => Algorithm::Multiplicative,
        }
    }
}
