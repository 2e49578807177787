// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::common::{Args, ErrorWrapper, Result};
use rand::rngs::OsRng;
use rocket::{data::ToByteUnit, serde::json::Json, State};
use two_party_ecdsa::{
    CreateWalletRequest, CreateWalletResponse, Envelope, InMemoryKeyShareStore,
    PartialSignRequest, PartialSignResponse, Party1Service,
};

pub(crate) const GET_PUBLIC_KEY_ROUTE: &str = "thresholdSign/getPublicKey";
pub(crate) const SIGN_ROUTE: &str = "thresholdSign/sign";

pub(crate) type ServerState = Party1Service<InMemoryKeyShareStore>;

pub(crate) async fn server_main(args: Args) -> Result {
    let figment = rocket::Config::figment().merge(("port", args.port)).merge((
        "limits",
        rocket::data::Limits::new().limit("json", 1.megabytes()),
    ));

    let service: ServerState =
        Party1Service::new(InMemoryKeyShareStore::new(), args.algorithm.into());

    let _rocket = rocket::custom(figment)
        .mount("/", routes![get_public_key, sign])
        .manage(service)
        .launch()
        .await?;

    Ok(())
}

/// Registers the caller's key share and answers with the wallet's public key
#[post("/thresholdSign/getPublicKey", data = "<request>")]
async fn get_public_key(
    state: &State<ServerState>,
    request: Json<CreateWalletRequest>,
) -> std::result::Result<Json<Envelope<CreateWalletResponse>>, ErrorWrapper> {
    let mut rng = OsRng;
    let data = state.create_wallet(&mut rng, &request)?;
    Ok(Json(Envelope { data }))
}

/// Computes Party1's encrypted partial signature
#[post("/thresholdSign/sign", data = "<request>")]
async fn sign(
    state: &State<ServerState>,
    request: Json<PartialSignRequest>,
) -> std::result::Result<Json<Envelope<PartialSignResponse>>, ErrorWrapper> {
    let mut rng = OsRng;
    let data = state.partial_sign(&mut rng, &request)?;
    Ok(Json(Envelope { data }))
}
