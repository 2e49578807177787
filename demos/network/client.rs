// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    cli::{finish_progress_bar, render_cli, start_progress_bar},
    common::{Args, Result},
    server::{GET_PUBLIC_KEY_ROUTE, SIGN_ROUTE},
};
use rand::rngs::OsRng;
use two_party_ecdsa::{
    keccak256, Algorithm, CreateWalletRequest, CreateWalletResponse, Envelope, KeyShare,
    PartialSignRequest, PartialSignResponse, Party2, SigningConfig,
};
use zeroize::Zeroizing;

/// The client's half of a wallet, along with where to find the other half
pub(crate) struct ClientWallet {
    pub(crate) party2: Party2,
    pub(crate) backup: Zeroizing<[u8; 32]>,
    server_port: u16,
    config: SigningConfig,
}

pub(crate) async fn client_main(args: Args) -> Result {
    let algorithm: Algorithm = args.algorithm.into();
    let key_share = match &args.key_share {
        Some(encoded) => {
            let bytes = Zeroizing::new(hex::decode(encoded.trim_start_matches("0x"))?);
            KeyShare::from_bytes(&bytes)?
        }
        None => KeyShare::generate(&mut OsRng),
    };

    let wallet = invoke_create_wallet(args.server_port, key_share, algorithm).await?;
    render_cli(&wallet).await?;

    Ok(())
}

fn endpoint(port: u16, route: &str) -> String {
    format!("http://127.0.0.1:{}/{}", port, route)
}

pub(crate) async fn invoke_create_wallet(
    server_port: u16,
    key_share: KeyShare,
    algorithm: Algorithm,
) -> Result<ClientWallet> {
    let request = CreateWalletRequest::new(key_share.public_point());

    let pb = start_progress_bar();
    let response = reqwest::Client::new()
        .post(endpoint(server_port, GET_PUBLIC_KEY_ROUTE))
        .json(&request)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(anyhow!("Error with getPublicKey: {:?}", response).into());
    }
    let envelope: Envelope<CreateWalletResponse> = response.json().await?;

    let backup = key_share.to_bytes();
    let party2 =
        Party2::with_master_public_key(key_share, envelope.data.master_public_key()?, algorithm)?;
    finish_progress_bar(
        pb,
        format!(
            "Wallet is ready at address: {}",
            party2.master_public_key().address()
        ),
    );

    Ok(ClientWallet {
        party2,
        backup,
        server_port,
        config: SigningConfig::default().with_algorithm(algorithm),
    })
}

pub(crate) async fn invoke_sign(wallet: &ClientWallet, message: &[u8]) -> Result {
    let hash = keccak256(message);

    let pb = start_progress_bar();
    let session = wallet
        .party2
        .gen_partial_sig_message(&mut OsRng, &wallet.config, &hash)?;
    let request = PartialSignRequest::new(wallet.party2.public_point(), &session);

    let response = reqwest::Client::new()
        .post(endpoint(wallet.server_port, SIGN_ROUTE))
        .json(&request)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(anyhow!("Error with sign: {:?}", response).into());
    }
    let envelope: Envelope<PartialSignResponse> = response.json().await?;

    let partial = session.partial_sig(envelope.data.ciphertext()?);
    let signature = wallet.party2.compute_signature(&session, &partial)?;

    // Verify the signature
    signature.verify(wallet.party2.master_public_key(), &hash)?;

    finish_progress_bar(
        pb,
        format!(
            "Generated signature:\n\t0x{}",
            hex::encode(signature.to_bytes())
        ),
    );

    Ok(())
}
