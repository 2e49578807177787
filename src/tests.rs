// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use super::*;
use crate::{
    errors::{InternalError, Result},
    paillier::prime_gen::get_prime_pair_from_pool_insecure,
    utils::{k256_order, scalar_to_bn, testing::init_testing},
};
use k256::{
    ecdsa::{signature::hazmat::PrehashVerifier, VerifyingKey},
    elliptic_curve::scalar::IsHigh,
    Scalar,
};
use rand::{rngs::StdRng, CryptoRng, RngCore};
use std::sync::Arc;

fn pool_paillier_key<R: RngCore + CryptoRng>(rng: &mut R) -> PaillierPrivateKey {
    let (p, q) = get_prime_pair_from_pool_insecure(rng);
    PaillierPrivateKey::from_primes(p, q).unwrap()
}

/// Runs one signature between `party1` and `party2`, using a Paillier key
/// from the test pool.
fn sign_once(
    rng: &mut StdRng,
    party1: &Party1,
    party2: &Party2,
    message_hash: &[u8],
) -> Result<RecoverableSignature> {
    let paillier = pool_paillier_key(rng);
    let session = party2.gen_partial_sig_message_with(rng, paillier, message_hash)?;
    let contribution = party1.partial_sign(
        rng,
        session.message_hash(),
        session.c_key(),
        session.r(),
        session.k2(),
    )?;
    let partial = session.partial_sig(contribution);
    party2.compute_signature(&session, &partial)
}

/// Verifies with `k256` directly rather than through this crate.
fn assert_verifies(master: &CurvePoint, message_hash: &[u8], signature: &RecoverableSignature) {
    let verifying_key = VerifyingKey::from_sec1_bytes(&master.to_sec1_bytes(true)).unwrap();
    verifying_key
        .verify_prehash(message_hash, &signature.to_signature().unwrap())
        .unwrap();
    assert!(!bool::from(signature.s().is_high()));
    assert!(scalar_to_bn(signature.s()) <= k256_order() >> 1);
    assert!((27..=30).contains(&signature.v()));
}

fn wallet_config(algorithm: Algorithm) -> SigningConfig {
    SigningConfig::default()
        .with_algorithm(algorithm)
        .with_paillier_strength(MIN_PAILLIER_STRENGTH)
        .with_primality_rounds(10)
}

#[cfg_attr(feature = "flame_it", flame)]
#[test]
fn both_variants_produce_valid_low_s_signatures() -> Result<()> {
    let mut rng = init_testing();
    for algorithm in [Algorithm::Additive, Algorithm::Multiplicative] {
        let x1 = KeyShare::generate(&mut rng);
        let x2 = KeyShare::generate(&mut rng);
        let party1 = Party1::new(x1.clone(), x2.public_point(), algorithm)?;
        let party2 = Party2::new(x2, x1.public_point(), algorithm)?;
        assert_eq!(party1.master_public_key(), party2.master_public_key());

        for message in [&b"hello"[..], b"", b"a somewhat longer message to sign"] {
            let hash = keccak256(message);
            let signature = sign_once(&mut rng, &party1, &party2, &hash)?;
            assert_verifies(party2.master_public_key(), &hash, &signature);
        }
    }
    Ok(())
}

#[test]
fn toy_shares_of_one_sign_under_twice_the_generator() -> Result<()> {
    let mut rng = init_testing();
    let x1 = KeyShare::from_scalar(Scalar::ONE)?;
    let x2 = KeyShare::from_scalar(Scalar::ONE)?;
    let party1 = Party1::new(x1.clone(), x2.public_point(), Algorithm::Additive)?;
    let party2 = Party2::new(x2, x1.public_point(), Algorithm::Additive)?;

    let two_g = CurvePoint::GENERATOR + CurvePoint::GENERATOR;
    assert_eq!(party2.master_public_key(), &two_g);
    assert_eq!(
        party2.master_public_key().address(),
        "0x2B5AD5c4795c026514f8317c7a215E218DcCD6cF"
    );

    let hash = keccak256(b"hello");
    let signature = sign_once(&mut rng, &party1, &party2, &hash)?;
    assert_verifies(&two_g, &hash, &signature);
    Ok(())
}

#[test]
fn signatures_from_independent_sessions_use_fresh_nonces() -> Result<()> {
    let mut rng = init_testing();
    let x1 = KeyShare::generate(&mut rng);
    let x2 = KeyShare::generate(&mut rng);
    let party1 = Party1::new(x1.clone(), x2.public_point(), Algorithm::Additive)?;
    let party2 = Party2::new(x2, x1.public_point(), Algorithm::Additive)?;
    let hash = keccak256(b"same message twice");

    let first = sign_once(&mut rng, &party1, &party2, &hash)?;
    let second = sign_once(&mut rng, &party1, &party2, &hash)?;
    assert_ne!(first.r(), second.r());
    assert_verifies(party2.master_public_key(), &hash, &first);
    assert_verifies(party2.master_public_key(), &hash, &second);
    Ok(())
}

#[test]
fn messages_survive_json_transport() -> Result<()> {
    let mut rng = init_testing();
    let service = Party1Service::new(InMemoryKeyShareStore::new(), Algorithm::Additive);
    let x2 = KeyShare::generate(&mut rng);

    let request = CreateWalletRequest::new(x2.public_point());
    let request: CreateWalletRequest =
        serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
    let response = service.create_wallet(&mut rng, &request)?;
    let response: CreateWalletResponse =
        serde_json::from_str(&serde_json::to_string(&response).unwrap()).unwrap();
    let party2 = Party2::with_master_public_key(
        x2,
        response.master_public_key()?,
        Algorithm::Additive,
    )?;

    let hash = keccak256(b"over the wire");
    let paillier = pool_paillier_key(&mut rng);
    let session = party2.gen_partial_sig_message_with(&mut rng, paillier, &hash)?;
    let request = PartialSignRequest::new(party2.public_point(), &session);
    let request: PartialSignRequest =
        serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
    let response = service.partial_sign(&mut rng, &request)?;
    let response: PartialSignResponse =
        serde_json::from_str(&serde_json::to_string(&response).unwrap()).unwrap();
    assert_eq!(response.exponent, CIPHERTEXT_EXPONENT);

    let partial = session.partial_sig(response.ciphertext()?);
    let signature = party2.compute_signature(&session, &partial)?;
    assert_verifies(party2.master_public_key(), &hash, &signature);
    Ok(())
}

#[test]
fn unknown_clients_cannot_get_partial_signatures() -> Result<()> {
    let mut rng = init_testing();
    let service = Party1Service::new(InMemoryKeyShareStore::new(), Algorithm::Additive);
    let stranger = KeyShare::generate(&mut rng);
    let party2 = Party2::new(
        stranger,
        KeyShare::generate(&mut rng).public_point(),
        Algorithm::Additive,
    )?;
    let paillier = pool_paillier_key(&mut rng);
    let session =
        party2.gen_partial_sig_message_with(&mut rng, paillier, &keccak256(b"hello"))?;
    let request = PartialSignRequest::new(party2.public_point(), &session);
    assert_eq!(
        service.partial_sign(&mut rng, &request),
        Err(InternalError::UnknownWallet)
    );
    Ok(())
}

#[test]
fn wallets_sign_through_an_in_process_counterparty() -> Result<()> {
    let mut rng = init_testing();
    for algorithm in [Algorithm::Additive, Algorithm::Multiplicative] {
        let service = Arc::new(Party1Service::new(InMemoryKeyShareStore::new(), algorithm));
        let mut wallet = MpcWallet::generate(
            &mut rng,
            InProcessCounterparty::new(Arc::clone(&service)),
            wallet_config(algorithm),
        )?;
        assert!(wallet.address().starts_with("0x"));
        assert_eq!(wallet.address().len(), 42);

        let signature = wallet.sign_message(&mut rng, b"hello", true)?;
        wallet.validate_signature(b"hello", &signature, true)?;
        assert_verifies(wallet.master_public_key(), &keccak256(b"hello"), &signature);
        assert_eq!(
            wallet.validate_signature(b"goodbye", &signature, true),
            Err(InternalError::InvalidSignature)
        );
    }
    Ok(())
}

#[test]
fn wallets_accept_prehashed_messages() -> Result<()> {
    let mut rng = init_testing();
    let service = Arc::new(Party1Service::new(
        InMemoryKeyShareStore::new(),
        Algorithm::Additive,
    ));
    let mut wallet = MpcWallet::generate(
        &mut rng,
        InProcessCounterparty::with_rng(Arc::clone(&service), init_testing()),
        wallet_config(Algorithm::Additive),
    )?;

    let hash = keccak256(b"prehashed");
    let signature = wallet.sign_message(&mut rng, &hash, false)?;
    wallet.validate_signature(b"prehashed", &signature, true)?;

    assert!(matches!(
        wallet.sign_message(&mut rng, &[], false),
        Err(InternalError::InvalidParameter(_))
    ));
    assert!(matches!(
        wallet.sign_message(&mut rng, b"not a hash", false),
        Err(InternalError::InvalidParameter(_))
    ));
    Ok(())
}

#[test]
fn importing_a_share_restores_the_same_wallet() -> Result<()> {
    let mut rng = init_testing();
    let service = Arc::new(Party1Service::new(
        InMemoryKeyShareStore::new(),
        Algorithm::Multiplicative,
    ));
    let config = wallet_config(Algorithm::Multiplicative);
    let wallet = MpcWallet::generate(
        &mut rng,
        InProcessCounterparty::new(Arc::clone(&service)),
        config,
    )?;
    let backup = wallet.export_key_share();

    let restored = MpcWallet::import(
        KeyShare::from_bytes(backup.as_slice())?,
        InProcessCounterparty::new(Arc::clone(&service)),
        config,
    )?;
    assert_eq!(restored.address(), wallet.address());
    assert_eq!(service.store().len()?, 1);
    Ok(())
}

/// A counterparty whose connection is down.
struct Unreachable;

impl Counterparty for Unreachable {
    fn create_wallet(&mut self, _: &CreateWalletRequest) -> Result<CreateWalletResponse> {
        Err(InternalError::Transport(String::from("connection refused")))
    }

    fn partial_sign(&mut self, _: &PartialSignRequest) -> Result<PartialSignResponse> {
        Err(InternalError::Transport(String::from("connection refused")))
    }
}

#[test]
fn transport_failures_are_surfaced() {
    let mut rng = init_testing();
    assert!(matches!(
        MpcWallet::generate(&mut rng, Unreachable, wallet_config(Algorithm::Additive)),
        Err(InternalError::Transport(_))
    ));
}

/// A counterparty that registers wallets but drops every signing request.
struct DropsSigningRequests<S>(InProcessCounterparty<S>);

impl<S: KeyShareStore> Counterparty for DropsSigningRequests<S> {
    fn create_wallet(&mut self, request: &CreateWalletRequest) -> Result<CreateWalletResponse> {
        self.0.create_wallet(request)
    }

    fn partial_sign(&mut self, _: &PartialSignRequest) -> Result<PartialSignResponse> {
        Err(InternalError::Transport(String::from("connection reset")))
    }
}

#[test]
fn signing_transport_failures_are_surfaced() -> Result<()> {
    let mut rng = init_testing();
    let service = Arc::new(Party1Service::new(
        InMemoryKeyShareStore::new(),
        Algorithm::Additive,
    ));
    let mut wallet = MpcWallet::generate(
        &mut rng,
        DropsSigningRequests(InProcessCounterparty::new(Arc::clone(&service))),
        wallet_config(Algorithm::Additive),
    )?;
    assert_eq!(service.store().len()?, 1);
    assert!(matches!(
        wallet.sign_message(&mut rng, b"hello", true),
        Err(InternalError::Transport(_))
    ));
    Ok(())
}

#[test]
fn undersized_configurations_are_refused_up_front() {
    let mut rng = init_testing();
    let service = Arc::new(Party1Service::new(
        InMemoryKeyShareStore::new(),
        Algorithm::Additive,
    ));
    let config = wallet_config(Algorithm::Additive).with_paillier_strength(512);
    assert!(matches!(
        MpcWallet::generate(&mut rng, InProcessCounterparty::new(service), config),
        Err(InternalError::InvalidParameter(_))
    ));
}
