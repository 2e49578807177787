// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The Paillier cryptosystem, instantiated with generator `g = n + 1`.
//!
//! With this generator `g^m = 1 + m·n (mod n²)`, so encryption needs no
//! exponentiation at all. A freshly encrypted ciphertext is *not* randomized;
//! [`PaillierCiphertext::blind`] multiplies in `rⁿ` for a random unit `r`,
//! which leaves the plaintext untouched. Ciphertexts keep track of whether
//! they have been blinded so that nothing unblinded leaves a party.

pub(crate) mod prime_gen;

use crate::{
    errors::{InternalError, Result},
    parameters::{SigningConfig, CRYPTOGRAPHIC_RETRY_MAX},
    utils::{mod_inverse, modpow, random_bn_in_z_star},
};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{CheckedSub, One, Zero};
use rand::{rngs::StdRng, CryptoRng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, thread::ScopedJoinHandle};
use tracing::{debug, error, instrument};

/// Miller-Rabin rounds used to sanity check primes handed to
/// [`PaillierPrivateKey::from_primes`].
const IMPORTED_PRIME_ROUNDS: usize = 8;

/// Computes `L(x) = (x - 1) / d`.
fn l_function(x: &BigUint, d: &BigUint) -> Result<BigUint> {
    let x_minus_one = x.checked_sub(&BigUint::one()).ok_or_else(|| {
        error!("Ciphertext is not a unit modulo n²");
        InternalError::InvalidParameter(String::from("ciphertext is not invertible"))
    })?;
    Ok(x_minus_one / d)
}

/// The public half of a Paillier key pair.
///
/// Serializes as the modulus alone; deserializing goes through
/// [`PaillierPublicKey::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BigUint", into = "BigUint")]
pub struct PaillierPublicKey {
    n: BigUint,
    g: BigUint,
    nn: BigUint,
}

impl PaillierPublicKey {
    /// Builds the public key for modulus `n`.
    ///
    /// `n` has to be odd and larger than one; whether it really is a product
    /// of two primes cannot be checked here.
    pub fn new(n: BigUint) -> Result<Self> {
        if n <= BigUint::one() || n.is_even() {
            error!("Rejecting a Paillier modulus that is even or trivially small");
            return arg_err!("Paillier modulus must be odd and larger than one");
        }
        let g = &n + 1u32;
        let nn = &n * &n;
        Ok(Self { n, g, nn })
    }

    /// The modulus `n`.
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// The generator `g = n + 1`.
    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// `n²`, the modulus ciphertexts live under.
    pub fn nn(&self) -> &BigUint {
        &self.nn
    }

    /// Encrypts `m` without randomization, producing `1 + m·n (mod n²)`.
    ///
    /// The result must be [blinded](PaillierCiphertext::blind) before it is
    /// shown to anyone who should not learn `m`.
    pub fn encrypt(&self, m: &BigUint) -> Result<PaillierCiphertext> {
        if m >= &self.n {
            error!("Attempted to encrypt a plaintext outside of [0, n)");
            return arg_err!("Paillier plaintext must be smaller than the modulus");
        }
        let value = (BigUint::one() + m * &self.n) % &self.nn;
        Ok(PaillierCiphertext {
            value,
            public_key: self.clone(),
            blinded: false,
        })
    }
}

impl TryFrom<BigUint> for PaillierPublicKey {
    type Error = InternalError;

    fn try_from(n: BigUint) -> Result<Self> {
        Self::new(n)
    }
}

impl From<PaillierPublicKey> for BigUint {
    fn from(public_key: PaillierPublicKey) -> Self {
        public_key.n
    }
}

/// A Paillier ciphertext together with the key it was produced under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaillierCiphertext {
    value: BigUint,
    public_key: PaillierPublicKey,
    blinded: bool,
}

impl PaillierCiphertext {
    /// Wraps a ciphertext received from elsewhere.
    ///
    /// Its randomness is outside of our control, so it is treated as already
    /// blinded.
    pub fn from_raw(value: BigUint, public_key: PaillierPublicKey) -> Result<Self> {
        if value.is_zero() || value >= public_key.nn {
            error!("Received a ciphertext outside of (0, n²)");
            return arg_err!("Paillier ciphertext must lie in (0, n²)");
        }
        Ok(Self {
            value,
            public_key,
            blinded: true,
        })
    }

    /// The raw ciphertext value in `[0, n²)`.
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// The key this ciphertext is encrypted under.
    pub fn public_key(&self) -> &PaillierPublicKey {
        &self.public_key
    }

    /// Whether fresh randomness has been mixed into this ciphertext since
    /// the last homomorphic operation.
    pub fn is_blinded(&self) -> bool {
        self.blinded
    }

    fn with_value(&self, value: BigUint) -> Self {
        Self {
            value,
            public_key: self.public_key.clone(),
            blinded: false,
        }
    }

    fn check_same_key(&self, other: &Self) -> Result<()> {
        if self.public_key != other.public_key {
            error!("Homomorphic operation on ciphertexts under different Paillier keys");
            return arg_err!("ciphertexts were encrypted under different keys");
        }
        Ok(())
    }

    /// Re-randomizes the ciphertext by multiplying it with `rⁿ mod n²`.
    pub fn blind<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<Self> {
        let pk = &self.public_key;
        let r = random_bn_in_z_star(rng, &pk.n)?;
        let mask = modpow(&r, &pk.n, &pk.nn);
        Ok(Self {
            value: (&self.value * mask) % &pk.nn,
            public_key: pk.clone(),
            blinded: true,
        })
    }

    /// Returns `self` unchanged if it is already blinded, and a blinded copy
    /// otherwise.
    pub fn ensure_blinded<R: RngCore + CryptoRng>(self, rng: &mut R) -> Result<Self> {
        if self.blinded {
            Ok(self)
        } else {
            self.blind(rng)
        }
    }

    /// `Enc(a) ⊕ Enc(b) = Enc(a + b)`.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_same_key(other)?;
        Ok(self.with_value((&self.value * &other.value) % &self.public_key.nn))
    }

    /// `Enc(a) ⊕ s = Enc(a + s)`.
    pub fn add_scalar(&self, s: &BigUint) -> Result<Self> {
        let encrypted = self.public_key.encrypt(&(s % &self.public_key.n))?;
        self.add(&encrypted)
    }

    /// `Enc(a) ⊖ Enc(b) = Enc(a - b mod n)`.
    pub fn subtract(&self, other: &Self) -> Result<Self> {
        self.check_same_key(other)?;
        let inverse = mod_inverse(&other.value, &self.public_key.nn)?;
        Ok(self.with_value((&self.value * inverse) % &self.public_key.nn))
    }

    /// `Enc(a) ⊖ s = Enc(a - s mod n)`.
    pub fn subtract_scalar(&self, s: &BigUint) -> Result<Self> {
        let encrypted = self.public_key.encrypt(&(s % &self.public_key.n))?;
        self.subtract(&encrypted)
    }

    /// `Enc(a) ⊗ k = Enc(a·k mod n)`.
    pub fn multiply(&self, k: &BigUint) -> Self {
        self.with_value(modpow(&self.value, k, &self.public_key.nn))
    }
}

/// A Paillier private key.
///
/// Besides the factorization of `n` it keeps the precomputed values for
/// both the direct (`λ`, `μ`) and the CRT (`hp`, `hq`, `p⁻¹ mod q`)
/// decryption paths.
#[derive(Clone)]
pub struct PaillierPrivateKey {
    p: BigUint,
    q: BigUint,
    pp: BigUint,
    qq: BigUint,
    hp: BigUint,
    hq: BigUint,
    p_inv_q: BigUint,
    lambda: BigUint,
    mu: BigUint,
    public_key: PaillierPublicKey,
}

impl Debug for PaillierPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaillierPrivateKey")
            .field("factors", &"[redacted]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl PaillierPrivateKey {
    /// Generates a key pair whose modulus has exactly `strength` bits.
    ///
    /// Each prime candidate is subjected to `rounds` Miller-Rabin rounds.
    #[instrument(skip_all, err(Debug))]
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        strength: usize,
        rounds: usize,
    ) -> Result<Self> {
        Self::generate_with_config(
            rng,
            &SigningConfig::default()
                .with_paillier_strength(strength)
                .with_primality_rounds(rounds)
                .with_parallel_prime_generation(false),
        )
    }

    /// Generates a key pair as described by `config`.
    #[instrument(skip_all, err(Debug))]
    pub fn generate_with_config<R: RngCore + CryptoRng>(
        rng: &mut R,
        config: &SigningConfig,
    ) -> Result<Self> {
        config.validate()?;
        let prime_bits = config.paillier_strength / 2;
        debug!(
            "Generating a {}-bit Paillier modulus",
            config.paillier_strength
        );

        for _ in 0..CRYPTOGRAPHIC_RETRY_MAX {
            let (p, q) = if config.parallel_prime_generation {
                prime_pair_in_parallel(rng, prime_bits, config.primality_rounds)?
            } else {
                (
                    prime_gen::random_prime(rng, prime_bits, config.primality_rounds)?,
                    prime_gen::random_prime(rng, prime_bits, config.primality_rounds)?,
                )
            };
            if p != q {
                return Self::from_distinct_primes(p, q);
            }
        }
        error!("Prime generation kept producing identical primes");
        Err(InternalError::InternalInvariantFailed)
    }

    /// Builds a key pair from two known primes.
    ///
    /// The primes are checked with a few Miller-Rabin rounds; equal or
    /// composite inputs are rejected.
    pub fn from_primes(p: BigUint, q: BigUint) -> Result<Self> {
        if p == q {
            return arg_err!("Paillier primes must be distinct");
        }
        if p < BigUint::from(3u8) || q < BigUint::from(3u8) {
            return arg_err!("Paillier factors must be odd primes");
        }
        let mut rng = rand::rngs::OsRng;
        if !prime_gen::is_probable_prime(&mut rng, &p, IMPORTED_PRIME_ROUNDS)
            || !prime_gen::is_probable_prime(&mut rng, &q, IMPORTED_PRIME_ROUNDS)
        {
            error!("Refusing to build a Paillier key from a composite factor");
            return arg_err!("Paillier factors must be prime");
        }
        Self::from_distinct_primes(p, q)
    }

    fn from_distinct_primes(p: BigUint, q: BigUint) -> Result<Self> {
        let n = &p * &q;
        let public_key = PaillierPublicKey::new(n)?;
        let one = BigUint::one();

        let p_minus_one = &p - &one;
        let q_minus_one = &q - &one;
        let pp = &p * &p;
        let qq = &q * &q;

        // hp = L_p(g^(p-1) mod p²)⁻¹ mod p, and likewise for q
        let hp = mod_inverse(
            &l_function(&modpow(&public_key.g, &p_minus_one, &pp), &p)?,
            &p,
        )?;
        let hq = mod_inverse(
            &l_function(&modpow(&public_key.g, &q_minus_one, &qq), &q)?,
            &q,
        )?;
        let p_inv_q = mod_inverse(&p, &q)?;

        let lambda = p_minus_one.lcm(&q_minus_one);
        let mu = mod_inverse(
            &l_function(&modpow(&public_key.g, &lambda, &public_key.nn), &public_key.n)?,
            &public_key.n,
        )?;

        Ok(Self {
            p,
            q,
            pp,
            qq,
            hp,
            hq,
            p_inv_q,
            lambda,
            mu,
            public_key,
        })
    }

    /// The matching public key.
    pub fn public_key(&self) -> &PaillierPublicKey {
        &self.public_key
    }

    /// Encrypts `m` under the matching public key.
    pub fn encrypt(&self, m: &BigUint) -> Result<PaillierCiphertext> {
        self.public_key.encrypt(m)
    }

    /// Decrypts `c` using the Chinese remainder theorem.
    ///
    /// The ciphertext's key is not compared with ours: decrypting a foreign
    /// ciphertext produces an unrelated plaintext rather than an error.
    #[cfg_attr(feature = "flame_it", flame("Paillier"))]
    pub fn decrypt(&self, c: &PaillierCiphertext) -> Result<BigUint> {
        let c = c.value() % &self.public_key.nn;
        let one = BigUint::one();

        let cp = modpow(&(&c % &self.pp), &(&self.p - &one), &self.pp);
        let mp = (l_function(&cp, &self.p)? * &self.hp) % &self.p;

        let cq = modpow(&(&c % &self.qq), &(&self.q - &one), &self.qq);
        let mq = (l_function(&cq, &self.q)? * &self.hq) % &self.q;

        // m = mp + p·((mq - mp)·p⁻¹ mod q), kept non-negative
        let diff = (&mq + &self.q - (&mp % &self.q)) % &self.q;
        let u = (diff * &self.p_inv_q) % &self.q;
        Ok(mp + u * &self.p)
    }

    /// Decrypts `c` as `L(c^λ mod n²)·μ mod n`.
    pub fn decrypt_direct(&self, c: &PaillierCiphertext) -> Result<BigUint> {
        let pk = &self.public_key;
        let c = c.value() % &pk.nn;
        let x = modpow(&c, &self.lambda, &pk.nn);
        Ok((l_function(&x, &pk.n)? * &self.mu) % &pk.n)
    }
}

/// Searches for two primes at once, each on its own thread with an RNG
/// seeded from `rng`.
fn prime_pair_in_parallel<R: RngCore + CryptoRng>(
    rng: &mut R,
    bits: usize,
    rounds: usize,
) -> Result<(BigUint, BigUint)> {
    let seed_rng = |rng: &mut R| {
        StdRng::from_rng(rng).map_err(|e| {
            error!("Could not seed a prime generation thread: {e}");
            InternalError::InternalInvariantFailed
        })
    };
    let mut rng_p = seed_rng(rng)?;
    let mut rng_q = seed_rng(rng)?;

    std::thread::scope(|scope| -> Result<(BigUint, BigUint)> {
        let p = scope.spawn(move || prime_gen::random_prime(&mut rng_p, bits, rounds));
        let q = scope.spawn(move || prime_gen::random_prime(&mut rng_q, bits, rounds));
        Ok((join_prime_thread(p)?, join_prime_thread(q)?))
    })
}

fn join_prime_thread(handle: ScopedJoinHandle<'_, Result<BigUint>>) -> Result<BigUint> {
    handle.join().map_err(|_| {
        error!("A prime generation thread panicked");
        InternalError::InternalInvariantFailed
    })?
}
