// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Party1's key shares, one per client wallet.
//!
//! Entries are keyed by the client's address and never change once written:
//! the only mutation is [`KeyShareStore::insert_if_absent`].

use crate::{
    errors::{InternalError, Result},
    keyshare::KeyShare,
};
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::RwLock,
};
use tracing::{debug, error};

/// Where Party1 keeps the key shares of the wallets it serves.
pub trait KeyShareStore: Send + Sync {
    /// The key share registered for `client_id`, if any.
    fn get(&self, client_id: &str) -> Result<Option<KeyShare>>;

    /// Registers `share` for `client_id` unless a share is already
    /// registered, and returns whichever share is registered afterwards.
    fn insert_if_absent(&self, client_id: &str, share: KeyShare) -> Result<KeyShare>;
}

/// A [`KeyShareStore`] that lives in memory.
#[derive(Debug, Default)]
pub struct InMemoryKeyShareStore(RwLock<HashMap<String, KeyShare>>);

impl InMemoryKeyShareStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered wallets.
    pub fn len(&self) -> Result<usize> {
        Ok(self.0.read().map_err(|_| poisoned())?.len())
    }

    /// Whether no wallet is registered.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned() -> InternalError {
    error!("Key share store lock is poisoned");
    InternalError::InternalInvariantFailed
}

impl KeyShareStore for InMemoryKeyShareStore {
    fn get(&self, client_id: &str) -> Result<Option<KeyShare>> {
        Ok(self.0.read().map_err(|_| poisoned())?.get(client_id).cloned())
    }

    fn insert_if_absent(&self, client_id: &str, share: KeyShare) -> Result<KeyShare> {
        let mut map = self.0.write().map_err(|_| poisoned())?;
        match map.entry(client_id.to_string()) {
            Entry::Occupied(existing) => {
                debug!("Wallet for {client_id} already exists");
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                debug!("Registering wallet for {client_id}");
                Ok(slot.insert(share).clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::init_testing;
    use std::sync::Arc;

    #[test]
    fn first_insert_wins() {
        let mut rng = init_testing();
        let store = InMemoryKeyShareStore::new();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.get("alice").unwrap(), None);

        let first = KeyShare::generate(&mut rng);
        let second = KeyShare::generate(&mut rng);
        assert_eq!(store.insert_if_absent("alice", first.clone()).unwrap(), first);
        assert_eq!(store.insert_if_absent("alice", second.clone()).unwrap(), first);
        assert_eq!(store.get("alice").unwrap(), Some(first));

        assert_eq!(store.insert_if_absent("bob", second.clone()).unwrap(), second);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn concurrent_registrations_agree() {
        let store = Arc::new(InMemoryKeyShareStore::new());
        let winners: Vec<KeyShare> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = Arc::clone(&store);
                    scope.spawn(move || {
                        let mut rng = init_testing();
                        store
                            .insert_if_absent("shared", KeyShare::generate(&mut rng))
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(winners.iter().all(|w| *w == winners[0]));
        assert_eq!(store.len().unwrap(), 1);
    }
}
