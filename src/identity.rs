// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store for a user's own secret identity material.
//!
//! A user owns a long-term Ed25519 signing pair, a long-term X25519 key-exchange pair, one or
//! more signed pre-keys and optionally pre-published one-time pre-keys. Users should rotate
//! pre-keys in good time before their lifetime expires so others always find a valid bundle.
//!
//! All methods are pure functions over an explicit [`IdentityState`], returning updated state
//! where they mutate it. The state is serializable so a secure-storage collaborator can persist
//! it; the secret halves never leave this module in any other form.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::UserId;
use crate::crypto::x25519::{self, SHARED_SECRET_SIZE, X25519Error};
use crate::crypto::{Rng, RngError, ed25519};
use crate::key_bundle::{
    Lifetime, OneTimePreKey, OneTimePreKeyId, PreKey, PreKeyId, RecipientKeyBundle, latest_prekey,
};

/// Key store maintaining a user's secret identity material and generating signed public key
/// bundles from it.
#[derive(Clone, Debug)]
pub struct IdentityKeyStore;

/// Serializable state of the identity key store (for the secure-storage collaborator).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityState {
    user_id: UserId,
    username: String,
    signing_secret: ed25519::PrivateKey,
    signing_key: ed25519::PublicKey,
    exchange_secret: x25519::SecretKey,
    exchange_key: x25519::PublicKey,
    prekeys: HashMap<PreKeyId, PreKeyState>,
    onetime_secrets: HashMap<OneTimePreKeyId, (PreKeyId, x25519::SecretKey)>,
    onetime_next_id: OneTimePreKeyId,
}

impl IdentityState {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn signing_key(&self) -> &ed25519::PublicKey {
        &self.signing_key
    }

    pub fn exchange_key(&self) -> &x25519::PublicKey {
        &self.exchange_key
    }

    pub(crate) fn exchange_secret(&self) -> &x25519::SecretKey {
        &self.exchange_secret
    }

    fn latest_prekey(&self) -> Option<PreKeyState> {
        let prekeys = self.prekeys.values().map(|state| &state.prekey).collect();
        let latest = latest_prekey(prekeys);
        latest.map(|prekey| {
            self.prekeys
                .get(prekey.key())
                .expect("we know the item exists in the set")
                .clone()
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PreKeyState {
    prekey: PreKey,
    signature: ed25519::Signature,
    secret: x25519::SecretKey,
}

impl PreKeyState {
    fn init(
        signing_secret: &ed25519::PrivateKey,
        lifetime: Lifetime,
        rng: &Rng,
    ) -> Result<Self, IdentityError> {
        let secret = x25519::SecretKey::random(rng)?;
        let prekey = PreKey::new(secret.public_key(), lifetime);
        let signature = prekey.sign(signing_secret);

        Ok(Self {
            prekey,
            signature,
            secret,
        })
    }

    fn id(&self) -> PreKeyId {
        *self.prekey.key()
    }
}

impl IdentityKeyStore {
    /// Returns freshly initialised identity state: new signing and key-exchange pairs plus a
    /// first signed pre-key with the given lifetime.
    pub fn init(
        user_id: &UserId,
        username: &str,
        lifetime: Lifetime,
        rng: &Rng,
    ) -> Result<IdentityState, IdentityError> {
        let signing_secret = ed25519::PrivateKey::random(rng)?;
        let exchange_secret = x25519::SecretKey::random(rng)?;
        let prekey = PreKeyState::init(&signing_secret, lifetime, rng)?;

        Ok(IdentityState {
            user_id: user_id.clone(),
            username: username.to_string(),
            signing_key: signing_secret.public_key(),
            signing_secret,
            exchange_key: exchange_secret.public_key(),
            exchange_secret,
            prekeys: HashMap::from([(prekey.id(), prekey)]),
            onetime_secrets: HashMap::new(),
            onetime_next_id: 0,
        })
    }

    /// Signs a message with the identity's signing key.
    pub fn sign(y: &IdentityState, bytes: &[u8]) -> ed25519::Signature {
        y.signing_secret.sign(bytes)
    }

    /// Computes the Diffie-Hellman shared secret between our long-term exchange key and the given
    /// public key.
    pub fn shared_secret(
        y: &IdentityState,
        their_public_key: &x25519::PublicKey,
    ) -> Result<[u8; SHARED_SECRET_SIZE], IdentityError> {
        Ok(y.exchange_secret.calculate_agreement(their_public_key)?)
    }

    /// Returns the latest public key bundle which can be published on the network.
    ///
    /// Bundles can expire with their pre-key lifetime, in which case this method returns an error
    /// and a new pre-key needs to be generated with [`IdentityKeyStore::rotate_prekey`].
    pub fn public_bundle(y: &IdentityState) -> Result<RecipientKeyBundle, IdentityError> {
        let latest = y.latest_prekey().ok_or(IdentityError::NoPreKeyAvailable)?;
        Ok(RecipientKeyBundle::new(
            y.signing_key,
            y.exchange_key,
            latest.prekey,
            latest.signature,
            None,
        ))
    }

    /// Generates a new signed pre-key with the given lifetime.
    pub fn rotate_prekey(
        mut y: IdentityState,
        lifetime: Lifetime,
        rng: &Rng,
    ) -> Result<IdentityState, IdentityError> {
        let prekey = PreKeyState::init(&y.signing_secret, lifetime, rng)?;
        y.prekeys.insert(prekey.id(), prekey);
        Ok(y)
    }

    /// Creates a public key bundle containing a fresh one-time pre-key.
    ///
    /// The secret half stays inside the state until consumed once with
    /// [`IdentityKeyStore::use_onetime_secret`].
    pub fn generate_onetime_bundle(
        mut y: IdentityState,
        rng: &Rng,
    ) -> Result<(IdentityState, RecipientKeyBundle), IdentityError> {
        let latest = y.latest_prekey().ok_or(IdentityError::NoPreKeyAvailable)?;

        let onetime_secret = x25519::SecretKey::random(rng)?;
        let onetime_key = OneTimePreKey::new(onetime_secret.public_key(), y.onetime_next_id);

        {
            let existing_key = y
                .onetime_secrets
                .insert(onetime_key.id(), (latest.id(), onetime_secret));
            // Sanity check.
            assert!(
                existing_key.is_none(),
                "should never insert same id more than once"
            );
        };

        let bundle = RecipientKeyBundle::new(
            y.signing_key,
            y.exchange_key,
            latest.prekey,
            latest.signature,
            Some(onetime_key),
        );

        y.onetime_next_id += 1;

        Ok((y, bundle))
    }

    /// Removes and returns a one-time pre-key secret, making it unavailable for any further use.
    ///
    /// Throws an error when the requested secret is unknown (and thus probably was already used
    /// once).
    pub fn use_onetime_secret(
        mut y: IdentityState,
        id: OneTimePreKeyId,
    ) -> Result<(IdentityState, x25519::SecretKey), IdentityError> {
        match y.onetime_secrets.remove(&id) {
            Some((_, secret)) => Ok((y, secret)),
            None => Err(IdentityError::UnknownOneTimeSecret(id)),
        }
    }

    /// Remove all expired pre-keys and the one-time pre-keys depending on them.
    pub fn remove_expired(mut y: IdentityState) -> IdentityState {
        y.prekeys = y
            .prekeys
            .into_iter()
            .filter(|(_, prekey)| prekey.prekey.verify_lifetime().is_ok())
            .collect();

        y.onetime_secrets = y
            .onetime_secrets
            .into_iter()
            .filter(|(_, (prekey_id, _))| y.prekeys.contains_key(prekey_id))
            .collect();

        y
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    X25519(#[from] X25519Error),

    #[error("could not find one-time pre-key secret with id {0}")]
    UnknownOneTimeSecret(OneTimePreKeyId),

    #[error("no valid pre-keys available, they are either expired or too early")]
    NoPreKeyAvailable,
}
