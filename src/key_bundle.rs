// SPDX-License-Identifier: MIT OR Apache-2.0

//! Public key bundles users publish so others can encrypt towards them.
//!
//! A bundle carries the owner's long-term public keys next to a signed, medium-term pre-key and
//! optionally a single-use one-time pre-key. The pre-key signature must verify under the owner's
//! signing key before any key material from the bundle is used.
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::ed25519::{self, Ed25519Error};
use crate::crypto::x25519::{self, PUBLIC_KEY_SIZE};

/// UNIX timestamp in seconds (UTC).
pub type Timestamp = u64;

/// Default pre-key lifetime of 90 days.
const DEFAULT_LIFETIME: u64 = 60 * 60 * 24 * 90;

/// Returns the current UNIX timestamp in seconds.
pub(crate) fn unix_now() -> Result<Timestamp, SystemTimeError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Validity window of a pre-key, as absolute UNIX timestamps.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    not_before: Timestamp,
    not_after: Timestamp,
}

impl Lifetime {
    pub fn from_range(not_before: Timestamp, not_after: Timestamp) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    pub fn not_after(&self) -> Timestamp {
        self.not_after
    }

    /// Checks that the current time falls inside this validity window.
    pub fn verify(&self) -> Result<(), LifetimeError> {
        let now = unix_now()?;
        if now < self.not_before || now > self.not_after {
            return Err(LifetimeError::OutsideValidityWindow);
        }
        Ok(())
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("SystemTime before UNIX EPOCH!")
            .as_secs();
        Self {
            not_before: now,
            not_after: now + DEFAULT_LIFETIME,
        }
    }
}

#[derive(Debug, Error)]
pub enum LifetimeError {
    #[error("pre-key lifetime is expired or not yet valid")]
    OutsideValidityWindow,

    #[error(transparent)]
    SystemTime(#[from] SystemTimeError),
}

/// Pre-keys are identified by their public key.
pub type PreKeyId = x25519::PublicKey;

/// Medium-term X25519 pre-key with a validity window, to be signed by the owner's identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreKey(x25519::PublicKey, Lifetime);

impl PreKey {
    pub fn new(prekey: x25519::PublicKey, lifetime: Lifetime) -> Self {
        Self(prekey, lifetime)
    }

    pub fn key(&self) -> &x25519::PublicKey {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.0.as_bytes()
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.1
    }

    pub fn sign(&self, signing_key: &ed25519::PrivateKey) -> ed25519::Signature {
        signing_key.sign(self.as_bytes())
    }

    pub fn verify_lifetime(&self) -> Result<(), LifetimeError> {
        self.1.verify()
    }
}

/// Unique identifier of a user's one-time pre-key.
pub type OneTimePreKeyId = u64;

/// X25519 pre-key to be used exactly _once_.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimePreKey(x25519::PublicKey, OneTimePreKeyId);

impl OneTimePreKey {
    pub fn new(onetime_prekey: x25519::PublicKey, id: OneTimePreKeyId) -> Self {
        Self(onetime_prekey, id)
    }

    pub fn key(&self) -> &x25519::PublicKey {
        &self.0
    }

    pub fn id(&self) -> OneTimePreKeyId {
        self.1
    }
}

/// Public half of a user's cryptographic identity, published so others can issue grants to them.
///
/// Note that while pre-keys are signed, published bundles should additionally travel inside an
/// authenticated channel so the bundle as a whole cannot be replayed or impersonated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientKeyBundle {
    signing_key: ed25519::PublicKey,
    exchange_key: x25519::PublicKey,
    signed_prekey: PreKey,
    prekey_signature: ed25519::Signature,
    onetime_prekey: Option<OneTimePreKey>,
}

impl RecipientKeyBundle {
    pub fn new(
        signing_key: ed25519::PublicKey,
        exchange_key: x25519::PublicKey,
        signed_prekey: PreKey,
        prekey_signature: ed25519::Signature,
        onetime_prekey: Option<OneTimePreKey>,
    ) -> Self {
        Self {
            signing_key,
            exchange_key,
            signed_prekey,
            prekey_signature,
            onetime_prekey,
        }
    }

    /// Public signing key, used to verify capability tokens issued by this user.
    pub fn signing_key(&self) -> &ed25519::PublicKey {
        &self.signing_key
    }

    /// Long-term key-exchange key, used when wrapping file keys towards this user.
    pub fn exchange_key(&self) -> &x25519::PublicKey {
        &self.exchange_key
    }

    pub fn signed_prekey(&self) -> &PreKey {
        &self.signed_prekey
    }

    pub fn onetime_prekey(&self) -> Option<&OneTimePreKey> {
        self.onetime_prekey.as_ref()
    }

    /// Verifies the pre-key lifetime and its signature under the owner's signing key.
    pub fn verify(&self) -> Result<(), KeyBundleError> {
        // Check lifetime.
        self.signed_prekey.verify_lifetime()?;

        // Check signature.
        self.signing_key
            .verify(self.signed_prekey.as_bytes(), &self.prekey_signature)?;

        Ok(())
    }
}

/// Picks the pre-key with the longest remaining lifetime from a list, skipping invalid ones.
pub(crate) fn latest_prekey(prekeys: Vec<&PreKey>) -> Option<&PreKey> {
    prekeys
        .into_iter()
        .filter(|prekey| prekey.verify_lifetime().is_ok())
        .max_by(|a, b| {
            a.lifetime()
                .not_after()
                .cmp(&b.lifetime().not_after())
                .then_with(|| a.as_bytes().cmp(b.as_bytes()))
        })
}

#[derive(Debug, Error)]
pub enum KeyBundleError {
    #[error(transparent)]
    Ed25519(#[from] Ed25519Error),

    #[error(transparent)]
    Lifetime(#[from] LifetimeError),
}
