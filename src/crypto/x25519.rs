// SPDX-License-Identifier: MIT OR Apache-2.0

//! X25519 key pairs and Diffie-Hellman key agreement.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::secret::Secret;
use crate::crypto::{Rng, RngError};
use crate::serde::{deserialize_hex, serialize_hex};

pub const SECRET_KEY_SIZE: usize = 32;

pub const PUBLIC_KEY_SIZE: usize = 32;

pub const SHARED_SECRET_SIZE: usize = 32;

/// X25519 secret key for key agreement.
///
/// The raw scalar bytes are held in a [`Secret`] container and are never exposed outside the
/// crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey(Secret<SECRET_KEY_SIZE>);

impl SecretKey {
    /// Generates a fresh secret key.
    pub fn random(rng: &Rng) -> Result<Self, RngError> {
        Ok(Self(Secret::random(rng)?))
    }

    pub fn from_bytes(bytes: [u8; SECRET_KEY_SIZE]) -> Self {
        Self(Secret::from_bytes(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; SECRET_KEY_SIZE] {
        self.0.as_bytes()
    }

    /// Returns the public counterpart of this secret key.
    pub fn public_key(&self) -> PublicKey {
        let secret = x25519_dalek::StaticSecret::from(*self.as_bytes());
        PublicKey(x25519_dalek::PublicKey::from(&secret).to_bytes())
    }

    /// Computes the Diffie-Hellman shared secret between our secret key and their public key.
    ///
    /// Rejects non-contributory exchanges (all-zero shared secrets from low-order public keys).
    pub fn calculate_agreement(
        &self,
        their_public_key: &PublicKey,
    ) -> Result<[u8; SHARED_SECRET_SIZE], X25519Error> {
        let secret = x25519_dalek::StaticSecret::from(*self.as_bytes());
        let shared =
            secret.diffie_hellman(&x25519_dalek::PublicKey::from(their_public_key.to_bytes()));
        if !shared.was_contributory() {
            return Err(X25519Error::NonContributory);
        }
        Ok(*shared.as_bytes())
    }
}

/// X25519 public key.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = X25519Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; PUBLIC_KEY_SIZE] = value
            .try_into()
            .map_err(|_| X25519Error::InvalidLength(value.len(), PUBLIC_KEY_SIZE))?;
        Ok(Self(bytes))
    }
}

impl FromStr for PublicKey {
    type Err = X25519Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::try_from(hex::decode(value)?.as_slice())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = deserialize_hex(deserializer)?;
        Self::try_from(bytes.as_slice()).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error)]
pub enum X25519Error {
    #[error("non-contributory x25519 key exchange")]
    NonContributory,

    #[error("invalid public key length {0}, expected {1}")]
    InvalidLength(usize, usize),

    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;

    use super::SecretKey;

    #[test]
    fn agreement_is_symmetric() {
        let rng = Rng::from_seed([1; 32]);

        let alice_secret = SecretKey::random(&rng).unwrap();
        let bob_secret = SecretKey::random(&rng).unwrap();

        let alice_shared = alice_secret
            .calculate_agreement(&bob_secret.public_key())
            .unwrap();
        let bob_shared = bob_secret
            .calculate_agreement(&alice_secret.public_key())
            .unwrap();

        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn different_peers_different_secrets() {
        let rng = Rng::from_seed([1; 32]);

        let our_secret = SecretKey::random(&rng).unwrap();
        let peer_1 = SecretKey::random(&rng).unwrap();
        let peer_2 = SecretKey::random(&rng).unwrap();

        let shared_1 = our_secret.calculate_agreement(&peer_1.public_key()).unwrap();
        let shared_2 = our_secret.calculate_agreement(&peer_2.public_key()).unwrap();

        assert_ne!(shared_1, shared_2);
    }
}
