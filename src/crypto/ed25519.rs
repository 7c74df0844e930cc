// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ed25519 signing keys and signatures.
//!
//! Used for the issuer signature on capability tokens and for signing published pre-keys. Key
//! exchange uses a separate X25519 key pair, see [`crate::crypto::x25519`].
use std::fmt;

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{Rng, RngError};
use crate::serde::{deserialize_hex, serialize_hex};

pub const PRIVATE_KEY_SIZE: usize = 32;

pub const PUBLIC_KEY_SIZE: usize = 32;

pub const SIGNATURE_SIZE: usize = 64;

/// Ed25519 signing key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(ed25519_dalek::SigningKey);

impl PrivateKey {
    /// Generates a fresh signing key.
    pub fn random(rng: &Rng) -> Result<Self, RngError> {
        Ok(Self::from_bytes(rng.random_bytes()?))
    }

    pub fn from_bytes(bytes: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; PRIVATE_KEY_SIZE] {
        self.0.as_bytes()
    }

    /// Returns the public counterpart of this signing key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Signs the given bytes, returning a 64-byte Ed25519 signature.
    pub fn sign(&self, bytes: &[u8]) -> Signature {
        Signature(self.0.sign(bytes))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not reveal secret values when printing debug info.
        f.debug_struct("PrivateKey").field("value", &"***").finish()
    }
}

impl Serialize for PrivateKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_hex(self.as_bytes(), serializer)
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = deserialize_hex(deserializer)?;
        let bytes: [u8; PRIVATE_KEY_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid ed25519 private key length"))?;
        Ok(Self::from_bytes(bytes))
    }
}

/// Ed25519 verifying key.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct PublicKey(ed25519_dalek::VerifyingKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_SIZE]) -> Result<Self, Ed25519Error> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|_| Ed25519Error::InvalidPublicKey)?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.0.as_bytes()
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Verifies a signature over the given bytes against this public key.
    pub fn verify(&self, bytes: &[u8], signature: &Signature) -> Result<(), Ed25519Error> {
        self.0
            .verify(bytes, &signature.0)
            .map_err(|_| Ed25519Error::VerificationFailed)
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
        serialize_hex(self.as_bytes(), serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = deserialize_hex(deserializer)?;
        let bytes: [u8; PUBLIC_KEY_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid ed25519 public key length"))?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Ed25519 signature.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(ed25519_dalek::Signature::from_bytes(&bytes))
    }

    pub fn to_bytes(self) -> [u8; SIGNATURE_SIZE] {
        self.0.to_bytes()
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_hex(&self.to_bytes(), serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = deserialize_hex(deserializer)?;
        let bytes: [u8; SIGNATURE_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid ed25519 signature length"))?;
        Ok(Self::from_bytes(bytes))
    }
}

#[derive(Debug, Error)]
pub enum Ed25519Error {
    #[error("invalid ed25519 public key")]
    InvalidPublicKey,

    #[error("signature does not match public key and bytes")]
    VerificationFailed,
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;

    use super::{Ed25519Error, PrivateKey};

    #[test]
    fn sign_and_verify() {
        let rng = Rng::from_seed([1; 32]);

        let private_key = PrivateKey::random(&rng).unwrap();
        let public_key = private_key.public_key();

        let signature = private_key.sign(b"grant access to report.pdf");
        assert!(
            public_key
                .verify(b"grant access to report.pdf", &signature)
                .is_ok()
        );
    }

    #[test]
    fn failed_verify() {
        let rng = Rng::from_seed([1; 32]);

        let private_key = PrivateKey::random(&rng).unwrap();
        let public_key = private_key.public_key();
        let signature = private_key.sign(b"grant access to report.pdf");

        let other_key = PrivateKey::random(&rng).unwrap();
        let other_signature = other_key.sign(b"grant access to report.pdf");

        // Wrong message.
        assert!(matches!(
            public_key.verify(b"grant access to notes.txt", &signature),
            Err(Ed25519Error::VerificationFailed)
        ));

        // Wrong public key.
        assert!(matches!(
            other_key
                .public_key()
                .verify(b"grant access to report.pdf", &signature),
            Err(Ed25519Error::VerificationFailed)
        ));

        // Wrong signature.
        assert!(matches!(
            public_key.verify(b"grant access to report.pdf", &other_signature),
            Err(Ed25519Error::VerificationFailed)
        ));
    }
}
