// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-recipient wrapping of file keys.
//!
//! ## Protocol
//!
//! The sender generates a fresh ephemeral X25519 key pair for every wrap, computes the
//! Diffie-Hellman shared secret with the recipient's long-term key-exchange key and derives a
//! symmetric wrapping key from it via HKDF under a dedicated context label. The file key is then
//! encrypted under the wrapping key with XChaCha20-Poly1305 and a random nonce.
//!
//! The ephemeral secret is dropped right after the agreement and never stored. Using a fresh
//! ephemeral pair per wrap keeps the wrapping step forward-secure and prevents correlating
//! multiple grants from the same sender through a shared public key.
//!
//! The recipient recomputes the same shared secret from their key-exchange secret and the
//! ephemeral public key delivered inside the capability token, re-derives the wrapping key and
//! opens the blob. Any authentication failure surfaces as one opaque [`KeyWrapError::UnwrapFailed`]
//! so unwrapping cannot be used as a decryption oracle.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::aead::{AEAD_KEY_SIZE, AEAD_NONCE_SIZE, aead_decrypt, aead_encrypt};
use crate::crypto::hkdf::hkdf;
use crate::crypto::x25519::{self, X25519Error};
use crate::crypto::{Rng, RngError};
use crate::file_codec::{FILE_KEY_SIZE, FileKey};

/// HKDF context label, separating the key-wrap derivation from every other use of the shared
/// secret.
const KEY_WRAP_INFO: &[u8] = b"filecap/v1/key-wrap";

/// A file key encrypted towards exactly one recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    ephemeral_key: x25519::PublicKey,
    #[serde(with = "serde_bytes")]
    ciphertext: Vec<u8>,
    #[serde(with = "serde_bytes")]
    nonce: [u8; AEAD_NONCE_SIZE],
}

impl WrappedKey {
    pub(crate) fn from_parts(
        ephemeral_key: x25519::PublicKey,
        ciphertext: Vec<u8>,
        nonce: [u8; AEAD_NONCE_SIZE],
    ) -> Self {
        Self {
            ephemeral_key,
            ciphertext,
            nonce,
        }
    }

    /// Sender's ephemeral public key, unique per wrap.
    pub fn ephemeral_key(&self) -> &x25519::PublicKey {
        &self.ephemeral_key
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn nonce(&self) -> &[u8; AEAD_NONCE_SIZE] {
        &self.nonce
    }
}

/// Wraps a file key towards a recipient's long-term key-exchange public key.
pub fn wrap(
    file_key: &FileKey,
    recipient_exchange_key: &x25519::PublicKey,
    rng: &Rng,
) -> Result<WrappedKey, KeyWrapError> {
    let ephemeral_secret = x25519::SecretKey::random(rng)?;
    let ephemeral_key = ephemeral_secret.public_key();

    let mut shared = ephemeral_secret.calculate_agreement(recipient_exchange_key)?;
    // The ephemeral secret must never be stored, it is zeroised on drop right after the
    // agreement.
    drop(ephemeral_secret);

    let mut wrapping_key: [u8; AEAD_KEY_SIZE] =
        hkdf(None, &shared, KEY_WRAP_INFO).map_err(|_| KeyWrapError::DerivationFailed)?;
    shared.zeroize();

    let nonce: [u8; AEAD_NONCE_SIZE] = rng.random_bytes()?;
    let result = aead_encrypt(&wrapping_key, file_key.as_bytes(), nonce, None);
    wrapping_key.zeroize();

    let ciphertext = result.map_err(|_| KeyWrapError::DerivationFailed)?;

    Ok(WrappedKey {
        ephemeral_key,
        ciphertext,
        nonce,
    })
}

/// Unwraps a file key with the recipient's long-term key-exchange secret.
///
/// By Diffie-Hellman symmetry this recomputes exactly the shared secret the sender derived from
/// the ephemeral secret and our public key. Fails with [`KeyWrapError::UnwrapFailed`] on any
/// tampering, wrong key or wrong nonce; the cause is deliberately not distinguished.
pub fn unwrap(
    wrapped: &WrappedKey,
    recipient_exchange_secret: &x25519::SecretKey,
) -> Result<FileKey, KeyWrapError> {
    let mut shared = recipient_exchange_secret
        .calculate_agreement(&wrapped.ephemeral_key)
        .map_err(|_| KeyWrapError::UnwrapFailed)?;
    let mut wrapping_key: [u8; AEAD_KEY_SIZE] =
        hkdf(None, &shared, KEY_WRAP_INFO).map_err(|_| KeyWrapError::UnwrapFailed)?;
    shared.zeroize();

    let result = aead_decrypt(&wrapping_key, &wrapped.ciphertext, wrapped.nonce, None);
    wrapping_key.zeroize();

    let mut plaintext = result.map_err(|_| KeyWrapError::UnwrapFailed)?;
    let bytes: [u8; FILE_KEY_SIZE] = match plaintext.as_slice().try_into() {
        Ok(bytes) => bytes,
        Err(_) => {
            plaintext.zeroize();
            return Err(KeyWrapError::UnwrapFailed);
        }
    };
    plaintext.zeroize();

    Ok(FileKey::from_bytes(bytes))
}

#[derive(Debug, Error)]
pub enum KeyWrapError {
    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    X25519(#[from] X25519Error),

    #[error("wrapping key could not be derived")]
    DerivationFailed,

    #[error("file key could not be unwrapped")]
    UnwrapFailed,
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;
    use crate::crypto::x25519::SecretKey;
    use crate::file_codec::FileKey;

    use super::{KeyWrapError, unwrap, wrap};

    #[test]
    fn wrap_unwrap_roundtrip() {
        let rng = Rng::from_seed([1; 32]);

        let recipient_secret = SecretKey::random(&rng).unwrap();
        let file_key = FileKey::from_rng(&rng).unwrap();

        let wrapped = wrap(&file_key, &recipient_secret.public_key(), &rng).unwrap();
        let unwrapped = unwrap(&wrapped, &recipient_secret).unwrap();

        assert_eq!(file_key, unwrapped);
    }

    #[test]
    fn fresh_ephemeral_per_wrap() {
        let rng = Rng::from_seed([1; 32]);

        let recipient_secret = SecretKey::random(&rng).unwrap();
        let file_key = FileKey::from_rng(&rng).unwrap();

        // Wrapping the same key twice for the same recipient never reuses the ephemeral pair and
        // thus never produces the same blob.
        let wrapped_1 = wrap(&file_key, &recipient_secret.public_key(), &rng).unwrap();
        let wrapped_2 = wrap(&file_key, &recipient_secret.public_key(), &rng).unwrap();

        assert_ne!(wrapped_1.ephemeral_key(), wrapped_2.ephemeral_key());
        assert_ne!(wrapped_1.ciphertext(), wrapped_2.ciphertext());
    }

    #[test]
    fn wrong_recipient_fails() {
        let rng = Rng::from_seed([1; 32]);

        let recipient_secret = SecretKey::random(&rng).unwrap();
        let other_secret = SecretKey::random(&rng).unwrap();
        let file_key = FileKey::from_rng(&rng).unwrap();

        let wrapped = wrap(&file_key, &recipient_secret.public_key(), &rng).unwrap();

        assert!(matches!(
            unwrap(&wrapped, &other_secret),
            Err(KeyWrapError::UnwrapFailed)
        ));
    }

    #[test]
    fn tampered_blob_fails() {
        let rng = Rng::from_seed([1; 32]);

        let recipient_secret = SecretKey::random(&rng).unwrap();
        let file_key = FileKey::from_rng(&rng).unwrap();

        let wrapped = wrap(&file_key, &recipient_secret.public_key(), &rng).unwrap();

        // Flip one bit in every byte position of the encrypted key blob.
        for index in 0..wrapped.ciphertext().len() {
            let mut tampered = wrapped.clone();
            tampered.ciphertext[index] ^= 1;
            assert!(matches!(
                unwrap(&tampered, &recipient_secret),
                Err(KeyWrapError::UnwrapFailed)
            ));
        }

        // Flip one bit in the nonce.
        let mut tampered = wrapped.clone();
        tampered.nonce[0] ^= 1;
        assert!(matches!(
            unwrap(&tampered, &recipient_secret),
            Err(KeyWrapError::UnwrapFailed)
        ));
    }
}
