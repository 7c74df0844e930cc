// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated encryption with associated data (AEAD) using XChaCha20-Poly1305.
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use thiserror::Error;

/// 256-bit key.
pub const AEAD_KEY_SIZE: usize = 32;

/// 192-bit nonce.
///
/// The extended nonce of XChaCha20 is large enough that randomly generated nonces are safe, as
/// long as keys are not reused excessively. In this crate every file and every wrapped key gets a
/// freshly generated key, so a random nonce per encryption never repeats under the same key.
pub const AEAD_NONCE_SIZE: usize = 24;

/// Encrypts plaintext with the given key and nonce, binding the optional associated data into the
/// authentication tag.
pub fn aead_encrypt(
    key: &[u8; AEAD_KEY_SIZE],
    plaintext: &[u8],
    nonce: [u8; AEAD_NONCE_SIZE],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>, AeadError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: aad.unwrap_or_default(),
            },
        )
        .map_err(|_| AeadError::EncryptionFailed)?;
    Ok(ciphertext)
}

/// Decrypts ciphertext and verifies its authentication tag, including associated data.
///
/// Fails on any modification of ciphertext, key, nonce or associated data. The error is the same
/// for every failure cause to avoid leaking an oracle.
pub fn aead_decrypt(
    key: &[u8; AEAD_KEY_SIZE],
    ciphertext: &[u8],
    nonce: [u8; AEAD_NONCE_SIZE],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>, AeadError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let plaintext = cipher
        .decrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: ciphertext,
                aad: aad.unwrap_or_default(),
            },
        )
        .map_err(|_| AeadError::DecryptionFailed)?;
    Ok(plaintext)
}

#[derive(Debug, Error)]
pub enum AeadError {
    #[error("aead encryption failed")]
    EncryptionFailed,

    #[error("aead decryption failed")]
    DecryptionFailed,
}
