// SPDX-License-Identifier: MIT OR Apache-2.0

//! File content encryption and decryption.
//!
//! Every file is encrypted under its own freshly generated 256-bit [`FileKey`] with
//! XChaCha20-Poly1305. The file metadata (filename and MIME type) is not secret but
//! integrity-bound into the ciphertext as associated data, so a tampered filename or MIME type
//! makes decryption fail.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cbor::{EncodeError, encode_cbor};
use crate::crypto::aead::{AEAD_NONCE_SIZE, AeadError, aead_decrypt, aead_encrypt};
use crate::crypto::sha2::{SHA256_DIGEST_SIZE, sha2_256};
use crate::crypto::{Rng, RngError, Secret};

/// 256-bit symmetric file key.
pub const FILE_KEY_SIZE: usize = 32;

/// Public identifier of a file key. This is the SHA256 digest of the key itself.
pub type FileKeyId = [u8; SHA256_DIGEST_SIZE];

/// Symmetric key a single file is encrypted under.
///
/// Created at encryption time, lives only in memory and is handed to recipients exclusively in
/// wrapped form inside a capability token. It is never persisted unwrapped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileKey(Secret<FILE_KEY_SIZE>);

impl FileKey {
    /// Generates a fresh random file key.
    pub fn from_rng(rng: &Rng) -> Result<Self, RngError> {
        Ok(Self(Secret::random(rng)?))
    }

    pub(crate) fn from_bytes(bytes: [u8; FILE_KEY_SIZE]) -> Self {
        Self(Secret::from_bytes(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; FILE_KEY_SIZE] {
        self.0.as_bytes()
    }

    /// Returns identifier (SHA256 hash) for this key.
    pub fn id(&self) -> FileKeyId {
        sha2_256(&[self.0.as_bytes()])
    }
}

/// Non-secret file metadata, authenticated alongside the encrypted contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub filename: String,
    pub mime_type: String,
}

/// Encrypted file contents together with the nonce used for the encryption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedFile {
    #[serde(with = "serde_bytes")]
    ciphertext: Vec<u8>,
    #[serde(with = "serde_bytes")]
    nonce: [u8; AEAD_NONCE_SIZE],
}

impl EncryptedFile {
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn nonce(&self) -> &[u8; AEAD_NONCE_SIZE] {
        &self.nonce
    }
}

/// Encrypts file contents under a freshly generated key, binding the metadata as associated data.
///
/// Returns the ciphertext and the key; the key is wrapped per-recipient by the key-wrap layer and
/// must not outlive the session otherwise.
pub fn encrypt(
    plaintext: &[u8],
    meta: &FileMeta,
    rng: &Rng,
) -> Result<(EncryptedFile, FileKey), FileCodecError> {
    let file_key = FileKey::from_rng(rng)?;
    let nonce: [u8; AEAD_NONCE_SIZE] = rng.random_bytes()?;
    let aad = encode_cbor(meta)?;

    let ciphertext = aead_encrypt(file_key.as_bytes(), plaintext, nonce, Some(&aad))?;

    Ok((EncryptedFile { ciphertext, nonce }, file_key))
}

/// Decrypts file contents with a recovered file key, verifying integrity of contents and
/// metadata.
pub fn decrypt(
    encrypted: &EncryptedFile,
    file_key: &FileKey,
    meta: &FileMeta,
) -> Result<Vec<u8>, FileCodecError> {
    let aad = encode_cbor(meta)?;
    aead_decrypt(
        file_key.as_bytes(),
        &encrypted.ciphertext,
        encrypted.nonce,
        Some(&aad),
    )
    .map_err(|_| FileCodecError::DecryptionFailed)
}

#[derive(Debug, Error)]
pub enum FileCodecError {
    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Aead(#[from] AeadError),

    #[error("file contents could not be decrypted")]
    DecryptionFailed,
}
