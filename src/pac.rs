// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pre-Authorized Capability tokens (PACs).
//!
//! A PAC is a signed, time-bounded grant letting exactly one recipient decrypt exactly one file.
//! It binds the file identity, the recipient identity, a validity window and the wrapped file key
//! under the issuer's Ed25519 signature.
//!
//! ## Canonical signing encoding
//!
//! The signature covers the deterministic CBOR encoding of a fixed-order tuple of all fields
//! except the signature itself. CBOR length-prefixes every element, so the encoding is injective
//! and no field boundary ambiguity exists. Verifiers recompute the encoding from the received
//! fields; altering any field after signing invalidates the token.
//!
//! A token is only usable while `now <= valid_until`. Verification outcomes are recomputed on
//! every check and never cached: a PAC that was valid yesterday can be expired today.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cbor::{EncodeError, encode_cbor};
use crate::crypto::aead::AEAD_NONCE_SIZE;
use crate::crypto::x25519;
use crate::crypto::{Rng, ed25519};
use crate::file_codec::{FileKey, FileMeta};
use crate::identity::{IdentityKeyStore, IdentityState};
use crate::key_bundle::Timestamp;
use crate::key_wrap::{self, KeyWrapError, WrappedKey};
use crate::traits::RecipientRecord;
use crate::{FileId, UserId};

/// Signed capability token granting one recipient access to one file until `valid_until`.
///
/// The token does not own the file; it references it by id, to be resolved through the transport
/// collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pac {
    recipient_id: UserId,
    file_id: FileId,
    valid_until: Timestamp,
    #[serde(with = "serde_bytes")]
    encrypted_file_key: Vec<u8>,
    #[serde(with = "serde_bytes")]
    key_nonce: [u8; AEAD_NONCE_SIZE],
    sender_ephemeral_key: x25519::PublicKey,
    issuer_id: UserId,
    filename: String,
    mime_type: String,
    issuer_name: String,
    recipient_name: String,
    signature: ed25519::Signature,
}

impl Pac {
    pub fn recipient_id(&self) -> &UserId {
        &self.recipient_id
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    pub fn issuer_id(&self) -> &UserId {
        &self.issuer_id
    }

    pub fn valid_until(&self) -> Timestamp {
        self.valid_until
    }

    /// Sender's ephemeral public key used for this grant, unique per token.
    pub fn sender_ephemeral_key(&self) -> &x25519::PublicKey {
        &self.sender_ephemeral_key
    }

    pub fn encrypted_file_key(&self) -> &[u8] {
        &self.encrypted_file_key
    }

    /// File metadata carried in the token, matching the associated data the file was encrypted
    /// with.
    pub fn file_meta(&self) -> FileMeta {
        FileMeta {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
        }
    }

    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    pub fn recipient_name(&self) -> &str {
        &self.recipient_name
    }

    /// Canonical byte encoding the signature is computed over: a fixed-order CBOR tuple of all
    /// non-signature fields.
    fn signing_payload(&self) -> Result<Vec<u8>, EncodeError> {
        encode_cbor(&(
            &self.recipient_id,
            &self.file_id,
            self.valid_until,
            serde_bytes::Bytes::new(&self.encrypted_file_key),
            serde_bytes::Bytes::new(&self.key_nonce),
            &self.sender_ephemeral_key,
            &self.issuer_id,
            &self.filename,
            &self.mime_type,
            &self.issuer_name,
            &self.recipient_name,
        ))
    }
}

/// Issues a new capability token for a file towards one recipient.
///
/// Wraps the file key for the recipient with a fresh ephemeral key pair, fills in all token
/// fields and signs their canonical encoding with the issuer's signing key.
pub fn issue(
    issuer: &IdentityState,
    recipient: &RecipientRecord,
    file_id: &FileId,
    file_key: &FileKey,
    meta: &FileMeta,
    valid_until: Timestamp,
    rng: &Rng,
) -> Result<Pac, PacError> {
    let wrapped = key_wrap::wrap(file_key, recipient.keys.exchange_key(), rng)?;

    let mut pac = Pac {
        recipient_id: recipient.user_id.clone(),
        file_id: file_id.clone(),
        valid_until,
        encrypted_file_key: wrapped.ciphertext().to_vec(),
        key_nonce: *wrapped.nonce(),
        sender_ephemeral_key: *wrapped.ephemeral_key(),
        issuer_id: issuer.user_id().clone(),
        filename: meta.filename.clone(),
        mime_type: meta.mime_type.clone(),
        issuer_name: issuer.username().to_string(),
        recipient_name: recipient.username.clone(),
        // Placeholder until the canonical encoding is signed below.
        signature: ed25519::Signature::from_bytes([0; ed25519::SIGNATURE_SIZE]),
    };

    let payload = pac.signing_payload()?;
    pac.signature = IdentityKeyStore::sign(issuer, &payload);

    Ok(pac)
}

/// Verifies a capability token against the issuer's public signing key and the current time.
///
/// Both checks always run from the token's fields. A bad signature reports
/// [`PacError::SignatureInvalid`] regardless of expiry; an expired token with a correct signature
/// reports [`PacError::Expired`] so callers can request reissuance, but must never be trusted.
pub fn verify(
    pac: &Pac,
    issuer_signing_key: &ed25519::PublicKey,
    now: Timestamp,
) -> Result<(), PacError> {
    let payload = pac.signing_payload()?;
    issuer_signing_key
        .verify(&payload, &pac.signature)
        .map_err(|_| PacError::SignatureInvalid)?;

    if now > pac.valid_until {
        return Err(PacError::Expired);
    }

    Ok(())
}

/// Recovers the file key from a verified token with the recipient's key-exchange secret.
///
/// Callers must have verified the token first; this operation does not re-check signature or
/// expiry.
pub fn recover_file_key(
    pac: &Pac,
    recipient_exchange_secret: &x25519::SecretKey,
) -> Result<FileKey, PacError> {
    let wrapped = WrappedKey::from_parts(
        pac.sender_ephemeral_key,
        pac.encrypted_file_key.clone(),
        pac.key_nonce,
    );
    Ok(key_wrap::unwrap(&wrapped, recipient_exchange_secret)?)
}

#[derive(Debug, Error)]
pub enum PacError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    KeyWrap(#[from] KeyWrapError),

    #[error("capability token signature is invalid")]
    SignatureInvalid,

    #[error("capability token is expired")]
    Expired,
}
