// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end encrypted file sharing with signed, time-bounded capability tokens.
//!
//! Every user holds a long-term identity made of an Ed25519 signing key and an X25519 exchange
//! key. Files are encrypted once under a random symmetric key; access is granted per recipient by
//! wrapping that key towards the recipient's exchange key with a fresh ephemeral key pair and
//! embedding the result in a PAC, a pre-authorized capability token signed by the issuer and only
//! valid until its expiry timestamp.
//!
//! Servers and relays observe ciphertext and tokens, never plaintext or file keys. A token is
//! useless to anyone but the addressed recipient since recovering the file key requires their
//! exchange secret.
//!
//! The building blocks are deliberately small and composable:
//!
//! - [`identity`] manages long-term key pairs, signed prekeys and one-time prekeys as pure
//!   functions over an explicit, serializable state.
//! - [`file_codec`] encrypts and decrypts file contents with authenticated metadata.
//! - [`key_wrap`] wraps a file key towards a recipient using an ephemeral Diffie-Hellman exchange.
//! - [`pac`] issues, verifies and redeems capability tokens.
//! - [`manager`] composes the above with pluggable [`traits`] collaborators into the upload and
//!   download workflows.
pub mod cbor;
pub mod crypto;
pub mod file_codec;
pub mod identity;
pub mod key_bundle;
pub mod key_wrap;
pub mod manager;
pub mod pac;
mod serde;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod traits;

/// Identifier of a user, unique within a deployment.
pub type UserId = String;

/// Identifier of an uploaded file, assigned by the transport.
pub type FileId = String;

pub use crypto::Rng;
pub use file_codec::{EncryptedFile, FileKey, FileMeta};
pub use identity::{IdentityKeyStore, IdentityState};
pub use key_bundle::{Lifetime, RecipientKeyBundle, Timestamp};
pub use manager::{FileManager, FileRecord, ManagerError};
pub use pac::{Pac, PacError};
pub use traits::{FileTransport, RecipientDirectory, RecipientRecord};
