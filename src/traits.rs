// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces of the external collaborators the orchestrator is wired up with.
//!
//! Persistence and network transport are out of scope for the cryptographic core; they are
//! injected into [`crate::manager::FileManager`] through these traits. Trait methods are treated
//! as opaque remote operations which may fail; any failure aborts the running workflow without
//! partial state changes.
use std::error::Error;

use serde::{Deserialize, Serialize};

use crate::file_codec::{EncryptedFile, FileMeta};
use crate::key_bundle::RecipientKeyBundle;
use crate::pac::Pac;
use crate::{FileId, UserId};

/// Public record of another user, as served by the identity/persistence collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRecord {
    pub user_id: UserId,
    pub username: String,
    pub keys: RecipientKeyBundle,
}

/// Read-only lookup of other users' public key material.
pub trait RecipientDirectory {
    type Error: Error;

    /// Returns the public record of a user, or `None` when the user is unknown.
    fn recipient(&self, id: &UserId) -> Result<Option<RecipientRecord>, Self::Error>;
}

/// Remote storage for encrypted files and capability tokens.
pub trait FileTransport {
    type Error: Error;

    /// Stores an encrypted file and returns the identifier assigned to it.
    fn put_file(&mut self, file: &EncryptedFile, meta: &FileMeta) -> Result<FileId, Self::Error>;

    /// Fetches an encrypted file, or `None` when the id is unknown.
    fn get_file(&self, id: &FileId) -> Result<Option<EncryptedFile>, Self::Error>;

    /// Publishes a capability token so its recipient can discover it.
    fn put_pac(&mut self, pac: &Pac) -> Result<(), Self::Error>;

    /// Lists all tokens issued by the given user.
    fn list_issued_pacs(&self, user_id: &UserId) -> Result<Vec<Pac>, Self::Error>;

    /// Lists all tokens addressed to the given user.
    fn list_received_pacs(&self, user_id: &UserId) -> Result<Vec<Pac>, Self::Error>;
}
