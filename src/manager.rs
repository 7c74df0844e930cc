// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestrator composing identity, key wrapping, tokens and the file codec into the two
//! end-to-end workflows: encrypt-and-issue (upload) and verify-and-decrypt (download).
//!
//! The manager is wired up with its collaborators through explicit injection; it holds no global
//! state. The session-local collections (`files`, `issued_pacs`, `received_pacs`) are updated
//! all-or-nothing: a workflow either completes and commits its results in one step, or fails and
//! leaves the session untouched. Writes require single-writer discipline, wrap the manager in a
//! mutex when sharing it across threads.
use std::time::SystemTimeError;

use thiserror::Error;
use tracing::{debug, warn};

use crate::crypto::Rng;
use crate::file_codec::{self, FileCodecError, FileMeta};
use crate::identity::{IdentityError, IdentityState};
use crate::key_bundle::{Timestamp, unix_now};
use crate::pac::{self, Pac, PacError};
use crate::traits::{FileTransport, RecipientDirectory};
use crate::{FileId, UserId};

/// Session-local record of a file this user uploaded or downloaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub file_id: FileId,
    pub meta: FileMeta,
    pub size: usize,
}

/// Orchestrator for encrypted file sharing within one user session.
#[derive(Debug)]
pub struct FileManager<D, T> {
    directory: D,
    transport: T,
    files: Vec<FileRecord>,
    issued_pacs: Vec<Pac>,
    received_pacs: Vec<Pac>,
}

impl<D, T> FileManager<D, T>
where
    D: RecipientDirectory,
    T: FileTransport,
{
    pub fn new(directory: D, transport: T) -> Self {
        Self {
            directory,
            transport,
            files: Vec::new(),
            issued_pacs: Vec::new(),
            received_pacs: Vec::new(),
        }
    }

    /// Files uploaded or downloaded in this session.
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Capability tokens issued by this user in this session.
    pub fn issued_pacs(&self) -> &[Pac] {
        &self.issued_pacs
    }

    /// Capability tokens addressed to this user, as of the last refresh.
    pub fn received_pacs(&self) -> &[Pac] {
        &self.received_pacs
    }

    /// Encrypts file contents and grants access to each recipient with a signed token valid for
    /// `valid_for` seconds from now.
    ///
    /// Each recipient's public key bundle is looked up and verified, and the file key is wrapped
    /// towards them with a fresh ephemeral key pair. Ciphertext and tokens are handed to the
    /// transport; the session state is only updated once everything succeeded.
    pub fn upload_file(
        &mut self,
        identity: &IdentityState,
        contents: &[u8],
        meta: FileMeta,
        recipients: &[UserId],
        valid_for: u64,
        rng: &Rng,
    ) -> Result<FileId, ManagerError> {
        let now = unix_now()?;
        let valid_until: Timestamp = now.checked_add(valid_for).ok_or(
            ManagerError::MalformedInput("validity window overflows the timestamp range"),
        )?;

        let (encrypted, file_key) = file_codec::encrypt(contents, &meta, rng)?;

        let file_id = self
            .transport
            .put_file(&encrypted, &meta)
            .map_err(|err| ManagerError::TransportFailed(err.to_string()))?;

        let mut issued = Vec::with_capacity(recipients.len());
        for recipient_id in recipients {
            let record = self
                .directory
                .recipient(recipient_id)
                .map_err(|err| ManagerError::TransportFailed(err.to_string()))?
                .ok_or_else(|| ManagerError::KeyUnavailable(recipient_id.clone()))?;

            if let Err(err) = record.keys.verify() {
                warn!(recipient = %recipient_id, "rejecting recipient with invalid key bundle");
                return Err(ManagerError::InvalidKeyBundle(recipient_id.clone(), err.to_string()));
            }

            let pac = pac::issue(
                identity,
                &record,
                &file_id,
                &file_key,
                &meta,
                valid_until,
                rng,
            )?;
            self.transport
                .put_pac(&pac)
                .map_err(|err| ManagerError::TransportFailed(err.to_string()))?;
            issued.push(pac);
        }

        debug!(
            file = %file_id,
            recipients = issued.len(),
            "encrypted and shared file"
        );

        // Commit to the session only after every step succeeded.
        self.files.push(FileRecord {
            file_id: file_id.clone(),
            meta,
            size: contents.len(),
        });
        self.issued_pacs.extend(issued);

        Ok(file_id)
    }

    /// Verifies an inbound token, recovers the file key and decrypts the referenced file.
    ///
    /// Fails closed: an invalid or expired token aborts before any key material is touched and
    /// before the ciphertext is fetched. On success the file is appended to the session's `files`
    /// list; on failure no session state changes.
    pub fn download_file(
        &mut self,
        identity: &IdentityState,
        pac: &Pac,
    ) -> Result<Vec<u8>, ManagerError> {
        let now = unix_now()?;

        let issuer = self
            .directory
            .recipient(pac.issuer_id())
            .map_err(|err| ManagerError::TransportFailed(err.to_string()))?
            .ok_or_else(|| ManagerError::KeyUnavailable(pac.issuer_id().clone()))?;

        pac::verify(pac, issuer.keys.signing_key(), now)?;

        let file_key = pac::recover_file_key(pac, identity.exchange_secret())?;

        let encrypted = self
            .transport
            .get_file(pac.file_id())
            .map_err(|err| ManagerError::TransportFailed(err.to_string()))?
            .ok_or_else(|| ManagerError::FileUnavailable(pac.file_id().clone()))?;

        let meta = pac.file_meta();
        let contents = file_codec::decrypt(&encrypted, &file_key, &meta)?;

        debug!(file = %pac.file_id(), issuer = %pac.issuer_id(), "downloaded and decrypted file");

        self.files.push(FileRecord {
            file_id: pac.file_id().clone(),
            meta,
            size: contents.len(),
        });

        Ok(contents)
    }

    /// Reloads the issued and received token lists for this user from the transport.
    pub fn refresh_pacs(&mut self, user_id: &UserId) -> Result<(), ManagerError> {
        let issued = self
            .transport
            .list_issued_pacs(user_id)
            .map_err(|err| ManagerError::TransportFailed(err.to_string()))?;
        let received = self
            .transport
            .list_received_pacs(user_id)
            .map_err(|err| ManagerError::TransportFailed(err.to_string()))?;

        self.issued_pacs = issued;
        self.received_pacs = received;

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("key material for user {0} is unavailable")]
    KeyUnavailable(UserId),

    #[error("key bundle of user {0} failed verification: {1}")]
    InvalidKeyBundle(UserId, String),

    #[error("file {0} is not available from the transport")]
    FileUnavailable(FileId),

    #[error("transport operation failed: {0}")]
    TransportFailed(String),

    #[error("malformed input: {0}")]
    MalformedInput(&'static str),

    #[error(transparent)]
    Pac(#[from] PacError),

    #[error(transparent)]
    Codec(#[from] FileCodecError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    SystemTime(#[from] SystemTimeError),
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;
    use crate::file_codec::FileMeta;
    use crate::identity::{IdentityKeyStore, IdentityState};
    use crate::key_bundle::{Lifetime, unix_now};
    use crate::pac::{self, PacError};
    use crate::test_utils::{MemoryDirectory, MemoryTransport};
    use crate::traits::RecipientRecord;

    use super::{FileManager, ManagerError};

    fn identity(rng: &Rng, id: &str, name: &str) -> IdentityState {
        IdentityKeyStore::init(&id.to_string(), name, Lifetime::default(), rng).unwrap()
    }

    fn record(identity: &IdentityState) -> RecipientRecord {
        RecipientRecord {
            user_id: identity.user_id().clone(),
            username: identity.username().to_string(),
            keys: IdentityKeyStore::public_bundle(identity).unwrap(),
        }
    }

    fn meta() -> FileMeta {
        FileMeta {
            filename: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
        }
    }

    #[test]
    fn upload_download_end_to_end() {
        let rng = Rng::from_seed([1; 32]);

        let alice = identity(&rng, "alice", "Alice");
        let bob = identity(&rng, "bob", "Bob");

        let mut directory = MemoryDirectory::default();
        directory.insert(record(&alice));
        directory.insert(record(&bob));

        let mut alice_manager = FileManager::new(directory.clone(), MemoryTransport::default());

        // Alice uploads a 10 KiB file and grants Bob access for 24 hours.
        let contents = rng.random_vec(10 * 1024).unwrap();
        let file_id = alice_manager
            .upload_file(
                &alice,
                &contents,
                meta(),
                &[bob.user_id().clone()],
                60 * 60 * 24,
                &rng,
            )
            .unwrap();

        assert_eq!(alice_manager.files().len(), 1);
        assert_eq!(alice_manager.issued_pacs().len(), 1);

        // Bob downloads with the token addressed to him.
        let mut bob_manager = FileManager::new(directory, alice_manager.transport.clone());
        bob_manager.refresh_pacs(bob.user_id()).unwrap();
        assert_eq!(bob_manager.received_pacs().len(), 1);

        let pac = bob_manager.received_pacs()[0].clone();
        assert_eq!(pac.file_id(), &file_id);
        assert_eq!(pac.issuer_name(), "Alice");
        assert_eq!(pac.recipient_name(), "Bob");

        let downloaded = bob_manager.download_file(&bob, &pac).unwrap();
        assert_eq!(downloaded, contents);
        assert_eq!(bob_manager.files().len(), 1);
        assert_eq!(bob_manager.files()[0].size, contents.len());
    }

    #[test]
    fn expired_token_is_rejected_before_decryption() {
        let rng = Rng::from_seed([1; 32]);

        let alice = identity(&rng, "alice", "Alice");
        let bob = identity(&rng, "bob", "Bob");

        let mut directory = MemoryDirectory::default();
        directory.insert(record(&alice));
        directory.insert(record(&bob));

        let mut alice_manager = FileManager::new(directory.clone(), MemoryTransport::default());

        let file_id = alice_manager
            .upload_file(
                &alice,
                b"time-limited contents",
                meta(),
                &[bob.user_id().clone()],
                60 * 60 * 24,
                &rng,
            )
            .unwrap();

        // Craft a token whose window already elapsed; the signature itself is valid.
        let (_, file_key) =
            crate::file_codec::encrypt(b"time-limited contents", &meta(), &rng).unwrap();
        let expired_pac = pac::issue(
            &alice,
            &record(&bob),
            &file_id,
            &file_key,
            &meta(),
            unix_now().unwrap() - 1,
            &rng,
        )
        .unwrap();

        let mut bob_manager = FileManager::new(directory, alice_manager.transport.clone());
        let result = bob_manager.download_file(&bob, &expired_pac);
        assert!(matches!(
            result,
            Err(ManagerError::Pac(PacError::Expired))
        ));

        // Nothing was committed to the session.
        assert!(bob_manager.files().is_empty());
    }

    #[test]
    fn oversized_validity_window_is_rejected() {
        let rng = Rng::from_seed([1; 32]);

        let alice = identity(&rng, "alice", "Alice");
        let bob = identity(&rng, "bob", "Bob");

        let mut directory = MemoryDirectory::default();
        directory.insert(record(&alice));
        directory.insert(record(&bob));

        let mut manager = FileManager::new(directory, MemoryTransport::default());

        // A "grant forever" duration pushes valid_until past the timestamp range.
        let result = manager.upload_file(
            &alice,
            b"contents",
            meta(),
            &[bob.user_id().clone()],
            u64::MAX,
            &rng,
        );
        assert!(matches!(result, Err(ManagerError::MalformedInput(_))));

        // Rejected before anything was encrypted or stored.
        assert!(manager.files().is_empty());
        assert!(manager.issued_pacs().is_empty());
    }

    #[test]
    fn unknown_recipient_aborts_upload() {
        let rng = Rng::from_seed([1; 32]);

        let alice = identity(&rng, "alice", "Alice");

        let mut directory = MemoryDirectory::default();
        directory.insert(record(&alice));

        let mut manager = FileManager::new(directory, MemoryTransport::default());

        let result = manager.upload_file(
            &alice,
            b"contents",
            meta(),
            &["nobody".to_string()],
            3600,
            &rng,
        );
        assert!(matches!(result, Err(ManagerError::KeyUnavailable(_))));

        // The failed workflow left the session untouched.
        assert!(manager.files().is_empty());
        assert!(manager.issued_pacs().is_empty());
    }

    #[test]
    fn transport_failure_aborts_without_partial_state() {
        let rng = Rng::from_seed([1; 32]);

        let alice = identity(&rng, "alice", "Alice");
        let bob = identity(&rng, "bob", "Bob");

        let mut directory = MemoryDirectory::default();
        directory.insert(record(&alice));
        directory.insert(record(&bob));

        let mut manager = FileManager::new(directory, MemoryTransport::failing());

        let result = manager.upload_file(
            &alice,
            b"contents",
            meta(),
            &[bob.user_id().clone()],
            3600,
            &rng,
        );
        assert!(matches!(result, Err(ManagerError::TransportFailed(_))));
        assert!(manager.files().is_empty());
        assert!(manager.issued_pacs().is_empty());
    }

    #[test]
    fn token_for_other_recipient_cannot_be_used() {
        let rng = Rng::from_seed([1; 32]);

        let alice = identity(&rng, "alice", "Alice");
        let bob = identity(&rng, "bob", "Bob");
        let carol = identity(&rng, "carol", "Carol");

        let mut directory = MemoryDirectory::default();
        directory.insert(record(&alice));
        directory.insert(record(&bob));
        directory.insert(record(&carol));

        let mut alice_manager = FileManager::new(directory.clone(), MemoryTransport::default());
        alice_manager
            .upload_file(
                &alice,
                b"for bob only",
                meta(),
                &[bob.user_id().clone()],
                3600,
                &rng,
            )
            .unwrap();

        let mut carol_manager = FileManager::new(directory, alice_manager.transport.clone());
        carol_manager.refresh_pacs(bob.user_id()).unwrap();
        let pac = carol_manager.received_pacs()[0].clone();

        // Carol holds Bob's token but not Bob's exchange secret; the unwrap fails.
        assert!(carol_manager.download_file(&carol, &pac).is_err());
        assert!(carol_manager.files().is_empty());
    }
}
